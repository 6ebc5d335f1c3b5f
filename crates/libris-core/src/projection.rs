//! View projections over a catalog
//!
//! Everything here is read-only: a projection borrows the catalog, computes
//! display aggregates, and never changes it. Calling the same projection twice
//! on an unchanged catalog gives the same answer.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::model::{BookId, UserId};

/// Default number of entries in the most-borrowed and most-active rankings
pub const DEFAULT_RANKING_LIMIT: usize = 5;

/// Counters shown in the page header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderCounts {
    pub total_books: usize,
    pub total_users: usize,
    /// Copies out on loan across the whole catalog
    pub total_borrowed: u64,
}

/// Per-category loan statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub category: String,
    /// Books in the category
    pub count: usize,
    /// Books in the category with at least one copy out
    pub borrowed_count: usize,
    /// `borrowed_count / count * 100`, one decimal place
    pub borrow_rate: f64,
}

/// A book in a most-borrowed ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedBook {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub borrowed: u32,
}

/// A user in a most-active ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedUser {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub borrowed: u32,
}

/// Read-only projections over one catalog
#[derive(Debug, Clone, Copy)]
pub struct ViewProjector<'a> {
    catalog: &'a Catalog,
}

impl<'a> ViewProjector<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn header_counts(&self) -> HeaderCounts {
        HeaderCounts {
            total_books: self.catalog.book_count(),
            total_users: self.catalog.user_count(),
            total_borrowed: self
                .catalog
                .books()
                .map(|b| u64::from(b.borrowed_copies()))
                .sum(),
        }
    }

    /// One entry per distinct category, in first-seen order
    pub fn category_distribution(&self) -> Vec<CategoryStat> {
        let mut stats: Vec<CategoryStat> = Vec::new();

        for book in self.catalog.books() {
            let position = match stats.iter().position(|s| s.category == book.category) {
                Some(position) => position,
                None => {
                    stats.push(CategoryStat {
                        category: book.category.clone(),
                        count: 0,
                        borrowed_count: 0,
                        borrow_rate: 0.0,
                    });
                    stats.len() - 1
                }
            };

            let stat = &mut stats[position];
            stat.count += 1;
            if book.borrowed_copies() > 0 {
                stat.borrowed_count += 1;
            }
        }

        for stat in &mut stats {
            stat.borrow_rate = percentage(stat.borrowed_count, stat.count);
        }

        stats
    }

    /// Top `limit` books by copies out; ties keep catalog order
    pub fn most_borrowed(&self, limit: usize) -> Vec<RankedBook> {
        if limit == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<RankedBook> = self
            .catalog
            .books()
            .map(|b| RankedBook {
                id: b.id,
                title: b.title.clone(),
                author: b.author.clone(),
                borrowed: b.borrowed_copies(),
            })
            .collect();
        // sort_by is stable, which gives the tie-break
        ranked.sort_by(|a, b| b.borrowed.cmp(&a.borrowed));
        ranked.truncate(limit);
        ranked
    }

    /// Top `limit` users by books held; ties keep catalog order
    pub fn most_active(&self, limit: usize) -> Vec<RankedUser> {
        if limit == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<RankedUser> = self
            .catalog
            .users()
            .map(|u| RankedUser {
                id: u.id,
                name: u.name.clone(),
                email: u.email.clone(),
                borrowed: u32::try_from(u.borrowed_count()).unwrap_or(u32::MAX),
            })
            .collect();
        ranked.sort_by(|a, b| b.borrowed.cmp(&a.borrowed));
        ranked.truncate(limit);
        ranked
    }

    /// All projections at once
    pub fn snapshot(&self, ranking_limit: usize) -> ViewSnapshot {
        ViewSnapshot {
            header: self.header_counts(),
            categories: self.category_distribution(),
            most_borrowed: self.most_borrowed(ranking_limit),
            most_active: self.most_active(ranking_limit),
        }
    }
}

/// Every projection for one catalog state, published after each change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub header: HeaderCounts,
    pub categories: Vec<CategoryStat>,
    pub most_borrowed: Vec<RankedBook>,
    pub most_active: Vec<RankedUser>,
}

/// `part / whole * 100` rounded to one decimal; zero when `whole` is zero
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let rate = part as f64 / whole as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Book, User};

    fn catalog() -> Catalog {
        Catalog::with_records(
            vec![
                Book::new(BookId(1), "A", "x").with_category("Fiction").with_copies(2, 1),
                Book::new(BookId(2), "B", "x").with_category("Science").with_copies(4, 1),
                Book::new(BookId(3), "C", "x").with_category("Fiction").with_copies(1, 0),
                Book::new(BookId(4), "D", "x").with_category("Fiction").with_copies(3, 3),
            ],
            vec![
                User::new(UserId(10), "Ada").with_borrowed([BookId(1)]),
                User::new(UserId(11), "Grace").with_borrowed([BookId(2), BookId(3)]),
                User::new(UserId(12), "Linus").with_borrowed([BookId(2)]),
            ],
        )
    }

    #[test]
    fn test_header_counts() {
        let catalog = catalog();
        let counts = ViewProjector::new(&catalog).header_counts();
        assert_eq!(
            counts,
            HeaderCounts {
                total_books: 4,
                total_users: 3,
                total_borrowed: 5,
            }
        );
    }

    #[test]
    fn test_category_distribution() {
        let catalog = catalog();
        let stats = ViewProjector::new(&catalog).category_distribution();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].category, "Fiction");
        assert_eq!(stats[0].count, 3);
        assert_eq!(stats[0].borrowed_count, 2);
        assert_eq!(stats[0].borrow_rate, 66.7);
        assert_eq!(stats[1].category, "Science");
        assert_eq!(stats[1].borrow_rate, 100.0);
    }

    #[test]
    fn test_percentage_never_nan() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(0, 5), 0.0);
    }

    #[test]
    fn test_most_borrowed() {
        let catalog = catalog();
        let projector = ViewProjector::new(&catalog);

        assert!(projector.most_borrowed(0).is_empty());

        let ids: Vec<_> = projector.most_borrowed(10).iter().map(|r| r.id).collect();
        // B has 3 out; A and C tie at 1 and keep catalog order
        assert_eq!(ids, vec![BookId(2), BookId(1), BookId(3), BookId(4)]);

        let top: Vec<_> = projector.most_borrowed(2).iter().map(|r| r.borrowed).collect();
        assert_eq!(top, vec![3, 1]);
    }

    #[test]
    fn test_most_active_ties_keep_order() {
        let catalog = catalog();
        let ranked = ViewProjector::new(&catalog).most_active(3);
        let names: Vec<_> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Grace", "Ada", "Linus"]);
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let catalog = catalog();
        let projector = ViewProjector::new(&catalog);
        assert_eq!(projector.snapshot(5), projector.snapshot(5));
        assert_eq!(projector.snapshot(1).most_borrowed.len(), 1);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::new();
        let snapshot = ViewProjector::new(&catalog).snapshot(DEFAULT_RANKING_LIMIT);
        assert_eq!(snapshot, ViewSnapshot::default());
    }
}
