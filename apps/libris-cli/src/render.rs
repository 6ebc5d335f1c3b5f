//! Table rendering

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};

use libris_client::Dashboard;
use libris_core::projection::percentage;
use libris_core::{
    Book, CategoryStat, DownloadLinks, HeaderCounts, RankedBook, RankedUser, Transaction, User,
};

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

pub fn books<'a>(books: impl IntoIterator<Item = &'a Book>) -> Table {
    let mut t = table(&["ID", "Title", "Author", "Category", "Available", "ISBN"]);
    for book in books {
        t.add_row(vec![
            Cell::new(book.id),
            Cell::new(&book.title),
            Cell::new(&book.author),
            Cell::new(&book.category),
            Cell::new(format!("{}/{}", book.available_copies, book.total_copies)),
            Cell::new(&book.isbn),
        ]);
    }
    t
}

/// Everything known about one book, download links last
pub fn book_details(book: &Book) -> Table {
    let mut t = table(&["Field", "Value"]);
    t.add_row(vec!["ID".to_string(), book.id.to_string()]);
    t.add_row(vec!["Title".to_string(), book.title.clone()]);
    t.add_row(vec!["Author".to_string(), book.author.clone()]);
    t.add_row(vec!["Type".to_string(), book.kind.clone()]);
    t.add_row(vec!["Category".to_string(), book.category.clone()]);
    t.add_row(vec!["Subcategory".to_string(), book.subcategory().to_string()]);
    t.add_row(vec!["ISBN".to_string(), book.isbn.clone()]);
    t.add_row(vec![
        "Copies".to_string(),
        format!("{} of {} available", book.available_copies, book.total_copies),
    ]);
    t.add_row(vec![
        "Cover".to_string(),
        book.cover_image.clone().unwrap_or_else(|| "-".to_string()),
    ]);

    let links = download_rows(book.download_links.as_ref());
    if links.is_empty() {
        t.add_row(vec!["Download".to_string(), "No download links available".to_string()]);
    }
    for (label, url) in links {
        t.add_row(vec![format!("Download ({})", label), url.to_string()]);
    }
    t
}

/// Labelled download URLs: the format name for a map, the position for a list
fn download_rows(links: Option<&DownloadLinks>) -> Vec<(String, &str)> {
    match links {
        None => Vec::new(),
        Some(DownloadLinks::ByFormat(map)) => map
            .iter()
            .map(|(format, url)| (format.clone(), url.as_str()))
            .collect(),
        Some(links @ DownloadLinks::Ordered(_)) => links
            .urls()
            .into_iter()
            .enumerate()
            .map(|(i, url)| (format!("mirror {}", i + 1), url))
            .collect(),
    }
}

pub fn users<'a>(users: impl IntoIterator<Item = &'a User>) -> Table {
    let mut t = table(&["ID", "Name", "Email", "Role", "Borrowed"]);
    for user in users {
        t.add_row(vec![
            Cell::new(user.id),
            Cell::new(&user.name),
            Cell::new(user.email.as_deref().unwrap_or("-")),
            Cell::new(user.role),
            Cell::new(user.borrowed_count()),
        ]);
    }
    t
}

pub fn history<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Table {
    let mut t = table(&["Time", "User", "Action", "Book"]);
    for tx in transactions {
        t.add_row(vec![
            Cell::new(tx.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&tx.user_name),
            Cell::new(tx.kind.verb()),
            Cell::new(&tx.book_title),
        ]);
    }
    t
}

pub fn most_borrowed(entries: &[RankedBook]) -> Table {
    let mut t = table(&["#", "Title", "Author", "Borrowed"]);
    for (rank, entry) in entries.iter().enumerate() {
        t.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&entry.title),
            Cell::new(&entry.author),
            Cell::new(entry.borrowed),
        ]);
    }
    t
}

pub fn most_active(entries: &[RankedUser]) -> Table {
    let mut t = table(&["#", "Name", "Email", "Books"]);
    for (rank, entry) in entries.iter().enumerate() {
        t.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&entry.name),
            Cell::new(entry.email.as_deref().unwrap_or("-")),
            Cell::new(entry.borrowed),
        ]);
    }
    t
}

pub fn header(counts: &HeaderCounts) -> Table {
    let mut t = table(&["Books", "Users", "Copies out"]);
    t.add_row(vec![
        Cell::new(counts.total_books),
        Cell::new(counts.total_users),
        Cell::new(counts.total_borrowed),
    ]);
    t
}

pub fn categories(stats: &[CategoryStat]) -> Table {
    let mut t = table(&["Category", "Books", "Borrowed", "Rate"]);
    for stat in stats {
        t.add_row(vec![
            Cell::new(&stat.category),
            Cell::new(stat.count),
            Cell::new(stat.borrowed_count),
            Cell::new(format!("{:.1}%", stat.borrow_rate)),
        ]);
    }
    t
}

pub fn dashboard(dashboard: &Dashboard) -> Table {
    let overview = &dashboard.overview;
    let mut t = table(&["Books", "Available", "All out", "Users", "Loans"]);
    t.add_row(vec![
        Cell::new(overview.total_books),
        Cell::new(overview.available_books),
        Cell::new(overview.borrowed_books),
        Cell::new(overview.total_users),
        Cell::new(overview.total_borrowed_instances),
    ]);
    t
}

/// The server's per-category book counts with each category's share
pub fn dashboard_categories(dashboard: &Dashboard) -> Table {
    let total = dashboard.overview.total_books as usize;
    let mut t = table(&["Category", "Books", "Share"]);
    for entry in &dashboard.category_distribution {
        t.add_row(vec![
            Cell::new(&entry.category),
            Cell::new(entry.count),
            Cell::new(format!("{:.1}%", percentage(entry.count as usize, total))),
        ]);
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_client::{CategoryCount, Overview};
    use libris_core::{BookId, UserId};
    use std::collections::BTreeMap;

    #[test]
    fn test_books_table_rows() {
        let catalog = [
            Book::new(BookId(1), "Dune", "Frank Herbert").with_copies(3, 2),
            Book::new(BookId(2), "Emma", "Jane Austen"),
        ];
        let rendered = books(&catalog);
        assert_eq!(rendered.row_iter().count(), 2);
        assert!(rendered.to_string().contains("2/3"));
    }

    #[test]
    fn test_book_details_with_format_map() {
        let mut book = Book::new(BookId(7), "Dune", "Frank Herbert")
            .with_category("Novel - Science Fiction")
            .with_copies(3, 1);
        book.cover_image = Some("https://covers.example.org/dune.jpg".to_string());
        book.download_links = Some(DownloadLinks::ByFormat(BTreeMap::from([
            ("epub".to_string(), "https://files.example.org/dune.epub".to_string()),
            ("pdf".to_string(), "https://files.example.org/dune.pdf".to_string()),
        ])));

        let rendered = book_details(&book).to_string();
        assert!(rendered.contains("Science Fiction"));
        assert!(rendered.contains("1 of 3 available"));
        assert!(rendered.contains("dune.jpg"));
        assert!(rendered.contains("Download (epub)"));
        assert!(rendered.contains("dune.pdf"));
        assert!(!rendered.contains("No download links available"));
    }

    #[test]
    fn test_book_details_with_link_list() {
        let mut book = Book::new(BookId(8), "Emma", "Jane Austen");
        book.download_links = Some(DownloadLinks::Ordered(vec![
            "https://mirror-a.example.org/emma.txt".to_string(),
            "https://mirror-b.example.org/emma.txt".to_string(),
        ]));

        let rendered = book_details(&book).to_string();
        assert!(rendered.contains("Download (mirror 1)"));
        assert!(rendered.contains("mirror-b.example.org"));
    }

    #[test]
    fn test_book_details_without_links() {
        let book = Book::new(BookId(9), "Akira", "Katsuhiro Otomo");
        let rendered = book_details(&book).to_string();
        assert!(rendered.contains("No download links available"));
        assert!(rendered.contains("N/A"));
    }

    #[test]
    fn test_dashboard_categories_share() {
        let dashboard = Dashboard {
            overview: Overview {
                total_books: 4,
                ..Overview::default()
            },
            category_distribution: vec![
                CategoryCount {
                    category: "Fiction".to_string(),
                    count: 3,
                },
                CategoryCount {
                    category: "Manga".to_string(),
                    count: 1,
                },
            ],
        };
        let rendered = dashboard_categories(&dashboard);
        assert_eq!(rendered.row_iter().count(), 2);
        assert!(rendered.to_string().contains("75.0%"));
    }

    #[test]
    fn test_users_table_placeholder_email() {
        let rendered = users(&[User::new(UserId(1), "Ada")]).to_string();
        assert!(rendered.contains("Ada"));
        assert!(rendered.contains("member"));
    }

    #[test]
    fn test_category_rate_formatting() {
        let stats = [CategoryStat {
            category: "Fiction".to_string(),
            count: 3,
            borrowed_count: 2,
            borrow_rate: 66.7,
        }];
        assert!(categories(&stats).to_string().contains("66.7%"));
    }
}
