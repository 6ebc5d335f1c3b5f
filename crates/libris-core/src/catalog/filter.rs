//! Book filter criteria
//!
//! Criteria are ANDed. A missing or blank criterion matches everything, so
//! the default filter returns the whole catalog.

use serde::{Deserialize, Serialize};

use crate::model::Book;

/// Criteria for narrowing the book list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFilter {
    /// Shelf type, compared case-insensitively against the whole type ("Manga")
    pub kind: Option<String>,
    /// Substring of the category ("Fantasy" matches "Novel - Fantasy")
    pub category: Option<String>,
    /// Substring of the title or the author
    pub text: Option<String>,
}

impl BookFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Whether this filter matches everything
    pub fn is_empty(&self) -> bool {
        needle(&self.kind).is_none()
            && needle(&self.category).is_none()
            && needle(&self.text).is_none()
    }

    pub fn matches(&self, book: &Book) -> bool {
        self.matcher().matches(book)
    }

    /// Lower-cased form used while iterating
    pub(crate) fn matcher(&self) -> Matcher {
        Matcher {
            kind: needle(&self.kind),
            category: needle(&self.category),
            text: needle(&self.text),
        }
    }
}

/// Trimmed, lower-cased criterion, or None when blank
fn needle(criterion: &Option<String>) -> Option<String> {
    criterion
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

#[derive(Debug, Clone)]
pub(crate) struct Matcher {
    kind: Option<String>,
    category: Option<String>,
    text: Option<String>,
}

impl Matcher {
    pub(crate) fn matches(&self, book: &Book) -> bool {
        if let Some(kind) = &self.kind {
            if book.kind.to_lowercase() != *kind {
                return false;
            }
        }

        if let Some(category) = &self.category {
            if !book.category.to_lowercase().contains(category.as_str()) {
                return false;
            }
        }

        if let Some(text) = &self.text {
            let in_title = book.title.to_lowercase().contains(text.as_str());
            if !in_title && !book.author.to_lowercase().contains(text.as_str()) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BookId;

    fn book() -> Book {
        Book::new(BookId(1), "The Hobbit", "J.R.R. Tolkien").with_category("Novel - Fantasy")
    }

    #[test]
    fn test_empty_matches_all() {
        assert!(BookFilter::new().is_empty());
        assert!(BookFilter::new().matches(&book()));
        assert!(BookFilter::new().text("   ").is_empty());
    }

    #[test]
    fn test_text_matches_title_or_author() {
        assert!(BookFilter::new().text("hobbit").matches(&book()));
        assert!(BookFilter::new().text("TOLKIEN").matches(&book()));
        assert!(!BookFilter::new().text("dune").matches(&book()));
    }

    #[test]
    fn test_kind_is_whole_word() {
        assert!(BookFilter::new().kind("novel").matches(&book()));
        assert!(!BookFilter::new().kind("nov").matches(&book()));
    }

    #[test]
    fn test_criteria_are_anded() {
        let filter = BookFilter::new().kind("Novel").category("fant").text("hobbit");
        assert!(filter.matches(&book()));

        let filter = BookFilter::new().kind("Novel").category("horror");
        assert!(!filter.matches(&book()));
    }
}
