//! Canonical book record

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Placeholder shown when a book has no ISBN
pub const DEFAULT_ISBN: &str = "N/A";

/// Category assigned to books that arrive without one
pub const DEFAULT_CATEGORY: &str = "General";

/// Separator between a category's type prefix and its sub-category ("Novel - Fantasy")
pub const CATEGORY_SEPARATOR: &str = " - ";

/// Unique identifier for a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub i64);

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BookId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Download locations for a digital copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DownloadLinks {
    /// Format name ("pdf", "epub") to URL
    ByFormat(BTreeMap<String, String>),
    /// Plain list of mirrors, in preference order
    Ordered(Vec<String>),
}

impl DownloadLinks {
    /// All URLs, in map order or list order
    pub fn urls(&self) -> Vec<&str> {
        match self {
            DownloadLinks::ByFormat(map) => map.values().map(String::as_str).collect(),
            DownloadLinks::Ordered(list) => list.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DownloadLinks::ByFormat(map) => map.is_empty(),
            DownloadLinks::Ordered(list) => list.is_empty(),
        }
    }
}

/// A book as the rest of the client sees it, after normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: String,
    pub total_copies: u32,
    /// Never exceeds `total_copies`
    pub available_copies: u32,
    pub cover_image: Option<String>,
    pub download_links: Option<DownloadLinks>,
    /// Shelf type such as "Novel", "Comic" or "Manga"
    #[serde(rename = "type")]
    pub kind: String,
}

impl Book {
    /// Create a book with one available copy and default metadata
    pub fn new(id: BookId, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
            isbn: DEFAULT_ISBN.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            total_copies: 1,
            available_copies: 1,
            cover_image: None,
            download_links: None,
            kind: DEFAULT_CATEGORY.to_string(),
        }
    }

    /// Set the category and re-derive the type from it
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self.kind = type_from_category(&self.category).to_string();
        self
    }

    /// Set total and available copies, clamping available to total
    pub fn with_copies(mut self, total: u32, available: u32) -> Self {
        self.total_copies = total;
        self.available_copies = available.min(total);
        self
    }

    /// Copies currently out on loan
    pub fn borrowed_copies(&self) -> u32 {
        self.total_copies.saturating_sub(self.available_copies)
    }

    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// The label after the type prefix ("Fantasy" for "Novel - Fantasy")
    pub fn subcategory(&self) -> &str {
        self.category
            .split_once(CATEGORY_SEPARATOR)
            .map(|(_, rest)| rest)
            .unwrap_or(&self.category)
    }
}

/// Type prefix of a category, or the whole category when it has no separator
pub fn type_from_category(category: &str) -> &str {
    category
        .split_once(CATEGORY_SEPARATOR)
        .map(|(prefix, _)| prefix)
        .unwrap_or(category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_from_category() {
        assert_eq!(type_from_category("Manga - Shonen"), "Manga");
        assert_eq!(type_from_category("Comic - Superhero - Golden Age"), "Comic");
        assert_eq!(type_from_category("Poetry"), "Poetry");
        assert_eq!(type_from_category("Sci-Fi"), "Sci-Fi");
    }

    #[test]
    fn test_subcategory() {
        let book = Book::new(BookId(1), "Dune", "Frank Herbert").with_category("Novel - Science Fiction");
        assert_eq!(book.kind, "Novel");
        assert_eq!(book.subcategory(), "Science Fiction");

        let plain = Book::new(BookId(2), "Odes", "Keats").with_category("Poetry");
        assert_eq!(plain.subcategory(), "Poetry");
    }

    #[test]
    fn test_borrowed_copies() {
        let book = Book::new(BookId(1), "Dune", "Frank Herbert").with_copies(3, 1);
        assert_eq!(book.borrowed_copies(), 2);
        assert!(book.is_available());

        let clamped = Book::new(BookId(2), "Emma", "Jane Austen").with_copies(2, 9);
        assert_eq!(clamped.available_copies, 2);
        assert_eq!(clamped.borrowed_copies(), 0);
    }

    #[test]
    fn test_download_links_shapes() {
        let map: DownloadLinks =
            serde_json::from_str(r#"{"epub": "https://e/1.epub", "pdf": "https://e/1.pdf"}"#).unwrap();
        assert_eq!(map.urls(), vec!["https://e/1.epub", "https://e/1.pdf"]);

        let list: DownloadLinks = serde_json::from_str(r#"["https://a", "https://b"]"#).unwrap();
        assert_eq!(list.urls(), vec!["https://a", "https://b"]);
    }

    #[test]
    fn test_serializes_kind_as_type() {
        let book = Book::new(BookId(5), "Akira", "Katsuhiro Otomo").with_category("Manga - Seinen");
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["type"], "Manga");
        assert_eq!(json["availableCopies"], 1);
    }
}
