//! Error types for libris-core

use thiserror::Error;

use crate::model::{BookId, UserId};

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Which kind of record an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Book(BookId),
    User(UserId),
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Book(id) => write!(f, "book {}", id),
            Entity::User(id) => write!(f, "user {}", id),
        }
    }
}

/// Main error type for normalization and catalog bookkeeping
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A raw API record could not be turned into a canonical record
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// The referenced book or user is not in the catalog
    #[error("Not found: {0}")]
    NotFound(Entity),

    /// The book has no copies left
    #[error("Book {0} has no available copies")]
    Unavailable(BookId),

    /// The user already holds this book
    #[error("User {user} already borrowed book {book}")]
    AlreadyBorrowed { user: UserId, book: BookId },

    /// The user does not hold this book
    #[error("User {user} has not borrowed book {book}")]
    NotBorrowed { user: UserId, book: BookId },
}

impl CatalogError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        CatalogError::MalformedRecord(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_entity() {
        let err = CatalogError::NotFound(Entity::Book(BookId(7)));
        assert_eq!(err.to_string(), "Not found: book 7");

        let err = CatalogError::AlreadyBorrowed {
            user: UserId(1001),
            book: BookId(101),
        };
        assert_eq!(err.to_string(), "User 1001 already borrowed book 101");
    }
}
