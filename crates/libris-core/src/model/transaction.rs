//! Client-side log of completed borrow and return actions
//!
//! Entries exist only for the lifetime of a session. They are never sent to
//! the server and never edited once recorded.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, UserId};

/// Number of entries a history view shows by default
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// What happened to the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Borrow,
    Return,
}

impl TransactionKind {
    /// Past-tense verb for history lines
    pub fn verb(&self) -> &'static str {
        match self {
            TransactionKind::Borrow => "borrowed",
            TransactionKind::Return => "returned",
        }
    }
}

/// A completed borrow or return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub kind: TransactionKind,
    pub user_id: UserId,
    pub user_name: String,
    pub book_id: BookId,
    pub book_title: String,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        kind: TransactionKind,
        user_id: UserId,
        user_name: impl Into<String>,
        book_id: BookId,
        book_title: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            user_id,
            user_name: user_name.into(),
            book_id,
            book_title: book_title.into(),
            timestamp: Utc::now(),
        }
    }

    /// One-line summary, e.g. `Ada borrowed "Dune"`
    pub fn summary(&self) -> String {
        format!("{} {} \"{}\"", self.user_name, self.kind.verb(), self.book_title)
    }
}

/// Append-only transaction history, newest first
#[derive(Debug, Clone, Default)]
pub struct TransactionLog {
    entries: VecDeque<Transaction>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transaction as the newest entry
    pub fn record(&mut self, transaction: Transaction) -> &Transaction {
        self.entries.push_front(transaction);
        &self.entries[0]
    }

    /// The newest `limit` entries, newest first
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &Transaction> {
        self.entries.iter().take(limit)
    }

    /// Every entry, newest first
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Transaction> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn borrow(n: i64) -> Transaction {
        Transaction::new(
            TransactionKind::Borrow,
            UserId(1),
            "Ada",
            BookId(n),
            format!("Book {}", n),
        )
    }

    #[test]
    fn test_newest_first() {
        let mut log = TransactionLog::new();
        log.record(borrow(1));
        log.record(borrow(2));

        let ids: Vec<_> = log.iter().map(|t| t.book_id).collect();
        assert_eq!(ids, vec![BookId(2), BookId(1)]);
        assert_eq!(log.latest().map(|t| t.book_id), Some(BookId(2)));
    }

    #[test]
    fn test_recent_truncates_for_display() {
        let mut log = TransactionLog::new();
        for n in 0..15 {
            log.record(borrow(n));
        }

        let shown: Vec<_> = log.recent(DEFAULT_HISTORY_LIMIT).collect();
        assert_eq!(shown.len(), 10);
        assert_eq!(shown[0].book_id, BookId(14));
        assert_eq!(shown[9].book_id, BookId(5));
        // Nothing is dropped from the log itself
        assert_eq!(log.len(), 15);
    }

    #[test]
    fn test_summary() {
        let t = Transaction::new(TransactionKind::Return, UserId(2), "Grace", BookId(9), "Dune");
        assert_eq!(t.summary(), "Grace returned \"Dune\"");
    }
}
