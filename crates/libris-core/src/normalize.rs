//! Entity normalizer
//!
//! The catalog API has shipped several record shapes over time: books keyed
//! by `id` or `bookID`, copy counts in `copies` or `totalCopies`, numbers sent
//! as strings, users listing their loans as ids or as nested book objects.
//! This module is the only place that knows about those shapes. Everything
//! downstream works with [`Book`] and [`User`].
//!
//! Resolution rules, in order:
//!
//! - identifier: `id`, then `bookID`/`bookId` (books) or `userID`/`userId` (users)
//! - copies: `copies`, then `totalCopies`; `availableCopies` defaults to the total
//! - type: `type` verbatim, else the category prefix before `" - "`
//! - blank or missing `isbn` and `category` become `"N/A"` and `"General"`

use std::collections::HashSet;
use std::hash::Hash;

use serde_json::{Map, Value};

use crate::error::{CatalogError, Result};
use crate::model::{
    type_from_category, Book, BookId, DownloadLinks, Role, User, UserId, DEFAULT_CATEGORY,
    DEFAULT_ISBN,
};
use crate::projection::{RankedBook, RankedUser};

const BOOK_ID_KEYS: &[&str] = &["id", "bookID", "bookId"];
const USER_ID_KEYS: &[&str] = &["id", "userID", "userId"];
const TOTAL_COPIES_KEYS: &[&str] = &["copies", "totalCopies"];
const BORROWED_KEYS: &[&str] = &["borrowedBookIds", "borrowedBooks"];
const RANKED_BOOK_COUNT_KEYS: &[&str] = &["timesCirculated", "borrowCount", "borrowed"];
const RANKED_USER_COUNT_KEYS: &[&str] = &["booksBorrowed", "borrowCount", "borrowed"];

/// Normalize a single raw book record
pub fn normalize_book(raw: &Value) -> Result<Book> {
    let record = as_object(raw, "book")?;

    let id = BookId(required_id(record, BOOK_ID_KEYS, "book")?);
    let title = required_text(record, "title", "book")?;
    let author = required_text(record, "author", "book")?;

    let isbn = optional_text(record, "isbn")?.unwrap_or_else(|| DEFAULT_ISBN.to_string());
    let category =
        optional_text(record, "category")?.unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let kind = match optional_text(record, "type")? {
        Some(kind) => kind,
        None => type_from_category(&category).to_string(),
    };

    let (total_copies, available_copies) = resolve_copies(record, id)?;

    let cover_image = optional_text(record, "coverImage")?;
    let download_links = match record.get("downloadLinks") {
        None | Some(Value::Null) => None,
        Some(value) => {
            let links: DownloadLinks = serde_json::from_value(value.clone()).map_err(|e| {
                CatalogError::malformed(format!("book {}: invalid downloadLinks: {}", id, e))
            })?;
            Some(links).filter(|l| !l.is_empty())
        }
    };

    Ok(Book {
        id,
        title,
        author,
        isbn,
        category,
        total_copies,
        available_copies,
        cover_image,
        download_links,
        kind,
    })
}

/// Normalize a single raw user record
pub fn normalize_user(raw: &Value) -> Result<User> {
    let record = as_object(raw, "user")?;

    let id = UserId(required_id(record, USER_ID_KEYS, "user")?);
    let name = required_text(record, "name", "user")?;
    let email = optional_text(record, "email")?;

    let role = match optional_text(record, "role")? {
        None => Role::default(),
        Some(raw_role) => Role::parse(&raw_role).unwrap_or_else(|| {
            tracing::debug!(user = %id, role = %raw_role, "Unknown role, treating as member");
            Role::default()
        }),
    };

    let mut user = User::new(id, name).with_role(role);
    user.email = email;

    if let Some(entries) = first_present(record, BORROWED_KEYS) {
        let entries = entries.as_array().ok_or_else(|| {
            CatalogError::malformed(format!("user {}: borrowed books must be a list", id))
        })?;
        for entry in entries {
            user.borrowed_book_ids.insert(borrowed_entry_id(entry, id)?);
        }
    }

    Ok(user)
}

/// Normalize one entry of the server's most-borrowed statistics
///
/// The server reports the loan count as `timesCirculated`.
pub fn normalize_ranked_book(raw: &Value) -> Result<RankedBook> {
    let record = as_object(raw, "ranked book")?;
    let id = BookId(required_id(record, BOOK_ID_KEYS, "ranked book")?);

    Ok(RankedBook {
        id,
        title: required_text(record, "title", "ranked book")?,
        author: optional_text(record, "author")?.unwrap_or_default(),
        borrowed: optional_count(record, RANKED_BOOK_COUNT_KEYS)?.unwrap_or(0),
    })
}

/// Normalize one entry of the server's most-active statistics
///
/// The server reports the loan count as `booksBorrowed`.
pub fn normalize_ranked_user(raw: &Value) -> Result<RankedUser> {
    let record = as_object(raw, "ranked user")?;
    let id = UserId(required_id(record, USER_ID_KEYS, "ranked user")?);

    Ok(RankedUser {
        id,
        name: required_text(record, "name", "ranked user")?,
        email: optional_text(record, "email")?,
        borrowed: optional_count(record, RANKED_USER_COUNT_KEYS)?.unwrap_or(0),
    })
}

/// Records accepted from a batch, plus the ones that were turned away
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub rejected: Vec<Rejected>,
}

impl<T> Normalized<T> {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// A record from a batch that failed normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    /// Position in the server response
    pub index: usize,
    pub error: CatalogError,
}

/// Normalize a list of raw books, keeping response order
///
/// A record that fails normalization, or repeats an identifier already seen,
/// is reported in `rejected` and does not stop the rest of the batch.
pub fn normalize_books<'a>(raw: impl IntoIterator<Item = &'a Value>) -> Normalized<Book> {
    normalize_batch(raw, normalize_book, |b| b.id, "book")
}

/// Normalize a list of raw users, keeping response order
pub fn normalize_users<'a>(raw: impl IntoIterator<Item = &'a Value>) -> Normalized<User> {
    normalize_batch(raw, normalize_user, |u| u.id, "user")
}

/// Normalize a most-borrowed statistics list, keeping server order
pub fn normalize_ranked_books<'a>(
    raw: impl IntoIterator<Item = &'a Value>,
) -> Normalized<RankedBook> {
    normalize_batch(raw, normalize_ranked_book, |r| r.id, "ranked book")
}

/// Normalize a most-active statistics list, keeping server order
pub fn normalize_ranked_users<'a>(
    raw: impl IntoIterator<Item = &'a Value>,
) -> Normalized<RankedUser> {
    normalize_batch(raw, normalize_ranked_user, |r| r.id, "ranked user")
}

fn normalize_batch<'a, T, K, F, G>(
    raw: impl IntoIterator<Item = &'a Value>,
    normalize: F,
    key: G,
    kind: &str,
) -> Normalized<T>
where
    K: Eq + Hash + std::fmt::Display,
    F: Fn(&Value) -> Result<T>,
    G: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    let mut rejected = Vec::new();

    for (index, value) in raw.into_iter().enumerate() {
        let outcome = normalize(value).and_then(|record| {
            let id = key(&record);
            if seen.contains(&id) {
                Err(CatalogError::malformed(format!("duplicate {} id {}", kind, id)))
            } else {
                seen.insert(id);
                Ok(record)
            }
        });

        match outcome {
            Ok(record) => records.push(record),
            Err(error) => {
                tracing::warn!(index, %error, "Skipping {} record", kind);
                rejected.push(Rejected { index, error });
            }
        }
    }

    Normalized { records, rejected }
}

// ===== Field helpers =====

fn as_object<'a>(raw: &'a Value, kind: &str) -> Result<&'a Map<String, Value>> {
    raw.as_object()
        .ok_or_else(|| CatalogError::malformed(format!("{} record is not an object", kind)))
}

/// First key that is present and not null
fn first_present<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

fn required_id(record: &Map<String, Value>, keys: &[&str], kind: &str) -> Result<i64> {
    let value = first_present(record, keys)
        .ok_or_else(|| CatalogError::malformed(format!("{} record has no identifier", kind)))?;
    parse_id(value)
        .ok_or_else(|| CatalogError::malformed(format!("{} identifier {} is not an integer", kind, value)))
}

/// An integer id from a number, an integral float or a numeric string
fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn required_text(record: &Map<String, Value>, key: &str, kind: &str) -> Result<String> {
    optional_text(record, key)?
        .ok_or_else(|| CatalogError::malformed(format!("{} record is missing {}", kind, key)))
}

/// A string field; blank strings count as absent, numbers are stringified
fn optional_text(record: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(CatalogError::malformed(format!(
            "field {} should be text, got {}",
            key, other
        ))),
    }
}

fn optional_count(record: &Map<String, Value>, keys: &[&str]) -> Result<Option<u32>> {
    let Some((key, value)) = keys
        .iter()
        .filter_map(|key| record.get(*key).map(|value| (*key, value)))
        .find(|(_, value)| !value.is_null())
    else {
        return Ok(None);
    };

    let count = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    count
        .and_then(|c| u32::try_from(c).ok())
        .map(Some)
        .ok_or_else(|| {
            CatalogError::malformed(format!("{} must be a non-negative integer, got {}", key, value))
        })
}

fn resolve_copies(record: &Map<String, Value>, id: BookId) -> Result<(u32, u32)> {
    let total = optional_count(record, TOTAL_COPIES_KEYS)?;
    let available = optional_count(record, &["availableCopies"])?;

    let (total, available) = match (total, available) {
        (Some(total), Some(available)) => (total, available),
        (Some(total), None) => (total, total),
        (None, Some(available)) => (available, available),
        (None, None) => (1, 1),
    };

    if available > total {
        tracing::warn!(
            book = %id,
            total,
            available,
            "More copies available than owned, clamping"
        );
        return Ok((total, total));
    }

    Ok((total, available))
}

fn borrowed_entry_id(entry: &Value, user: UserId) -> Result<BookId> {
    let id = match entry {
        Value::Object(book) => first_present(book, BOOK_ID_KEYS).and_then(parse_id),
        other => parse_id(other),
    };
    id.map(BookId).ok_or_else(|| {
        CatalogError::malformed(format!("user {}: borrowed entry {} has no book id", user, entry))
    })
}
