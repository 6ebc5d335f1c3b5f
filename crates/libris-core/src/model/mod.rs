//! Canonical records shared by every layer of the client

mod book;
mod transaction;
mod user;

pub use book::{
    type_from_category, Book, BookId, DownloadLinks, CATEGORY_SEPARATOR, DEFAULT_CATEGORY,
    DEFAULT_ISBN,
};
pub use transaction::{Transaction, TransactionKind, TransactionLog, DEFAULT_HISTORY_LIMIT};
pub use user::{Role, User, UserId};
