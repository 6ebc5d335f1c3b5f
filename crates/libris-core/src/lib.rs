//! Libris Core - catalog state for a library client
//!
//! This crate holds everything a library catalog client computes locally,
//! independent of how it talks to the server:
//!
//! - **Model**: canonical `Book`, `User` and `Transaction` records
//! - **Normalize**: turns the API's assorted record shapes into canonical records
//! - **Catalog**: ordered book/user collections with lookup, filtering and loan bookkeeping
//! - **Projection**: header counters, category distribution and rankings
//! - **Config**: API location, display limits and reconciliation mode
//!
//! # Data flow
//!
//! ```text
//! raw JSON ──normalize──▶ Catalog ──ViewProjector──▶ ViewSnapshot
//!                           ▲
//!            apply_borrow / apply_return (after the server accepts)
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod projection;

pub use catalog::{BookFilter, Catalog};
pub use config::{ApiConfig, ConfigError, LibrisConfig, ReconcileMode, SyncConfig, ViewConfig};
pub use error::{CatalogError, Entity, Result};
pub use model::{
    Book, BookId, DownloadLinks, Role, Transaction, TransactionKind, TransactionLog, User, UserId,
};
pub use normalize::{
    normalize_book, normalize_books, normalize_ranked_books, normalize_ranked_users,
    normalize_user, normalize_users, Normalized, Rejected,
};
pub use projection::{
    CategoryStat, HeaderCounts, RankedBook, RankedUser, ViewProjector, ViewSnapshot,
};

/// Returns the version of libris-core
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
