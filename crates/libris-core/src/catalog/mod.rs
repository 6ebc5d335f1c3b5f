//! Catalog index and filtering
//!
//! The catalog holds the normalized book and user lists for one session and
//! answers lookups, filters, and loan bookkeeping over them.

mod filter;
mod index;

pub use filter::BookFilter;
pub use index::Catalog;
