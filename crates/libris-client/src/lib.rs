//! Libris Client - talks to the library catalog server
//!
//! - **API**: the [`LibraryApi`] trait and its reqwest implementation
//! - **Session**: loads the catalog and serves statistics, falling back to
//!   local projections when the server cannot
//! - **Dispatch**: borrow, return, add and delete actions with per-action
//!   in-flight gating, catalog reconciliation and a transaction history
//!
//! ```ignore
//! let config = LibrisConfig::load_standard(None)?;
//! let api = HttpLibraryApi::new(&config.api)?;
//! let mut dispatcher = Dispatcher::new(Session::new(api, config));
//! dispatcher.load().await;
//! dispatcher.borrow(UserId(1001), BookId(101)).await?;
//! ```

pub mod api;
pub mod dispatch;
pub mod error;
pub mod session;

pub use api::{
    Ack, CategoryCount, Dashboard, HttpLibraryApi, LibraryApi, LoanReceipt, NewBook, NewUser,
    Overview, SearchQuery,
};
pub use dispatch::{
    ActionKind, ActionSlots, Completed, DispatchResult, Dispatcher, Notice, NoticeLevel,
    SlotState, SlotStates,
};
pub use error::{ApiError, ApiResult, DispatchError};
pub use session::{LoadReport, LoadStats, Ranking, RankingSource, Session};
