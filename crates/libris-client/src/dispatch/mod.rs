//! Action dispatch
//!
//! The [`Dispatcher`] sends user actions to the server and folds accepted
//! results back into the catalog. An action runs in three steps:
//!
//! 1. acquire its slot (refused while the same action is in flight)
//! 2. send the request; on rejection mark the slot failed and stop, leaving
//!    catalog, history and view untouched
//! 3. reconcile the catalog, record a transaction for loans, publish a fresh
//!    [`ViewSnapshot`]
//!
//! Every outcome carries a [`Notice`] for the UI.

mod notice;
mod slot;

pub use notice::{Notice, NoticeLevel};
pub use slot::{ActionKind, ActionSlots, SlotGuard, SlotState, SlotStates};

use tokio::sync::watch;

use libris_core::{
    normalize_book, normalize_user, Book, BookId, Catalog, ReconcileMode, Transaction,
    TransactionKind, TransactionLog, User, UserId, ViewSnapshot,
};

use crate::api::{LibraryApi, LoanReceipt, NewBook, NewUser};
use crate::error::{ApiError, DispatchError};
use crate::session::{LoadReport, Session};

/// A finished action and the message to show for it
#[derive(Debug, Clone, PartialEq)]
pub struct Completed<T> {
    pub value: T,
    pub notice: Notice,
}

pub type DispatchResult<T> = Result<Completed<T>, DispatchError>;

pub struct Dispatcher<A> {
    session: Session<A>,
    log: TransactionLog,
    slots: ActionSlots,
    view: watch::Sender<ViewSnapshot>,
}

impl<A: LibraryApi> Dispatcher<A> {
    pub fn new(session: Session<A>) -> Self {
        let (view, _) = watch::channel(session.snapshot());
        Self {
            session,
            log: TransactionLog::new(),
            slots: ActionSlots::new(),
            view,
        }
    }

    pub fn session(&self) -> &Session<A> {
        &self.session
    }

    pub fn catalog(&self) -> &Catalog {
        self.session.catalog()
    }

    /// Shared handle to the action slots
    pub fn slots(&self) -> &ActionSlots {
        &self.slots
    }

    pub fn subscribe_slots(&self) -> watch::Receiver<SlotStates> {
        self.slots.subscribe()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<ViewSnapshot> {
        self.view.subscribe()
    }

    /// The most recent transactions, newest first, up to the configured limit
    pub fn history(&self) -> impl Iterator<Item = &Transaction> {
        self.log.recent(self.session.config().view.history_limit)
    }

    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    /// Load books and users and publish the result
    pub async fn load(&mut self) -> Completed<LoadReport> {
        let report = self.session.load_all().await;
        self.publish();

        let notice = match report.first_error() {
            None => Notice::info(format!(
                "Loaded {} books and {} users",
                self.catalog().book_count(),
                self.catalog().user_count()
            )),
            Some(err) => Notice::error(err.user_message()),
        };
        Completed {
            value: report,
            notice,
        }
    }

    // ==================== Loans ====================

    pub async fn borrow(&mut self, user: UserId, book: BookId) -> DispatchResult<Transaction> {
        self.loan(TransactionKind::Borrow, user, book).await
    }

    pub async fn return_book(&mut self, user: UserId, book: BookId) -> DispatchResult<Transaction> {
        self.loan(TransactionKind::Return, user, book).await
    }

    async fn loan(
        &mut self,
        kind: TransactionKind,
        user: UserId,
        book: BookId,
    ) -> DispatchResult<Transaction> {
        let action = match kind {
            TransactionKind::Borrow => ActionKind::Borrow,
            TransactionKind::Return => ActionKind::Return,
        };
        let guard = self.slots.acquire(action)?;

        let api = self.session.api();
        let response = match kind {
            TransactionKind::Borrow => api.borrow(user, book).await,
            TransactionKind::Return => api.return_book(user, book).await,
        };
        let receipt = match response {
            Ok(receipt) => receipt,
            Err(err) => return Err(rejected(guard, err)),
        };

        self.reconcile_loan(kind, user, book).await;

        let transaction = self.loan_transaction(kind, user, book, &receipt);
        let transaction = self.log.record(transaction).clone();
        tracing::info!(user = %user, book = %book, "{}", transaction.summary());

        self.publish();
        guard.succeed();

        let notice = Notice::success(receipt.message.unwrap_or_else(|| transaction.summary()));
        Ok(Completed {
            value: transaction,
            notice,
        })
    }

    async fn reconcile_loan(&mut self, kind: TransactionKind, user: UserId, book: BookId) {
        if self.reconcile_mode() == ReconcileMode::Refetch {
            self.session.load_all().await;
            return;
        }

        let catalog = self.session.catalog_mut();
        let applied = match kind {
            TransactionKind::Borrow => catalog.apply_borrow(user, book).map(|_| ()),
            TransactionKind::Return => catalog.apply_return(user, book).map(|_| ()),
        };
        if let Err(err) = applied {
            tracing::warn!("Local catalog disagrees with server ({}), reloading", err);
            self.session.load_all().await;
        }
    }

    fn loan_transaction(
        &self,
        kind: TransactionKind,
        user: UserId,
        book: BookId,
        receipt: &LoanReceipt,
    ) -> Transaction {
        let catalog = self.catalog();
        let user_name = receipt
            .user_name
            .clone()
            .or_else(|| catalog.find_user(user).map(|u| u.name.clone()))
            .unwrap_or_else(|| format!("User {}", user));
        let book_title = receipt
            .book_title
            .clone()
            .or_else(|| catalog.find_book(book).map(|b| b.title.clone()))
            .unwrap_or_else(|| format!("Book {}", book));

        Transaction::new(kind, user, user_name, book, book_title)
    }

    // ==================== Books ====================

    /// Create a book; the value is the created record when it could be read
    pub async fn add_book(&mut self, book: NewBook) -> DispatchResult<Option<Book>> {
        let guard = self.slots.acquire(ActionKind::AddBook)?;
        if let Err(err) = book.validate() {
            return Err(rejected(guard, err));
        }

        let raw = match self.session.api().create_book(&book).await {
            Ok(raw) => raw,
            Err(err) => return Err(rejected(guard, err)),
        };

        let created = match normalize_book(&raw) {
            Ok(created) => Some(created),
            Err(err) => {
                tracing::warn!("Created book could not be read ({}), reloading", err);
                None
            }
        };
        match (&created, self.reconcile_mode()) {
            (Some(record), ReconcileMode::Local) => {
                self.session.catalog_mut().insert_book(record.clone())
            }
            _ => self.reload_books().await,
        }

        self.publish();
        guard.succeed();
        tracing::info!("Added book \"{}\"", book.title);

        Ok(Completed {
            value: created,
            notice: Notice::success(format!("Added \"{}\"", book.title)),
        })
    }

    pub async fn delete_book(&mut self, id: BookId) -> DispatchResult<()> {
        let guard = self.slots.acquire(ActionKind::DeleteBook)?;

        let ack = match self.session.api().delete_book(id).await {
            Ok(ack) => ack,
            Err(err) => return Err(rejected(guard, err)),
        };

        let removed = match self.reconcile_mode() {
            ReconcileMode::Local => self.session.catalog_mut().remove_book(id),
            ReconcileMode::Refetch => None,
        };
        if removed.is_none() {
            self.session.load_all().await;
        }

        self.publish();
        guard.succeed();
        tracing::info!(book = %id, "Deleted book");

        Ok(Completed {
            value: (),
            notice: Notice::success(ack.message.unwrap_or_else(|| format!("Deleted book {}", id))),
        })
    }

    // ==================== Users ====================

    /// Create a user; the value is the created record when it could be read
    pub async fn add_user(&mut self, user: NewUser) -> DispatchResult<Option<User>> {
        let guard = self.slots.acquire(ActionKind::AddUser)?;
        if let Err(err) = user.validate() {
            return Err(rejected(guard, err));
        }

        let raw = match self.session.api().create_user(&user).await {
            Ok(raw) => raw,
            Err(err) => return Err(rejected(guard, err)),
        };

        let created = match normalize_user(&raw) {
            Ok(created) => Some(created),
            Err(err) => {
                tracing::warn!("Created user could not be read ({}), reloading", err);
                None
            }
        };
        match (&created, self.reconcile_mode()) {
            (Some(record), ReconcileMode::Local) => {
                self.session.catalog_mut().insert_user(record.clone())
            }
            _ => self.reload_users().await,
        }

        self.publish();
        guard.succeed();
        tracing::info!("Added user \"{}\"", user.name);

        Ok(Completed {
            value: created,
            notice: Notice::success(format!("Added user \"{}\"", user.name)),
        })
    }

    pub async fn delete_user(&mut self, id: UserId) -> DispatchResult<()> {
        let guard = self.slots.acquire(ActionKind::DeleteUser)?;

        let ack = match self.session.api().delete_user(id).await {
            Ok(ack) => ack,
            Err(err) => return Err(rejected(guard, err)),
        };

        let removed = match self.reconcile_mode() {
            ReconcileMode::Local => self.session.catalog_mut().remove_user(id),
            ReconcileMode::Refetch => None,
        };
        match removed {
            // Copies the user held may have gone back on the shelf
            Some(user) if user.borrowed_count() > 0 => self.reload_books().await,
            Some(_) => {}
            None => {
                self.session.load_all().await;
            }
        }

        self.publish();
        guard.succeed();
        tracing::info!(user = %id, "Deleted user");

        Ok(Completed {
            value: (),
            notice: Notice::success(ack.message.unwrap_or_else(|| format!("Deleted user {}", id))),
        })
    }

    // ==================== Helpers ====================

    fn reconcile_mode(&self) -> ReconcileMode {
        self.session.config().sync.reconcile
    }

    async fn reload_books(&mut self) {
        if let Err(err) = self.session.load_books().await {
            tracing::warn!("Book reload failed: {}", err);
        }
    }

    async fn reload_users(&mut self) {
        if let Err(err) = self.session.load_users().await {
            tracing::warn!("User reload failed: {}", err);
        }
    }

    fn publish(&self) {
        self.view.send_replace(self.session.snapshot());
    }
}

/// Mark the slot failed with the message the user will see
fn rejected(guard: SlotGuard, err: ApiError) -> DispatchError {
    let message = err.user_message();
    tracing::warn!(action = %guard.kind(), "Action rejected: {}", message);
    guard.fail(message);
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Ack, MockLibraryApi};
    use libris_core::{LibrisConfig, SyncConfig};
    use serde_json::{json, Value};

    fn books_json() -> Vec<Value> {
        vec![
            json!({"bookID": 101, "title": "Dune", "author": "Frank Herbert", "totalCopies": 3, "availableCopies": 2}),
            json!({"bookID": 102, "title": "Emma", "author": "Jane Austen", "copies": "1", "availableCopies": "0"}),
        ]
    }

    fn users_json() -> Vec<Value> {
        vec![
            json!({"userID": 1001, "name": "Ada", "borrowedBooks": []}),
            json!({"userID": 1002, "name": "Grace", "borrowedBooks": [102]}),
        ]
    }

    fn with_catalog(api: &mut MockLibraryApi) {
        api.expect_list_books().returning(|| Ok(books_json()));
        api.expect_list_users().returning(|| Ok(users_json()));
    }

    async fn loaded(api: MockLibraryApi, config: LibrisConfig) -> Dispatcher<MockLibraryApi> {
        let mut dispatcher = Dispatcher::new(Session::new(api, config));
        dispatcher.load().await;
        dispatcher
    }

    fn refetch_config() -> LibrisConfig {
        LibrisConfig {
            sync: SyncConfig {
                reconcile: ReconcileMode::Refetch,
            },
            ..LibrisConfig::default()
        }
    }

    #[tokio::test]
    async fn test_borrow_applies_locally_and_records() {
        let mut api = MockLibraryApi::new();
        with_catalog(&mut api);
        api.expect_borrow()
            .withf(|user, book| *user == UserId(1001) && *book == BookId(101))
            .times(1)
            .returning(|_, _| {
                Ok(LoanReceipt {
                    message: Some("Book borrowed successfully".to_string()),
                    user_name: Some("Ada".to_string()),
                    book_title: Some("Dune".to_string()),
                })
            });

        let mut dispatcher = loaded(api, LibrisConfig::default()).await;
        let mut view = dispatcher.subscribe_view();
        view.borrow_and_update();

        let done = dispatcher.borrow(UserId(1001), BookId(101)).await.unwrap();

        assert_eq!(done.notice, Notice::success("Book borrowed successfully"));
        assert_eq!(done.value.summary(), "Ada borrowed \"Dune\"");
        assert_eq!(dispatcher.catalog().find_book(BookId(101)).unwrap().available_copies, 1);
        assert!(dispatcher.catalog().find_user(UserId(1001)).unwrap().has_borrowed(BookId(101)));
        assert_eq!(dispatcher.history().count(), 1);
        assert_eq!(dispatcher.slots().state(ActionKind::Borrow), SlotState::Succeeded);

        assert!(view.has_changed().unwrap());
        assert_eq!(view.borrow().header.total_borrowed, 3);
    }

    #[tokio::test]
    async fn test_rejected_borrow_changes_nothing() {
        let mut api = MockLibraryApi::new();
        with_catalog(&mut api);
        api.expect_borrow().returning(|_, _| {
            Err(ApiError::Status {
                status: 400,
                message: Some("Book is not available. Title: Emma".to_string()),
            })
        });

        let mut dispatcher = loaded(api, LibrisConfig::default()).await;
        let before = dispatcher.catalog().clone();
        let mut view = dispatcher.subscribe_view();
        view.borrow_and_update();

        let err = dispatcher.borrow(UserId(1001), BookId(102)).await.unwrap_err();

        assert_eq!(err.notice(), Notice::error("Book is not available. Title: Emma"));
        assert_eq!(dispatcher.catalog(), &before);
        assert!(dispatcher.log().is_empty());
        assert!(!view.has_changed().unwrap());
        assert_eq!(
            dispatcher.slots().state(ActionKind::Borrow),
            SlotState::Failed("Book is not available. Title: Emma".to_string())
        );
    }

    #[tokio::test]
    async fn test_in_flight_slot_refuses_second_action() {
        // No borrow expectation: reaching the server would panic
        let api = MockLibraryApi::new();
        let mut dispatcher = Dispatcher::new(Session::new(api, LibrisConfig::default()));

        let _held = dispatcher.slots().clone().acquire(ActionKind::Borrow).unwrap();
        let err = dispatcher.borrow(UserId(1), BookId(1)).await.unwrap_err();
        assert_eq!(err, DispatchError::ActionInFlight(ActionKind::Borrow));
    }

    #[tokio::test]
    async fn test_local_disagreement_triggers_reload() {
        let mut api = MockLibraryApi::new();
        api.expect_list_books().times(2).returning(|| Ok(books_json()));
        api.expect_list_users().times(2).returning(|| Ok(users_json()));
        api.expect_return_book().returning(|_, _| Ok(LoanReceipt::default()));

        let mut dispatcher = loaded(api, LibrisConfig::default()).await;
        // Ada holds nothing locally, so the return cannot be applied
        let done = dispatcher.return_book(UserId(1001), BookId(101)).await.unwrap();

        assert_eq!(done.value.user_name, "Ada");
        assert_eq!(done.value.book_title, "Dune");
        assert_eq!(done.notice, Notice::success("Ada returned \"Dune\""));
    }

    #[tokio::test]
    async fn test_refetch_mode_reloads_after_return() {
        let mut api = MockLibraryApi::new();
        api.expect_list_books().times(2).returning(|| Ok(books_json()));
        api.expect_list_users().times(2).returning(|| Ok(users_json()));
        api.expect_return_book().returning(|_, _| Ok(LoanReceipt::default()));

        let mut dispatcher = loaded(api, refetch_config()).await;
        let done = dispatcher.return_book(UserId(1002), BookId(102)).await.unwrap();

        // The server data still shows the loan; refetch trusts it over a local apply
        assert!(dispatcher.catalog().find_user(UserId(1002)).unwrap().has_borrowed(BookId(102)));
        assert_eq!(done.value.kind, TransactionKind::Return);
    }

    #[tokio::test]
    async fn test_unknown_names_fall_back_to_ids() {
        let mut api = MockLibraryApi::new();
        api.expect_list_books().returning(|| Ok(Vec::new()));
        api.expect_list_users().returning(|| Ok(Vec::new()));
        api.expect_borrow().returning(|_, _| Ok(LoanReceipt::default()));

        let mut dispatcher = Dispatcher::new(Session::new(api, LibrisConfig::default()));
        let done = dispatcher.borrow(UserId(9), BookId(42)).await.unwrap();
        assert_eq!(done.value.user_name, "User 9");
        assert_eq!(done.value.book_title, "Book 42");
    }

    #[tokio::test]
    async fn test_add_book_inserts_created_record() {
        let mut api = MockLibraryApi::new();
        with_catalog(&mut api);
        api.expect_create_book()
            .withf(|book| book.title == "Akira")
            .returning(|_| {
                Ok(json!({"id": 103, "title": "Akira", "author": "Katsuhiro Otomo", "copies": 2, "category": "Manga - Seinen"}))
            });

        let mut dispatcher = loaded(api, LibrisConfig::default()).await;
        let done = dispatcher
            .add_book(NewBook::new("Akira", "Katsuhiro Otomo").with_copies(2))
            .await
            .unwrap();

        let created = done.value.unwrap();
        assert_eq!(created.kind, "Manga");
        assert_eq!(dispatcher.catalog().book_count(), 3);
        assert_eq!(dispatcher.catalog().find_book(BookId(103)).unwrap().available_copies, 2);
    }

    #[tokio::test]
    async fn test_invalid_book_never_reaches_server() {
        let mut dispatcher = Dispatcher::new(Session::new(MockLibraryApi::new(), LibrisConfig::default()));
        let err = dispatcher.add_book(NewBook::new("", "Nobody")).await.unwrap_err();

        assert!(matches!(err, DispatchError::Api(ApiError::InvalidRequest(_))));
        assert!(matches!(
            dispatcher.slots().state(ActionKind::AddBook),
            SlotState::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_book_clears_loans() {
        let mut api = MockLibraryApi::new();
        with_catalog(&mut api);
        api.expect_delete_book().returning(|_| Ok(Ack::default()));

        let mut dispatcher = loaded(api, LibrisConfig::default()).await;
        let done = dispatcher.delete_book(BookId(102)).await.unwrap();

        assert_eq!(done.notice.message, "Deleted book 102");
        assert!(dispatcher.catalog().find_book(BookId(102)).is_none());
        assert_eq!(dispatcher.catalog().find_user(UserId(1002)).unwrap().borrowed_count(), 0);
    }

    #[tokio::test]
    async fn test_add_and_delete_user() {
        let mut api = MockLibraryApi::new();
        with_catalog(&mut api);
        api.expect_create_user()
            .returning(|_| Ok(json!({"userID": "1003", "name": "Linus", "role": "librarian"})));
        api.expect_delete_user().returning(|_| {
            Ok(Ack {
                message: Some("User deleted".to_string()),
            })
        });

        let mut dispatcher = loaded(api, LibrisConfig::default()).await;
        let created = dispatcher.add_user(NewUser::new("Linus")).await.unwrap().value.unwrap();
        assert_eq!(created.id, UserId(1003));
        assert_eq!(dispatcher.catalog().user_count(), 3);

        let done = dispatcher.delete_user(UserId(1003)).await.unwrap();
        assert_eq!(done.notice.message, "User deleted");
        assert_eq!(dispatcher.catalog().user_count(), 2);
    }

    #[tokio::test]
    async fn test_history_respects_limit() {
        let mut api = MockLibraryApi::new();
        api.expect_list_books().returning(|| {
            Ok(vec![json!({"id": 1, "title": "Dune", "author": "Frank Herbert", "copies": 50})])
        });
        api.expect_list_users().returning(|| {
            Ok((1..=12).map(|i| json!({"id": i, "name": format!("User {}", i)})).collect())
        });
        api.expect_borrow().returning(|_, _| Ok(LoanReceipt::default()));

        let mut dispatcher = loaded(api, LibrisConfig::default()).await;
        for user in 1..=12 {
            dispatcher.borrow(UserId(user), BookId(1)).await.unwrap();
        }

        assert_eq!(dispatcher.log().len(), 12);
        let recent: Vec<_> = dispatcher.history().map(|t| t.user_id).collect();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0], UserId(12));
    }
}
