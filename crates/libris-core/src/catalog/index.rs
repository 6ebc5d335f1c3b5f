//! In-memory catalog of normalized books and users

use std::collections::HashMap;

use super::filter::BookFilter;
use crate::error::{CatalogError, Entity, Result};
use crate::model::{Book, BookId, User, UserId};

/// Normalized books and users, in server response order, with O(1) lookup
///
/// Borrow and return bookkeeping here mirrors calls the server has already
/// accepted. The catalog never decides on its own that a loan happened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    books: Vec<Book>,
    book_index: HashMap<BookId, usize>,
    users: Vec<User>,
    user_index: HashMap<UserId, usize>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already-normalized records
    pub fn with_records(books: Vec<Book>, users: Vec<User>) -> Self {
        let mut catalog = Self::new();
        catalog.replace_books(books);
        catalog.replace_users(users);
        catalog
    }

    // ==================== Bulk Replace ====================

    /// Swap in a freshly loaded book list
    ///
    /// The new list and its index are built aside and swapped in together, so
    /// readers never see half a load. A repeated id keeps its first record.
    pub fn replace_books(&mut self, books: Vec<Book>) {
        let (books, book_index) = build_index(books, |b| b.id);
        self.books = books;
        self.book_index = book_index;
        tracing::debug!(count = self.books.len(), "Replaced books");
    }

    /// Swap in a freshly loaded user list
    pub fn replace_users(&mut self, users: Vec<User>) {
        let (users, user_index) = build_index(users, |u| u.id);
        self.users = users;
        self.user_index = user_index;
        tracing::debug!(count = self.users.len(), "Replaced users");
    }

    // ==================== Queries ====================

    /// All books, in load order
    pub fn books(&self) -> impl Iterator<Item = &Book> + Clone {
        self.books.iter()
    }

    /// All users, in load order
    pub fn users(&self) -> impl Iterator<Item = &User> + Clone {
        self.users.iter()
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn find_book(&self, id: BookId) -> Option<&Book> {
        self.book_index.get(&id).map(|&i| &self.books[i])
    }

    pub fn find_user(&self, id: UserId) -> Option<&User> {
        self.user_index.get(&id).map(|&i| &self.users[i])
    }

    /// Books matching `filter`, lazily, in load order
    ///
    /// The iterator can be cloned to walk the matches again.
    pub fn filter_books<'a>(
        &'a self,
        filter: &BookFilter,
    ) -> impl Iterator<Item = &'a Book> + Clone + 'a {
        let matcher = filter.matcher();
        self.books.iter().filter(move |book| matcher.matches(book))
    }

    /// Books a user currently holds, in load order
    ///
    /// Ids the catalog does not know are skipped. An unknown user yields nothing.
    pub fn borrowed_by(&self, user: UserId) -> impl Iterator<Item = &Book> + Clone {
        let held = self.find_user(user).map(|u| &u.borrowed_book_ids);
        self.books
            .iter()
            .filter(move |book| held.is_some_and(|ids| ids.contains(&book.id)))
    }

    // ==================== Loans ====================

    /// Record a loan the server has accepted
    ///
    /// Fails without touching anything when the user or book is unknown, the
    /// book has no copies left, or the user already holds it.
    pub fn apply_borrow(&mut self, user_id: UserId, book_id: BookId) -> Result<(&Book, &User)> {
        let ui = self.user_position(user_id)?;
        let bi = self.book_position(book_id)?;

        if self.books[bi].available_copies == 0 {
            return Err(CatalogError::Unavailable(book_id));
        }
        if self.users[ui].has_borrowed(book_id) {
            return Err(CatalogError::AlreadyBorrowed {
                user: user_id,
                book: book_id,
            });
        }

        self.books[bi].available_copies -= 1;
        self.users[ui].borrowed_book_ids.insert(book_id);

        Ok((&self.books[bi], &self.users[ui]))
    }

    /// Record a return the server has accepted
    pub fn apply_return(&mut self, user_id: UserId, book_id: BookId) -> Result<(&Book, &User)> {
        let ui = self.user_position(user_id)?;
        if !self.users[ui].has_borrowed(book_id) {
            return Err(CatalogError::NotBorrowed {
                user: user_id,
                book: book_id,
            });
        }
        let bi = self.book_position(book_id)?;

        let book = &mut self.books[bi];
        book.available_copies = (book.available_copies + 1).min(book.total_copies);
        self.users[ui].borrowed_book_ids.remove(&book_id);

        Ok((&self.books[bi], &self.users[ui]))
    }

    // ==================== Single-record Updates ====================

    /// Add a created book, or replace the record with the same id in place
    pub fn insert_book(&mut self, book: Book) {
        match self.book_index.get(&book.id) {
            Some(&i) => self.books[i] = book,
            None => {
                self.book_index.insert(book.id, self.books.len());
                self.books.push(book);
            }
        }
    }

    /// Add a created user, or replace the record with the same id in place
    pub fn insert_user(&mut self, user: User) {
        match self.user_index.get(&user.id) {
            Some(&i) => self.users[i] = user,
            None => {
                self.user_index.insert(user.id, self.users.len());
                self.users.push(user);
            }
        }
    }

    /// Drop a deleted book and forget it in every user's loans
    pub fn remove_book(&mut self, id: BookId) -> Option<Book> {
        let position = self.book_index.get(&id).copied()?;
        let removed = self.books.remove(position);
        self.book_index = positions(&self.books, |b| b.id);

        for user in &mut self.users {
            user.borrowed_book_ids.remove(&id);
        }

        Some(removed)
    }

    /// Drop a deleted user
    pub fn remove_user(&mut self, id: UserId) -> Option<User> {
        let position = self.user_index.get(&id).copied()?;
        let removed = self.users.remove(position);
        self.user_index = positions(&self.users, |u| u.id);
        Some(removed)
    }

    fn book_position(&self, id: BookId) -> Result<usize> {
        self.book_index
            .get(&id)
            .copied()
            .ok_or(CatalogError::NotFound(Entity::Book(id)))
    }

    fn user_position(&self, id: UserId) -> Result<usize> {
        self.user_index
            .get(&id)
            .copied()
            .ok_or(CatalogError::NotFound(Entity::User(id)))
    }
}

fn build_index<T, K, F>(records: Vec<T>, key: F) -> (Vec<T>, HashMap<K, usize>)
where
    K: Copy + Eq + std::hash::Hash + std::fmt::Display,
    F: Fn(&T) -> K,
{
    let mut kept = Vec::with_capacity(records.len());
    let mut index = HashMap::with_capacity(records.len());

    for record in records {
        let id = key(&record);
        if index.contains_key(&id) {
            tracing::warn!(%id, "Dropping repeated record");
            continue;
        }
        index.insert(id, kept.len());
        kept.push(record);
    }

    (kept, index)
}

fn positions<T, K, F>(records: &[T], key: F) -> HashMap<K, usize>
where
    K: Eq + std::hash::Hash,
    F: Fn(&T) -> K,
{
    records
        .iter()
        .enumerate()
        .map(|(i, record)| (key(record), i))
        .collect()
}
