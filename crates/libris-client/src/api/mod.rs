//! The catalog REST API as the client consumes it
//!
//! [`LibraryApi`] is the seam between the session and the network. The HTTP
//! implementation lives in [`http`]; tests substitute a generated mock.
//! Record-returning calls hand back raw JSON values so that every field-shape
//! decision stays in `libris_core::normalize`.

mod envelope;
mod http;

pub use envelope::{decode_envelope, Envelope};
pub use http::HttpLibraryApi;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use libris_core::{BookId, Role, UserId};

use crate::error::{ApiError, ApiResult};

/// Operations offered by the catalog server
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LibraryApi: Send + Sync {
    /// `GET /books`
    async fn list_books(&self) -> ApiResult<Vec<Value>>;

    /// `GET /books/search`
    async fn search_books(&self, query: &SearchQuery) -> ApiResult<Vec<Value>>;

    /// `POST /books`, returning the created record
    async fn create_book(&self, book: &NewBook) -> ApiResult<Value>;

    /// `DELETE /books/:id`
    async fn delete_book(&self, id: BookId) -> ApiResult<Ack>;

    /// `GET /users`
    async fn list_users(&self) -> ApiResult<Vec<Value>>;

    /// `POST /users`, returning the created record
    async fn create_user(&self, user: &NewUser) -> ApiResult<Value>;

    /// `DELETE /users/:id`
    async fn delete_user(&self, id: UserId) -> ApiResult<Ack>;

    /// `GET /users/:id/borrowed`
    async fn borrowed_books(&self, user: UserId) -> ApiResult<Vec<Value>>;

    /// `POST /borrow`
    async fn borrow(&self, user: UserId, book: BookId) -> ApiResult<LoanReceipt>;

    /// `POST /return`
    async fn return_book(&self, user: UserId, book: BookId) -> ApiResult<LoanReceipt>;

    /// `GET /dashboard`
    async fn dashboard(&self) -> ApiResult<Dashboard>;

    /// `GET /statistics/most-borrowed?limit=`
    async fn most_borrowed(&self, limit: usize) -> ApiResult<Vec<Value>>;

    /// `GET /statistics/most-active?limit=`
    async fn most_active(&self, limit: usize) -> ApiResult<Vec<Value>>;
}

/// Server-side book search; blank fields are left out of the request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Query parameters, in title/author/category order
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        [
            ("title", &self.title),
            ("author", &self.author),
            ("category", &self.category),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        })
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.params().is_empty()
    }
}

/// Body of `POST /books`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copies: Option<u32>,
}

impl NewBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            isbn: None,
            category: None,
            copies: None,
        }
    }

    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_copies(mut self, copies: u32) -> Self {
        self.copies = Some(copies);
        self
    }

    /// Checks the fields the server would otherwise reject
    pub fn validate(&self) -> ApiResult<()> {
        if self.title.trim().is_empty() {
            return Err(ApiError::InvalidRequest("title is required".to_string()));
        }
        if self.author.trim().is_empty() {
            return Err(ApiError::InvalidRequest("author is required".to_string()));
        }
        if self.copies == Some(0) {
            return Err(ApiError::InvalidRequest(
                "copies must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Body of `POST /users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl NewUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            role: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn validate(&self) -> ApiResult<()> {
        if self.name.trim().is_empty() {
            return Err(ApiError::InvalidRequest("name is required".to_string()));
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(ApiError::InvalidRequest(format!(
                    "invalid email address: {}",
                    email
                )));
            }
        }
        Ok(())
    }
}

/// Acknowledgement of a request with no payload worth keeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    pub message: Option<String>,
}

/// Server answer to a borrow or return
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanReceipt {
    pub message: Option<String>,
    pub user_name: Option<String>,
    pub book_title: Option<String>,
}

impl LoanReceipt {
    pub(crate) fn from_envelope(envelope: Envelope) -> Self {
        let field = |key: &str| {
            envelope
                .data
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let user_name = field("userName");
        let book_title = field("bookTitle");

        Self {
            message: envelope.message,
            user_name,
            book_title,
        }
    }
}

/// Server-computed dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dashboard {
    pub overview: Overview,
    pub category_distribution: Vec<CategoryCount>,
}

/// Dashboard counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Overview {
    pub total_books: u64,
    /// Titles with at least one copy on the shelf
    pub available_books: u64,
    /// Titles with every copy out
    pub borrowed_books: u64,
    pub total_users: u64,
    pub total_borrowed_instances: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_params_skip_blanks() {
        let query = SearchQuery::new().title("  Dune ").author("   ");
        assert_eq!(query.params(), vec![("title", "Dune")]);
        assert!(!query.is_empty());
        assert!(SearchQuery::new().author("").is_empty());
    }

    #[test]
    fn test_new_book_body_omits_unset_fields() {
        let body = serde_json::to_value(NewBook::new("Dune", "Frank Herbert").with_copies(3)).unwrap();
        assert_eq!(
            body,
            json!({"title": "Dune", "author": "Frank Herbert", "copies": 3})
        );
    }

    #[test]
    fn test_new_book_validation() {
        assert!(NewBook::new("Dune", "Frank Herbert").validate().is_ok());
        assert!(NewBook::new(" ", "Frank Herbert").validate().is_err());
        assert!(NewBook::new("Dune", "Frank Herbert")
            .with_copies(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_new_user_validation() {
        assert!(NewUser::new("Ada").with_email("ada@example.org").validate().is_ok());
        assert!(NewUser::new("Ada").with_email("ada").validate().is_err());
        assert!(NewUser::new("").validate().is_err());
    }

    #[test]
    fn test_new_user_body_uses_lowercase_role() {
        let body = serde_json::to_value(NewUser::new("Ada").with_role(Role::Librarian)).unwrap();
        assert_eq!(body, json!({"name": "Ada", "role": "librarian"}));
    }

    #[test]
    fn test_loan_receipt_reads_names() {
        let envelope = Envelope {
            message: Some("Book borrowed successfully".to_string()),
            data: json!({"userName": "Ada", "bookTitle": "Dune"}),
        };
        let receipt = LoanReceipt::from_envelope(envelope);
        assert_eq!(receipt.user_name.as_deref(), Some("Ada"));
        assert_eq!(receipt.book_title.as_deref(), Some("Dune"));

        let bare = LoanReceipt::from_envelope(Envelope::default());
        assert_eq!(bare, LoanReceipt::default());
    }

    #[test]
    fn test_dashboard_tolerates_missing_fields() {
        let dashboard: Dashboard = serde_json::from_value(json!({
            "overview": {"totalBooks": 4, "totalUsers": 2},
            "categoryDistribution": [{"category": "Fiction", "count": 3}]
        }))
        .unwrap();
        assert_eq!(dashboard.overview.total_books, 4);
        assert_eq!(dashboard.overview.borrowed_books, 0);
        assert_eq!(dashboard.category_distribution[0].count, 3);
    }
}
