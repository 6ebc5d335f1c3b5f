//! reqwest implementation of the catalog API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Value};
use url::Url;

use libris_core::{ApiConfig, BookId, UserId};

use super::{
    decode_envelope, Ack, Dashboard, Envelope, LibraryApi, LoanReceipt, NewBook, NewUser,
    SearchQuery,
};
use crate::error::{ApiError, ApiResult};

/// Catalog API over HTTP
#[derive(Debug, Clone)]
pub struct HttpLibraryApi {
    client: Client,
    base_url: Url,
}

impl HttpLibraryApi {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        // A trailing slash makes `Url::join` append rather than replace
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base).map_err(|_| ApiError::InvalidUrl {
            url: config.base_url.clone(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Network {
                message: e.to_string(),
            })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> ApiResult<Url> {
        let invalid = || ApiError::InvalidUrl {
            url: format!("{}{}", self.base_url, path),
        };
        let mut url = self.base_url.join(path).map_err(|_| invalid())?;
        if !params.is_empty() {
            url = Url::parse_with_params(url.as_str(), params).map_err(|_| invalid())?;
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Envelope> {
        let response = request.send().await?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ApiError::Decode {
            message: e.to_string(),
        })?;

        tracing::debug!(status, bytes = body.len(), "catalog API response");
        decode_envelope(status, &body)
    }

    async fn call(&self, method: Method, path: &str, params: &[(&str, &str)]) -> ApiResult<Envelope> {
        let url = self.endpoint(path, params)?;
        tracing::debug!(%method, %url, "catalog API request");
        self.send(self.client.request(method, url)).await
    }

    async fn call_with_body(&self, method: Method, path: &str, body: &Value) -> ApiResult<Envelope> {
        let url = self.endpoint(path, &[])?;
        tracing::debug!(%method, %url, "catalog API request");
        self.send(self.client.request(method, url).json(body)).await
    }

    fn loan_body(user: UserId, book: BookId) -> Value {
        json!({ "userID": user.0, "bookID": book.0 })
    }

    fn encode<T: serde::Serialize>(value: &T) -> ApiResult<Value> {
        serde_json::to_value(value).map_err(|e| ApiError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl LibraryApi for HttpLibraryApi {
    async fn list_books(&self) -> ApiResult<Vec<Value>> {
        self.call(Method::GET, "books", &[]).await?.into_list()
    }

    async fn search_books(&self, query: &SearchQuery) -> ApiResult<Vec<Value>> {
        if query.is_empty() {
            return Err(ApiError::InvalidRequest(
                "search needs a title, author or category".to_string(),
            ));
        }
        self.call(Method::GET, "books/search", &query.params())
            .await?
            .into_list()
    }

    async fn create_book(&self, book: &NewBook) -> ApiResult<Value> {
        book.validate()?;
        self.call_with_body(Method::POST, "books", &Self::encode(book)?)
            .await?
            .into_record()
    }

    async fn delete_book(&self, id: BookId) -> ApiResult<Ack> {
        let envelope = self.call(Method::DELETE, &format!("books/{}", id), &[]).await?;
        Ok(Ack {
            message: envelope.message,
        })
    }

    async fn list_users(&self) -> ApiResult<Vec<Value>> {
        self.call(Method::GET, "users", &[]).await?.into_list()
    }

    async fn create_user(&self, user: &NewUser) -> ApiResult<Value> {
        user.validate()?;
        self.call_with_body(Method::POST, "users", &Self::encode(user)?)
            .await?
            .into_record()
    }

    async fn delete_user(&self, id: UserId) -> ApiResult<Ack> {
        let envelope = self.call(Method::DELETE, &format!("users/{}", id), &[]).await?;
        Ok(Ack {
            message: envelope.message,
        })
    }

    async fn borrowed_books(&self, user: UserId) -> ApiResult<Vec<Value>> {
        self.call(Method::GET, &format!("users/{}/borrowed", user), &[])
            .await?
            .into_list()
    }

    async fn borrow(&self, user: UserId, book: BookId) -> ApiResult<LoanReceipt> {
        let envelope = self
            .call_with_body(Method::POST, "borrow", &Self::loan_body(user, book))
            .await?;
        Ok(LoanReceipt::from_envelope(envelope))
    }

    async fn return_book(&self, user: UserId, book: BookId) -> ApiResult<LoanReceipt> {
        let envelope = self
            .call_with_body(Method::POST, "return", &Self::loan_body(user, book))
            .await?;
        Ok(LoanReceipt::from_envelope(envelope))
    }

    async fn dashboard(&self) -> ApiResult<Dashboard> {
        let envelope = self.call(Method::GET, "dashboard", &[]).await?;
        if envelope.data.is_null() {
            return Ok(Dashboard::default());
        }
        serde_json::from_value(envelope.data).map_err(|e| ApiError::Decode {
            message: e.to_string(),
        })
    }

    async fn most_borrowed(&self, limit: usize) -> ApiResult<Vec<Value>> {
        let limit = limit.to_string();
        self.call(Method::GET, "statistics/most-borrowed", &[("limit", &limit)])
            .await?
            .into_list()
    }

    async fn most_active(&self, limit: usize) -> ApiResult<Vec<Value>> {
        let limit = limit.to_string();
        self.call(Method::GET, "statistics/most-active", &[("limit", &limit)])
            .await?
            .into_list()
    }
}
