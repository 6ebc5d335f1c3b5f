//! Error types for libris-client

use thiserror::Error;

use libris_core::CatalogError;

use crate::dispatch::{ActionKind, Notice};

/// Result type alias for catalog API calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure talking to the catalog API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (connection, timeout, TLS)
    #[error("Request failed: {message}")]
    Network { message: String },

    /// The server answered with a non-2xx status or an error envelope
    #[error("HTTP {status}{}", message_suffix(.message))]
    Status {
        status: u16,
        message: Option<String>,
    },

    /// The response body was not the JSON the client expected
    #[error("Invalid response: {message}")]
    Decode { message: String },

    /// An endpoint URL could not be built
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    /// The request was refused before sending
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

impl ApiError {
    /// HTTP status, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text to show the user: the server's own message when it sent one
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ApiError::Status {
                status: status.as_u16(),
                message: None,
            },
            None => ApiError::Network {
                message: err.to_string(),
            },
        }
    }
}

/// Failure of a user-initiated action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The same action is still waiting for the server
    #[error("{0} is already in progress")]
    ActionInFlight(ActionKind),

    /// The server refused the action or could not be reached
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The request or a server record did not pass local checks
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl DispatchError {
    /// Transient message for the UI
    pub fn notice(&self) -> Notice {
        match self {
            DispatchError::Api(err) => Notice::error(err.user_message()),
            other => Notice::error(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let with_message = ApiError::Status {
            status: 400,
            message: Some("Book is not available. Title: Dune".to_string()),
        };
        assert_eq!(
            with_message.to_string(),
            "HTTP 400: Book is not available. Title: Dune"
        );
        assert_eq!(with_message.user_message(), "Book is not available. Title: Dune");
        assert_eq!(with_message.status(), Some(400));

        let bare = ApiError::Status {
            status: 502,
            message: None,
        };
        assert_eq!(bare.to_string(), "HTTP 502");
        assert_eq!(bare.user_message(), "HTTP 502");
    }

    #[test]
    fn test_network_has_no_status() {
        let err = ApiError::Network {
            message: "connection refused".to_string(),
        };
        assert_eq!(err.status(), None);
        assert_eq!(err.user_message(), "Request failed: connection refused");
    }
}
