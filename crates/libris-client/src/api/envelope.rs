//! Response envelope decoding
//!
//! Every server response is `{status, message?, data?}`. Decoding is pure so
//! the rules can be tested without a server.

use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

/// A successful response with its payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    pub message: Option<String>,
    /// `Null` when the server sent no payload
    pub data: Value,
}

impl Envelope {
    /// The payload as a list of records; a missing payload is an empty list
    pub fn into_list(self) -> ApiResult<Vec<Value>> {
        match self.data {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items),
            other => Err(ApiError::Decode {
                message: format!("expected a list, got {}", kind_of(&other)),
            }),
        }
    }

    /// The payload as a single record
    pub fn into_record(self) -> ApiResult<Value> {
        match self.data {
            Value::Object(_) => Ok(self.data),
            other => Err(ApiError::Decode {
                message: format!("expected a record, got {}", kind_of(&other)),
            }),
        }
    }
}

/// Decode a response body, turning rejections into [`ApiError::Status`]
///
/// A rejection is a non-2xx status or an envelope whose `status` is `"error"`.
/// A body that is JSON but not an object is taken as the payload itself.
pub fn decode_envelope(status: u16, body: &str) -> ApiResult<Envelope> {
    let success = (200..300).contains(&status);

    let parsed = if body.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => value,
            Err(_) if !success => {
                return Err(ApiError::Status {
                    status,
                    message: None,
                })
            }
            Err(e) => {
                return Err(ApiError::Decode {
                    message: e.to_string(),
                })
            }
        }
    };

    let object = match parsed {
        Value::Object(object) => object,
        Value::Null if !success => {
            return Err(ApiError::Status {
                status,
                message: None,
            })
        }
        other if success => {
            return Ok(Envelope {
                message: None,
                data: other,
            })
        }
        _ => {
            return Err(ApiError::Status {
                status,
                message: None,
            })
        }
    };

    let message = text_field(&object, "message").or_else(|| text_field(&object, "error"));
    let rejected = text_field(&object, "status")
        .map(|s| s.eq_ignore_ascii_case("error"))
        .unwrap_or(false);

    if !success || rejected {
        return Err(ApiError::Status { status, message });
    }

    let data = match object.get("data") {
        None | Some(Value::Null) => Value::Null,
        // Some endpoints send the payload as a JSON-encoded string
        Some(Value::String(raw)) => serde_json::from_str(raw).unwrap_or(Value::String(raw.clone())),
        Some(value) => value.clone(),
    };

    Ok(Envelope { message, data })
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
