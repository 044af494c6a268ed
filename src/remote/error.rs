//! Classification of backend failures.
//!
//! Converts HTTP status codes and error bodies into `LeadboardError`s so the
//! rest of the crate only sees the four backend kinds: network, HTTP status,
//! format and expired authentication.

use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::LeadboardError;

/// A non-success HTTP response, before classification.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    /// Human-readable message extracted from the response body
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Build from a response body, preferring the backend's own message.
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        let message = extract_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        Self::new(status, message)
    }

    /// 401 and 403 mean the stored credential is no longer accepted.
    pub fn is_auth_failure(&self) -> bool {
        is_auth_status(self.status)
    }

    pub fn to_leadboard_error(&self) -> LeadboardError {
        if self.is_auth_failure() {
            return LeadboardError::AuthExpired {
                status: self.status.as_u16(),
            };
        }
        LeadboardError::HttpStatus {
            status: self.status.as_u16(),
            message: self.message.clone(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status.as_u16(), self.message)
    }
}

impl From<ApiError> for LeadboardError {
    fn from(error: ApiError) -> Self {
        error.to_leadboard_error()
    }
}

pub fn is_auth_status(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Pull `detail`, `message` or `error` out of a JSON error body.
fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => ["detail", "message", "error"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map(str::to_string),
        Ok(_) => None,
        // Plain-text bodies are shown as-is, truncated
        Err(_) => Some(trimmed.chars().take(200).collect()),
    }
}
