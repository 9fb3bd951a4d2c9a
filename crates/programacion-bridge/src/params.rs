//! URL query parameters supplied by the host frame.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bridge errors.
#[derive(Error, Debug, PartialEq)]
pub enum BridgeError {
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Invalid percent-encoding in parameter: {0}")]
    Encoding(String),

    #[error("Token request {request_id} timed out after {timeout_ms} ms")]
    Timeout { request_id: String, timeout_ms: i64 },

    #[error("Response for request {got} does not match pending request {expected}")]
    RequestMismatch { expected: String, got: String },
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::JsonParse(e.to_string())
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Identity and display hints read from the frame URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameParams {
    pub user_id: Option<String>,
    /// Role name, lowercased.
    pub role: Option<String>,
    pub can_write: bool,
    pub is_admin: bool,
    pub token: Option<String>,
    /// Requested view mode, as written in the URL (`lab`, `com`, `admin`, ...).
    pub mode: Option<String>,
}

impl FrameParams {
    /// Parse a query string such as `?userId=42&role=Admin&isAdmin=true`.
    ///
    /// Unknown keys are ignored. Empty values are treated as absent. The
    /// boolean flags are set only by the literal value `true`.
    pub fn from_query(query: &str) -> BridgeResult<Self> {
        let mut params = FrameParams::default();
        let query = query.trim_start_matches('?');

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, raw_value) = match pair.split_once('=') {
                Some((k, v)) => (k, v),
                None => (pair, ""),
            };
            let value = decode_component(raw_value)?;

            match key {
                "userId" => params.user_id = non_empty(value),
                "role" => params.role = non_empty(value).map(|r| r.to_lowercase()),
                "canWrite" => params.can_write = value == "true",
                "isAdmin" => params.is_admin = value == "true",
                "token" => params.token = non_empty(value),
                "mode" => params.mode = non_empty(value),
                _ => {}
            }
        }

        Ok(params)
    }

    /// Parse the query portion of a full URL. A URL without `?` yields defaults.
    pub fn from_url(url: &str) -> BridgeResult<Self> {
        let without_fragment = url.split('#').next().unwrap_or_default();
        match without_fragment.split_once('?') {
            Some((_, query)) => Self::from_query(query),
            None => Ok(Self::default()),
        }
    }

    /// True when the host supplied enough identity to skip the login screen.
    pub fn has_identity(&self) -> bool {
        self.role.is_some()
    }
}

fn decode_component(raw: &str) -> BridgeResult<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|cow| cow.into_owned())
        .map_err(|_| BridgeError::Encoding(raw.to_string()))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
