//! Credential refresh protocol with the parent frame.
//!
//! Protocol:
//! 1. The editor posts `TOKEN_REQUEST` with a fresh request id
//! 2. The host answers with `TOKEN_RESPONSE` carrying the same id
//! 3. Responses arriving after the timeout are rejected

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::params::{BridgeError, BridgeResult};

/// Default time the editor waits for the host to answer.
pub const DEFAULT_TOKEN_TIMEOUT_MS: i64 = 5_000;

/// Messages exchanged with the host frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    TokenRequest {
        #[serde(rename = "requestId")]
        request_id: String,
    },
    TokenResponse {
        #[serde(rename = "requestId")]
        request_id: String,
        token: String,
    },
}

impl HostMessage {
    pub fn to_json(&self) -> BridgeResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Parse a message posted by the host.
///
/// Hosts sometimes post plain strings wrapped in other text; the first JSON
/// object in the payload is used.
pub fn parse_host_message(raw: &str) -> BridgeResult<HostMessage> {
    let start = raw
        .find('{')
        .ok_or_else(|| BridgeError::InvalidFormat("No JSON object found in message".into()))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| BridgeError::InvalidFormat("No closing brace found in message".into()))?;
    if end < start {
        return Err(BridgeError::InvalidFormat("Unbalanced braces in message".into()));
    }

    Ok(serde_json::from_str(&raw[start..=end])?)
}

/// An outstanding credential request.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    request_id: String,
    issued_at: DateTime<Utc>,
    timeout: Duration,
}

impl TokenRequest {
    /// Issue a new request with a random id.
    pub fn new(now: DateTime<Utc>, timeout: Duration) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            issued_at: now,
            timeout,
        }
    }

    /// Issue a request with the default timeout.
    pub fn with_default_timeout(now: DateTime<Utc>) -> Self {
        Self::new(now, Duration::milliseconds(DEFAULT_TOKEN_TIMEOUT_MS))
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The message to post to the parent frame.
    pub fn message(&self) -> HostMessage {
        HostMessage::TokenRequest {
            request_id: self.request_id.clone(),
        }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.issued_at + self.timeout
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline()
    }

    /// Accept the host's answer.
    ///
    /// Returns `Ok(None)` for messages that are not token responses so the
    /// caller can keep listening.
    pub fn accept(&self, message: &HostMessage, now: DateTime<Utc>) -> BridgeResult<Option<String>> {
        let HostMessage::TokenResponse { request_id, token } = message else {
            return Ok(None);
        };

        if self.is_expired(now) {
            return Err(BridgeError::Timeout {
                request_id: self.request_id.clone(),
                timeout_ms: self.timeout.num_milliseconds(),
            });
        }

        if request_id != &self.request_id {
            return Err(BridgeError::RequestMismatch {
                expected: self.request_id.clone(),
                got: request_id.clone(),
            });
        }

        Ok(Some(token.clone()))
    }
}
