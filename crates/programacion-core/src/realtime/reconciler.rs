//! Folds change notifications into the row cache.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{
    ChangeEvent, ChangeNotification, ChangeSource, PendingWrites, ReconcileResult, RowCache,
};
use crate::models::{Field, ModelError, Relation};

/// What applying a notification did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Echo of a local write; nothing applied.
    Suppressed { id: String },
    /// Fields merged into a cached row (possibly none, for a repeated image).
    Merged { id: String, fields: Vec<Field> },
    Removed { id: String },
    /// The row is not cached; its joined projection must be fetched.
    FetchRow(String),
    Ignored,
}

/// Subscription channel status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RealtimeStatus {
    Connecting,
    Subscribed,
    ChannelError,
    TimedOut,
    Closed,
}

impl RealtimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RealtimeStatus::Connecting => "CONNECTING",
            RealtimeStatus::Subscribed => "SUBSCRIBED",
            RealtimeStatus::ChannelError => "CHANNEL_ERROR",
            RealtimeStatus::TimedOut => "TIMED_OUT",
            RealtimeStatus::Closed => "CLOSED",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RealtimeStatus::ChannelError | RealtimeStatus::TimedOut)
    }
}

impl fmt::Display for RealtimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RealtimeStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            RealtimeStatus::Connecting,
            RealtimeStatus::Subscribed,
            RealtimeStatus::ChannelError,
            RealtimeStatus::TimedOut,
            RealtimeStatus::Closed,
        ]
        .into_iter()
        .find(|status| status.as_str() == s)
        .ok_or_else(|| ModelError::UnknownOption(s.to_string()))
    }
}

/// Row cache plus pending-write markers.
#[derive(Debug, Clone)]
pub struct Reconciler {
    cache: RowCache,
    pending: PendingWrites,
}

impl Reconciler {
    pub fn new(pending_window: Duration) -> Self {
        Self {
            cache: RowCache::new(),
            pending: PendingWrites::new(pending_window),
        }
    }

    pub fn cache(&self) -> &RowCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut RowCache {
        &mut self.cache
    }

    pub fn pending(&self) -> &PendingWrites {
        &self.pending
    }

    pub fn mark_pending(&mut self, id: &str, now: DateTime<Utc>) {
        self.pending.mark(id, now);
    }

    pub fn clear_pending(&mut self, id: &str) {
        self.pending.clear(id);
    }

    /// Apply one notification to the cache.
    pub fn apply(
        &mut self,
        notification: &ChangeNotification,
        now: DateTime<Utc>,
    ) -> ReconcileResult<Outcome> {
        self.pending.prune(now);

        let (Some(source), Some(id)) = (notification.source(), notification.row_id()) else {
            debug!(table = %notification.table, event = %notification.event, "unmapped notification ignored");
            return Ok(Outcome::Ignored);
        };

        let outcome = match notification.event {
            ChangeEvent::Delete => self.apply_delete(source, id)?,
            ChangeEvent::Insert | ChangeEvent::Update => {
                if self.pending.is_pending(&id, now) {
                    Outcome::Suppressed { id }
                } else {
                    match self.cache.merge(&id, &notification.patch())? {
                        Some(fields) => Outcome::Merged { id, fields },
                        None => Outcome::FetchRow(id),
                    }
                }
            }
        };

        debug!(
            table = %notification.table,
            event = %notification.event,
            outcome = ?outcome,
            "notification reconciled"
        );
        Ok(outcome)
    }

    /// A deleted lab-origin row removes the joined row. A deleted extension
    /// row only clears that relation's columns.
    fn apply_delete(&mut self, source: ChangeSource, id: String) -> ReconcileResult<Outcome> {
        if !self.cache.contains(&id) {
            return Ok(Outcome::Ignored);
        }

        match source {
            ChangeSource::Joined | ChangeSource::Relation(Relation::Lab) => {
                self.cache.remove(&id);
                self.pending.clear(&id);
                info!(id = %id, "row removed");
                Ok(Outcome::Removed { id })
            }
            ChangeSource::Relation(relation) => {
                let cleared: Map<String, Value> = relation
                    .fields()
                    .map(|f| (f.as_str().to_string(), Value::Null))
                    .collect();
                let fields = self.cache.merge(&id, &cleared)?.unwrap_or_default();
                Ok(Outcome::Merged { id, fields })
            }
        }
    }
}
