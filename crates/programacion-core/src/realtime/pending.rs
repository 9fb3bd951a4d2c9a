//! Per-row local-write markers with a fixed expiry window.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Reconciliation state of one cached row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Cached,
    /// Written locally at `since`; echoes are suppressed until the window
    /// elapses.
    PendingLocalWrite { since: DateTime<Utc> },
}

/// Rows recently written by this client.
///
/// One logical write can fan out into several table writes whose
/// notifications arrive in any order, so a marker stays in place for the
/// whole window instead of being consumed by the first echo.
#[derive(Debug, Clone)]
pub struct PendingWrites {
    window: Duration,
    marks: HashMap<String, DateTime<Utc>>,
}

impl PendingWrites {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            marks: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Mark a row as just written. Re-marking restarts the window.
    pub fn mark(&mut self, id: &str, now: DateTime<Utc>) {
        self.marks.insert(id.to_string(), now);
    }

    pub fn clear(&mut self, id: &str) {
        self.marks.remove(id);
    }

    pub fn state(&self, id: &str, now: DateTime<Utc>) -> RowState {
        match self.marks.get(id) {
            Some(&since) if now - since <= self.window => RowState::PendingLocalWrite { since },
            _ => RowState::Cached,
        }
    }

    pub fn is_pending(&self, id: &str, now: DateTime<Utc>) -> bool {
        matches!(self.state(id, now), RowState::PendingLocalWrite { .. })
    }

    /// Drop expired markers and return their row ids.
    pub fn prune(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let window = self.window;
        let expired: Vec<String> = self
            .marks
            .iter()
            .filter(|(_, since)| now - **since > window)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.marks.remove(id);
            debug!(id = %id, "pending marker expired");
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-12T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_pending_within_window() {
        let mut pending = PendingWrites::new(Duration::milliseconds(3000));
        pending.mark("r1", t0());

        assert!(pending.is_pending("r1", t0()));
        assert!(pending.is_pending("r1", t0() + Duration::milliseconds(3000)));
        assert!(!pending.is_pending("r1", t0() + Duration::milliseconds(3001)));
        assert!(!pending.is_pending("r2", t0()));
    }

    #[test]
    fn test_state_transitions() {
        let mut pending = PendingWrites::new(Duration::seconds(3));
        assert_eq!(pending.state("r1", t0()), RowState::Cached);

        pending.mark("r1", t0());
        assert_eq!(
            pending.state("r1", t0() + Duration::seconds(1)),
            RowState::PendingLocalWrite { since: t0() }
        );

        pending.clear("r1");
        assert_eq!(pending.state("r1", t0()), RowState::Cached);
    }

    #[test]
    fn test_remark_restarts_window() {
        let mut pending = PendingWrites::new(Duration::seconds(3));
        pending.mark("r1", t0());
        pending.mark("r1", t0() + Duration::seconds(2));
        assert!(pending.is_pending("r1", t0() + Duration::seconds(4)));
    }

    #[test]
    fn test_prune() {
        let mut pending = PendingWrites::new(Duration::seconds(3));
        pending.mark("old", t0());
        pending.mark("new", t0() + Duration::seconds(2));

        let expired = pending.prune(t0() + Duration::seconds(4));
        assert_eq!(expired, vec!["old".to_string()]);
        assert_eq!(pending.len(), 1);
    }
}
