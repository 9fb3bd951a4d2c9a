//! The editing session.
//!
//! Owns the row cache, pending markers, permission state and user notices,
//! and drives the backend. Backend failures on cell writes and row fetches
//! are turned into notices, as are notifications that cannot be applied;
//! only the initial load and row insertion return them as errors.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::backend::{Backend, BackendError};
use crate::columns::CellContext;
use crate::config::Config;
use crate::export::ExportBatch;
use crate::formatters::{FormatError, SmartFormatter};
use crate::models::{Field, ModelError, NewRowDraft, ServiceRecord};
use crate::permissions::{PermissionState, ViewMode};
use crate::realtime::{
    ChangeNotification, Outcome, RealtimeStatus, ReconcileError, Reconciler,
};
use crate::validation::{prepare_insert, ValidationError};

/// Session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Field {field} is not writable in the {view} view")]
    Forbidden { view: ViewMode, field: Field },

    #[error("The {0} view is not visible to this role")]
    ViewForbidden(ViewMode),

    #[error("Rows cannot be created from the {0} view")]
    InsertForbidden(ViewMode),

    #[error("Row not loaded: {0}")]
    UnknownRow(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub const NOTICE_LOAD_FAILED: &str = "Error al cargar datos";
pub const NOTICE_SAVE_FAILED: &str = "Error al guardar";
pub const NOTICE_INSERT_FAILED: &str = "Error al crear registro";
pub const NOTICE_INSERTED: &str = "Registro creado";
pub const NOTICE_CHANNEL_ERROR: &str = "Error de conexión en tiempo real";
pub const NOTICE_FETCH_FAILED: &str = "Error al actualizar registro";
pub const NOTICE_SYNC_FAILED: &str = "Error al sincronizar cambios";

/// Result of a cell write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Saved,
    /// The write failed; the collection was reloaded from the backend.
    Reverted,
}

pub struct Session<B: Backend, C: Clock = SystemClock> {
    backend: B,
    clock: C,
    config: Config,
    formatter: SmartFormatter,
    reconciler: Reconciler,
    permissions: PermissionState,
    realtime: RealtimeStatus,
    notices: Vec<Notice>,
}

impl<B: Backend> Session<B, SystemClock> {
    pub fn new(backend: B, config: Config) -> Self {
        Self::with_clock(backend, config, SystemClock)
    }
}

impl<B: Backend, C: Clock> Session<B, C> {
    pub fn with_clock(backend: B, config: Config, clock: C) -> Self {
        Self {
            formatter: SmartFormatter::new(config.formatter_config()),
            reconciler: Reconciler::new(config.pending_window()),
            backend,
            clock,
            config,
            permissions: PermissionState::loading(),
            realtime: RealtimeStatus::Connecting,
            notices: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn formatter(&self) -> &SmartFormatter {
        &self.formatter
    }

    pub fn rows(&self) -> &[ServiceRecord] {
        self.reconciler.cache().rows()
    }

    pub fn row(&self, id: &str) -> Option<&ServiceRecord> {
        self.reconciler.cache().get(id)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.reconciler.pending().is_pending(id, self.clock.now())
    }

    pub fn permissions(&self) -> &PermissionState {
        &self.permissions
    }

    /// Replace the permission state, e.g. once the stored matrix arrives.
    pub fn set_permissions(&mut self, state: PermissionState) {
        debug!(status = ?state.status, views = ?state.allowed_views(), "permissions updated");
        self.permissions = state;
    }

    pub fn realtime_status(&self) -> RealtimeStatus {
        self.realtime
    }

    /// Record a channel status change. Entering an error state posts a notice.
    pub fn set_realtime_status(&mut self, status: RealtimeStatus) {
        if status == self.realtime {
            return;
        }
        info!(from = %self.realtime, to = %status, "realtime status changed");
        if status == RealtimeStatus::ChannelError {
            self.notices.push(Notice::error(NOTICE_CHANNEL_ERROR));
        }
        self.realtime = status;
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Initial bulk load.
    pub fn load(&mut self) -> SessionResult<usize> {
        match self.backend.fetch_rows(self.config.fetch_limit) {
            Ok(rows) => {
                self.reconciler.cache_mut().replace_all(rows);
                let count = self.reconciler.cache().len();
                info!(count, limit = self.config.fetch_limit, "rows loaded");
                Ok(count)
            }
            Err(e) => {
                error!(error = %e, "initial load failed");
                self.notices.push(Notice::error(NOTICE_LOAD_FAILED));
                Err(e.into())
            }
        }
    }

    /// Full reload after a failed write. Errors become notices.
    fn reload(&mut self) {
        match self.backend.fetch_rows(self.config.fetch_limit) {
            Ok(rows) => {
                self.reconciler.cache_mut().replace_all(rows);
                debug!(count = self.reconciler.cache().len(), "collection reloaded");
            }
            Err(e) => {
                error!(error = %e, "reload failed");
                self.notices.push(Notice::error(NOTICE_LOAD_FAILED));
            }
        }
    }

    /// Write a canonical value to one field.
    ///
    /// The cache is updated first and the row is marked pending. If the
    /// backend rejects the write the previous value is put back, the marker
    /// is cleared and the whole collection is reloaded; nothing is retried.
    pub fn update_field(
        &mut self,
        view: ViewMode,
        row_id: &str,
        field: Field,
        value: Value,
    ) -> SessionResult<UpdateOutcome> {
        if !self.permissions.can_write_field(view, field) {
            return Err(SessionError::Forbidden { view, field });
        }
        let previous = self
            .row(row_id)
            .ok_or_else(|| SessionError::UnknownRow(row_id.to_string()))?
            .get(field)?;

        self.reconciler
            .cache_mut()
            .set_field(row_id, field, value.clone())?;
        self.reconciler.mark_pending(row_id, self.clock.now());

        match self
            .backend
            .update_field(field.relation(), row_id, field, &value)
        {
            Ok(()) => {
                debug!(id = row_id, field = %field, "field saved");
                Ok(UpdateOutcome::Saved)
            }
            Err(e) => {
                warn!(id = row_id, field = %field, error = %e, "write failed, reloading");
                self.notices.push(Notice::error(NOTICE_SAVE_FAILED));
                self.restore_field(row_id, field, previous);
                self.reconciler.clear_pending(row_id);
                self.reload();
                Ok(UpdateOutcome::Reverted)
            }
        }
    }

    /// Put back a value the backend never accepted. The reload that follows
    /// may still overwrite it with the stored one.
    fn restore_field(&mut self, row_id: &str, field: Field, value: Value) {
        if let Err(e) = self.reconciler.cache_mut().set_field(row_id, field, value) {
            warn!(id = row_id, field = %field, error = %e, "could not restore previous value");
        }
    }

    /// Format raw cell input and write it if it changed.
    ///
    /// `Ok(None)` means nothing was written: the cell is locked or the value
    /// is unchanged.
    pub fn edit_cell(
        &mut self,
        view: ViewMode,
        row_id: &str,
        field: Field,
        raw: &str,
    ) -> SessionResult<Option<UpdateOutcome>> {
        let Some(context) = CellContext::new(&self.permissions, view, field) else {
            return Err(SessionError::Forbidden { view, field });
        };
        let current = self
            .row(row_id)
            .ok_or_else(|| SessionError::UnknownRow(row_id.to_string()))?
            .get(field)?;

        match context.commit(&self.formatter, raw, &current)? {
            Some(value) => self.update_field(view, row_id, field, value).map(Some),
            None => Ok(None),
        }
    }

    /// Create a row from the new-row form.
    ///
    /// Validation errors, including fields the role may not write from
    /// `view`, are returned before any network call. The inserted
    /// row is placed at the top of the cache and marked pending so its own
    /// insert notification is not re-applied.
    pub fn insert_row(
        &mut self,
        view: ViewMode,
        draft: &NewRowDraft,
    ) -> SessionResult<ServiceRecord> {
        if !self.permissions.can_write(view) {
            return Err(SessionError::InsertForbidden(view));
        }

        let prepared = prepare_insert(
            draft,
            self.rows(),
            &self.formatter,
            &self.permissions,
            view,
        )?;

        let record = match self.backend.insert_row(&prepared.values) {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "insert failed");
                self.notices.push(Notice::error(NOTICE_INSERT_FAILED));
                return Err(e.into());
            }
        };

        let id = record.id.clone();
        self.reconciler.cache_mut().insert_front(record);
        self.reconciler.mark_pending(&id, self.clock.now());
        info!(id = %id, "row created");

        let mut extension_saved = true;
        for (field, value) in prepared.extension {
            self.reconciler
                .cache_mut()
                .set_field(&id, field, value.clone())?;
            if let Err(e) = self
                .backend
                .update_field(field.relation(), &id, field, &value)
            {
                warn!(id = %id, field = %field, error = %e, "extension write failed, reloading");
                self.notices.push(Notice::error(NOTICE_SAVE_FAILED));
                self.reconciler.clear_pending(&id);
                self.reload();
                extension_saved = false;
                break;
            }
        }

        if extension_saved {
            self.notices.push(Notice::success(NOTICE_INSERTED));
        }
        self.row(&id)
            .cloned()
            .ok_or(SessionError::UnknownRow(id))
    }

    /// Apply one change notification, fetching the row if needed.
    pub fn handle_notification(&mut self, notification: &ChangeNotification) -> Outcome {
        let outcome = self.apply_notification(notification);
        if let Outcome::FetchRow(id) = &outcome {
            self.fetch_single(id);
        }
        outcome
    }

    /// Apply a batch in delivery order. Rows that need fetching are fetched
    /// once each, after the whole batch. A notification that cannot be
    /// applied is reported as `Ignored` and does not stop the rest.
    pub fn handle_notifications<'a, I>(&mut self, batch: I) -> Vec<Outcome>
    where
        I: IntoIterator<Item = &'a ChangeNotification>,
    {
        let mut outcomes = Vec::new();
        let mut to_fetch: Vec<String> = Vec::new();

        for notification in batch {
            let outcome = self.apply_notification(notification);
            if let Outcome::FetchRow(id) = &outcome {
                if !to_fetch.contains(id) {
                    to_fetch.push(id.clone());
                }
            }
            outcomes.push(outcome);
        }

        if to_fetch.len() > 1 {
            debug!(rows = to_fetch.len(), "coalesced row fetches");
        }
        for id in &to_fetch {
            self.fetch_single(id);
        }
        outcomes
    }

    fn apply_notification(&mut self, notification: &ChangeNotification) -> Outcome {
        match self.reconciler.apply(notification, self.clock.now()) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    table = %notification.table,
                    event = ?notification.event,
                    error = %e,
                    "notification dropped"
                );
                self.notices.push(Notice::error(NOTICE_SYNC_FAILED));
                Outcome::Ignored
            }
        }
    }

    fn fetch_single(&mut self, id: &str) {
        match self.backend.fetch_row(id) {
            Ok(Some(record)) => {
                self.reconciler.cache_mut().upsert(record);
                debug!(id, "row fetched");
            }
            Ok(None) => debug!(id, "row vanished before fetch"),
            Err(e) => {
                warn!(id, error = %e, "row fetch failed");
                self.notices.push(Notice::error(NOTICE_FETCH_FAILED));
            }
        }
    }

    /// Current rows projected for export from `view`.
    pub fn export_batch(&self, view: ViewMode) -> SessionResult<ExportBatch> {
        if !self.permissions.can_view(view) {
            return Err(SessionError::ViewForbidden(view));
        }
        Ok(ExportBatch::for_view(view, self.rows(), self.clock.today()))
    }
}
