//! Programación Core Library
//!
//! Role-gated, realtime-synchronized editor core for lab service records.
//!
//! # Architecture
//!
//! ```text
//! Frame URL (userId, role, canWrite, isAdmin, mode)
//!        │
//!        ▼
//! IdentityLoader ──► URL-derived PermissionState (immediate)
//!        │
//!        ▼
//! perfiles / role_definitions ──► PermissionState with stored matrix
//!        │
//!        ▼
//! Session::load ──► RowCache (joined rows, newest first)
//!        │
//!        ├── edit cell ──► SmartFormatter ──► optimistic write ──► mark pending
//!        │                                           │
//!        │                                     backend error
//!        │                                           ▼
//!        │                                  notice + full reload
//!        │
//!        └── change notifications ──► Reconciler
//!                                        │
//!                  ┌─────────────┬───────┴──────┬──────────────┐
//!                  ▼             ▼              ▼              ▼
//!              Suppressed     Merged         Removed       FetchRow
//!            (local echo)  (changed fields)             (single row)
//! ```
//!
//! # Core Principle
//!
//! **Permissions only add up.** A view is visible when any source grants it;
//! the static field exception table then removes individual fields.
//!
//! # Modules
//!
//! - [`models`]: Service record, fields, relations, status enums
//! - [`permissions`]: Permission resolution and view selection
//! - [`columns`]: Per-view column sets and cell context
//! - [`formatters`]: Smart cell formatters
//! - [`validation`]: New-row validation
//! - [`realtime`]: Change notifications and cache reconciliation
//! - [`backend`]: Backend trait and the hosted REST adapter
//! - [`db`]: Local SQLite store
//! - [`session`]: The editing session
//! - [`export`]: Spreadsheet export
//! - [`config`]: Environment configuration

pub mod backend;
pub mod columns;
pub mod config;
pub mod db;
pub mod export;
pub mod formatters;
pub mod models;
pub mod permissions;
pub mod realtime;
pub mod session;
pub mod validation;

// Re-export commonly used types
pub use backend::{Backend, BackendError, PostgrestBackend, UserPermissions};
pub use columns::{CellContext, ColumnSet, ColumnSpec, EditorKind};
pub use config::Config;
pub use db::Database;
pub use export::{ExportBatch, ExportClient};
pub use formatters::{FormatterConfig, SmartFormatter};
pub use models::{Field, NewRowDraft, Relation, ServiceRecord};
pub use permissions::{
    resolve_permissions, select_view_mode, IdentityLoader, PermissionMatrix, PermissionState,
    ViewMode,
};
pub use realtime::{ChangeNotification, Outcome, RealtimeStatus, Reconciler};
pub use session::{Clock, Notice, Session, SessionError, SystemClock, UpdateOutcome};

pub use programacion_bridge::FrameParams;
