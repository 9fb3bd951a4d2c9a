//! Realtime reconciliation.
//!
//! Change notifications arrive per backing table, in delivery order, with no
//! correlation to local writes. The reconciler folds them into one cache of
//! joined rows:
//!
//! ```text
//! notification ──► identity mapping ──► pending? ──yes──► Suppressed
//!                                          │
//!                                          no
//!                                          ▼
//!                    INSERT/UPDATE ──► cached? ──yes──► Merged
//!                                          │
//!                                          no ──► FetchRow(id)
//!                    DELETE ──► cached? ──► Removed | Ignored
//! ```

mod cache;
mod notification;
mod pending;
mod reconciler;

pub use cache::*;
pub use notification::*;
pub use pending::*;
pub use reconciler::*;

use thiserror::Error;

/// Reconciliation errors.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Invalid notification payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Model error: {0}")]
    Model(#[from] crate::models::ModelError),
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
