//! Backend adapters.
//!
//! The session talks to storage only through [`Backend`]. Two adapters ship
//! with the crate: [`PostgrestBackend`] for the hosted project and
//! `db::Database` for local use and tests.

mod postgrest;

pub use postgrest::*;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{Field, Relation, ServiceRecord};
use crate::permissions::PermissionMatrix;

/// Backend errors.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Database error: {0}")]
    Db(#[from] crate::db::DbError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model error: {0}")]
    Model(#[from] crate::models::ModelError),

    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Role and permission matrix stored on a user profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPermissions {
    pub role: Option<String>,
    #[serde(default)]
    pub permissions: PermissionMatrix,
}

/// Storage operations needed by the editor.
pub trait Backend {
    /// Joined rows, newest first.
    fn fetch_rows(&self, limit: usize) -> BackendResult<Vec<ServiceRecord>>;

    /// One joined row; `None` if it no longer exists.
    fn fetch_row(&self, id: &str) -> BackendResult<Option<ServiceRecord>>;

    /// Write one field on the relation that owns it.
    ///
    /// `id` is always the joined identity; extension relations are addressed
    /// through their reference column.
    fn update_field(
        &self,
        relation: Relation,
        id: &str,
        field: Field,
        value: &Value,
    ) -> BackendResult<()>;

    /// Create a lab-origin row and return the joined projection.
    fn insert_row(&self, values: &Map<String, Value>) -> BackendResult<ServiceRecord>;

    /// Profile role and matrix; `None` when the user has no profile.
    fn fetch_permissions(&self, user_id: &str) -> BackendResult<Option<UserPermissions>>;
}

impl<B: Backend + ?Sized> Backend for &B {
    fn fetch_rows(&self, limit: usize) -> BackendResult<Vec<ServiceRecord>> {
        (**self).fetch_rows(limit)
    }

    fn fetch_row(&self, id: &str) -> BackendResult<Option<ServiceRecord>> {
        (**self).fetch_row(id)
    }

    fn update_field(
        &self,
        relation: Relation,
        id: &str,
        field: Field,
        value: &Value,
    ) -> BackendResult<()> {
        (**self).update_field(relation, id, field, value)
    }

    fn insert_row(&self, values: &Map<String, Value>) -> BackendResult<ServiceRecord> {
        (**self).insert_row(values)
    }

    fn fetch_permissions(&self, user_id: &str) -> BackendResult<Option<UserPermissions>> {
        (**self).fetch_permissions(user_id)
    }
}
