//! Local SQLite store.
//!
//! Implements [`Backend`](crate::backend::Backend) so the editor can run
//! offline and so sessions can be tested end to end.

mod changes;
mod profiles;
mod records;
mod schema;

pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::backend::{Backend, BackendResult, UserPermissions};
use crate::models::{Field, Relation, ServiceRecord};
use serde_json::{Map, Value};

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model error: {0}")]
    Model(#[from] crate::models::ModelError),

    #[error("Notification error: {0}")]
    Notification(#[from] crate::realtime::ReconcileError),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Field {field} is not stored in {table}")]
    WrongRelation { field: Field, table: &'static str },
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Raw connection, for writes made outside this client.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl Backend for Database {
    fn fetch_rows(&self, limit: usize) -> BackendResult<Vec<ServiceRecord>> {
        Ok(self.list_records(limit)?)
    }

    fn fetch_row(&self, id: &str) -> BackendResult<Option<ServiceRecord>> {
        Ok(self.get_record(id)?)
    }

    fn update_field(
        &self,
        relation: Relation,
        id: &str,
        field: Field,
        value: &Value,
    ) -> BackendResult<()> {
        Ok(self.write_field(relation, id, field, value)?)
    }

    fn insert_row(&self, values: &Map<String, Value>) -> BackendResult<ServiceRecord> {
        Ok(self.insert_record(values)?)
    }

    fn fetch_permissions(&self, user_id: &str) -> BackendResult<Option<UserPermissions>> {
        Ok(self.get_profile(user_id)?)
    }
}
