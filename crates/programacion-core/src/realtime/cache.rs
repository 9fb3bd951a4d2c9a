//! Ordered cache of joined rows.

use serde_json::{Map, Value};

use crate::models::{Field, ModelResult, ServiceRecord};

/// Joined rows, newest first, unique by identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowCache {
    rows: Vec<ServiceRecord>,
}

impl RowCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection, dropping duplicate identities.
    pub fn replace_all(&mut self, rows: Vec<ServiceRecord>) {
        self.rows.clear();
        for row in rows {
            if !self.contains(&row.id) {
                self.rows.push(row);
            }
        }
    }

    pub fn rows(&self) -> &[ServiceRecord] {
        &self.rows
    }

    pub fn get(&self, id: &str) -> Option<&ServiceRecord> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Merge a partial image into a cached row.
    ///
    /// Returns the changed fields, or `None` when the row is not cached.
    pub fn merge(&mut self, id: &str, patch: &Map<String, Value>) -> ModelResult<Option<Vec<Field>>> {
        match self.rows.iter_mut().find(|r| r.id == id) {
            Some(row) => row.merge(patch).map(Some),
            None => Ok(None),
        }
    }

    /// Set one field on a cached row. Returns false when the row is not cached.
    pub fn set_field(&mut self, id: &str, field: Field, value: Value) -> ModelResult<bool> {
        match self.rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.set(field, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<ServiceRecord> {
        let index = self.rows.iter().position(|r| r.id == id)?;
        Some(self.rows.remove(index))
    }

    /// Add a row at the top. A row already present is left untouched.
    pub fn insert_front(&mut self, row: ServiceRecord) -> bool {
        if self.contains(&row.id) {
            return false;
        }
        self.rows.insert(0, row);
        true
    }

    /// Replace a cached row in place, or add it at the top.
    pub fn upsert(&mut self, row: ServiceRecord) {
        match self.rows.iter_mut().find(|r| r.id == row.id) {
            Some(existing) => *existing = row,
            None => self.rows.insert(0, row),
        }
    }
}
