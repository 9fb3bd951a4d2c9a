//! New-row form contents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Field;

/// Partial row typed into the new-row form, keyed by field.
///
/// Values are kept as raw text until the row is submitted and formatted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRowDraft {
    values: BTreeMap<Field, String>,
}

impl NewRowDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    /// Raw value, `None` when absent or blank.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values
            .get(&field)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(|v| v.trim().is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.values.iter().map(|(f, v)| (*f, v.as_str()))
    }
}
