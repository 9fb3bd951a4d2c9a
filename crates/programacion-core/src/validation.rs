//! New-row validation and insert preparation.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::formatters::SmartFormatter;
use crate::models::{Field, NewRowDraft, Relation, ServiceRecord, WorkStatus};
use crate::permissions::{PermissionState, ViewMode};

pub const REQUIRED_MESSAGE: &str = "Requerido";
pub const DUPLICATE_SAMPLE_MESSAGE: &str = "Código de muestra duplicado";
pub const FORBIDDEN_FIELD_MESSAGE: &str = "Sin permiso para este campo";

const REQUIRED_FIELDS: [Field; 2] = [Field::ReceptionNumber, Field::WorkOrder];

/// Per-field validation failures, reported before any network call.
#[derive(Error, Debug, Clone, PartialEq, Default)]
#[error("Invalid new row: {0}")]
pub struct ValidationError(pub FieldErrors);

/// Field → message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldErrors(pub BTreeMap<Field, String>);

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join(", "))
    }
}

impl ValidationError {
    pub fn message(&self, field: Field) -> Option<&str> {
        self.0 .0.get(&field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0 .0.keys().copied()
    }

    fn push(&mut self, field: Field, message: impl Into<String>) {
        self.0 .0.entry(field).or_insert_with(|| message.into());
    }

    fn is_empty(&self) -> bool {
        self.0 .0.is_empty()
    }
}

/// A validated draft split by destination relation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreparedInsert {
    /// Lab-origin columns; sent as the insert body.
    pub values: Map<String, Value>,
    /// Extension columns, written after the row exists.
    pub extension: Vec<(Field, Value)>,
}

/// Whether `code` matches an existing sample code, ignoring case and
/// surrounding whitespace.
pub fn is_duplicate_sample_code(code: &str, rows: &[ServiceRecord]) -> bool {
    let key = code.trim().to_lowercase();
    !key.is_empty() && rows.iter().any(|r| r.sample_code_key().as_deref() == Some(&key))
}

/// Whether `state` may fill `field` when creating a row from `view`.
///
/// The required fields only answer to the field exception table, since the
/// row cannot exist without them. Every other field needs the same grant as
/// a cell edit.
pub fn can_fill_on_insert(state: &PermissionState, view: ViewMode, field: Field) -> bool {
    if REQUIRED_FIELDS.contains(&field) {
        state.can_write(view) && !state.is_field_denied(view, field)
    } else {
        state.can_write_field(view, field)
    }
}

/// Validate and format a draft for insertion from `view`.
///
/// `estado_trabajo` defaults to `PENDIENTE`; fields the client may never
/// send (`item_numero`, identity, timestamps, computed delays) are dropped.
/// Fields the role may not write are reported, not dropped.
pub fn prepare_insert(
    draft: &NewRowDraft,
    rows: &[ServiceRecord],
    formatter: &SmartFormatter,
    state: &PermissionState,
    view: ViewMode,
) -> Result<PreparedInsert, ValidationError> {
    let mut errors = ValidationError::default();

    for field in REQUIRED_FIELDS {
        if draft.get(field).is_none() {
            errors.push(field, REQUIRED_MESSAGE);
        }
    }

    if let Some(code) = draft.get(Field::SampleCode) {
        if is_duplicate_sample_code(code, rows) {
            errors.push(Field::SampleCode, DUPLICATE_SAMPLE_MESSAGE);
        }
    }

    let mut prepared = PreparedInsert::default();
    for (field, raw) in draft.iter() {
        if !field.is_client_writable() || raw.trim().is_empty() {
            continue;
        }
        if !can_fill_on_insert(state, view, field) {
            errors.push(field, FORBIDDEN_FIELD_MESSAGE);
            continue;
        }
        match formatter.format_field(field, raw) {
            Ok(value) if field.relation() == Relation::Lab => {
                prepared.values.insert(field.as_str().to_string(), value);
            }
            Ok(value) => prepared.extension.push((field, value)),
            Err(e) => errors.push(field, e.to_string()),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    prepared
        .values
        .entry(Field::WorkStatus.as_str().to_string())
        .or_insert_with(|| Value::String(WorkStatus::default().as_str().to_string()));

    Ok(prepared)
}
