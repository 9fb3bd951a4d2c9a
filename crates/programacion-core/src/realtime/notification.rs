//! Change notifications from the hosted backend.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ReconcileResult;
use crate::models::{Field, Relation, JOINED_VIEW, REFERENCE_COLUMN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeEvent {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeEvent::Insert => "INSERT",
            ChangeEvent::Update => "UPDATE",
            ChangeEvent::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// Where a notification's table sits relative to the joined view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    Relation(Relation),
    /// The joined view itself.
    Joined,
}

/// One row-level change, as delivered by the subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub table: String,
    #[serde(rename = "eventType")]
    pub event: ChangeEvent,
    /// New row image; empty for deletes.
    #[serde(default, deserialize_with = "image")]
    pub new: Map<String, Value>,
    /// Old row image; may carry only the primary key.
    #[serde(default, deserialize_with = "image")]
    pub old: Map<String, Value>,
    #[serde(default)]
    pub commit_timestamp: Option<String>,
}

/// Images are `{}` or `null` when absent.
fn image<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ChangeNotification {
    pub fn new(table: impl Into<String>, event: ChangeEvent) -> Self {
        Self {
            table: table.into(),
            event,
            new: Map::new(),
            old: Map::new(),
            commit_timestamp: None,
        }
    }

    pub fn with_new(mut self, image: Map<String, Value>) -> Self {
        self.new = image;
        self
    }

    pub fn with_old(mut self, image: Map<String, Value>) -> Self {
        self.old = image;
        self
    }

    pub fn from_json(raw: &str) -> ReconcileResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_value(value: Value) -> ReconcileResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// `None` for tables outside the service record.
    pub fn source(&self) -> Option<ChangeSource> {
        if self.table == JOINED_VIEW {
            return Some(ChangeSource::Joined);
        }
        Relation::from_table(&self.table)
            .ok()
            .map(ChangeSource::Relation)
    }

    /// Identity of the joined row this change belongs to.
    ///
    /// The reference column wins over the table's own primary key. The new
    /// image is consulted first, then the old one.
    pub fn row_id(&self) -> Option<String> {
        [&self.new, &self.old].into_iter().find_map(|image| {
            [REFERENCE_COLUMN, "id"]
                .into_iter()
                .find_map(|key| image.get(key).and_then(identity_text))
        })
    }

    /// Fields of the new image that belong to the joined row.
    ///
    /// Extension tables only contribute their own columns, so their
    /// timestamps never overwrite the lab-origin ones.
    pub fn patch(&self) -> Map<String, Value> {
        let owner = match self.source() {
            Some(ChangeSource::Relation(Relation::Lab)) | Some(ChangeSource::Joined) => None,
            Some(ChangeSource::Relation(relation)) => Some(relation),
            None => return Map::new(),
        };

        self.new
            .iter()
            .filter(|(key, _)| match (owner, key.parse::<Field>()) {
                (_, Err(_)) => false,
                (None, Ok(_)) => true,
                (Some(relation), Ok(field)) => field.relation() == relation,
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

fn identity_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_hosted_payload() {
        let raw = r#"{
            "schema": "public",
            "table": "programacion_lab",
            "commit_timestamp": "2026-03-12T10:00:00Z",
            "eventType": "UPDATE",
            "new": {"id": "r1", "ot": "123-26"},
            "old": {"id": "r1"},
            "errors": null
        }"#;
        let n = ChangeNotification::from_json(raw).unwrap();
        assert_eq!(n.event, ChangeEvent::Update);
        assert_eq!(n.source(), Some(ChangeSource::Relation(Relation::Lab)));
        assert_eq!(n.row_id().as_deref(), Some("r1"));
    }

    #[test]
    fn test_reference_column_wins() {
        let n = ChangeNotification::from_value(json!({
            "table": "programacion_comercial",
            "eventType": "INSERT",
            "new": {"id": 77, "programacion_id": "r9", "fecha_solicitud_com": "2026-03-01"},
            "old": null
        }))
        .unwrap();
        assert_eq!(n.row_id().as_deref(), Some("r9"));
    }

    #[test]
    fn test_delete_uses_old_image() {
        let n = ChangeNotification::new("programacion_lab", ChangeEvent::Delete)
            .with_old(json!({"id": 42}).as_object().cloned().unwrap());
        assert_eq!(n.row_id().as_deref(), Some("42"));
    }

    #[test]
    fn test_extension_patch_keeps_only_own_columns() {
        let n = ChangeNotification::from_value(json!({
            "table": "programacion_administracion",
            "eventType": "UPDATE",
            "new": {
                "id": 5,
                "programacion_id": "r1",
                "numero_factura": "F001-0007",
                "updated_at": "2026-03-12T10:00:00Z",
                "internal_flag": true
            }
        }))
        .unwrap();
        let patch = n.patch();
        assert_eq!(patch.len(), 1);
        assert_eq!(patch["numero_factura"], json!("F001-0007"));
    }

    #[test]
    fn test_unknown_table() {
        let n = ChangeNotification::new("perfiles", ChangeEvent::Update);
        assert_eq!(n.source(), None);
        assert!(n.patch().is_empty());
        assert_eq!(n.row_id(), None);
    }
}
