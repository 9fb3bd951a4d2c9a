//! Rows projected for export.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::columns::ColumnSet;
use crate::models::ServiceRecord;
use crate::permissions::ViewMode;

/// The rows of one view, reduced to that view's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBatch {
    pub view: ViewMode,
    pub items: Vec<Map<String, Value>>,
}

#[derive(Serialize)]
struct ExportBody<'a> {
    items: &'a [Map<String, Value>],
}

impl ExportBatch {
    pub fn for_view(view: ViewMode, rows: &[ServiceRecord], today: NaiveDate) -> Self {
        let set = ColumnSet::for_view(view);
        Self {
            view,
            items: rows.iter().map(|r| set.project(r, today)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Request body for the export service: `{"items": [...]}`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&ExportBody { items: &self.items })
    }

    /// Export to CSV with the view's column headers.
    pub fn to_csv(&self) -> String {
        let set = ColumnSet::for_view(self.view);
        let mut csv = String::new();

        let headers: Vec<String> = set.columns().iter().map(|c| escape_csv(c.header)).collect();
        csv.push_str(&headers.join(","));
        csv.push('\n');

        for item in &self.items {
            let cells: Vec<String> = set
                .fields()
                .map(|f| escape_csv(&cell_text(item.get(f.as_str()))))
                .collect();
            csv.push_str(&cells.join(","));
            csv.push('\n');
        }

        csv
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
