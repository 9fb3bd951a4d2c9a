//! Per-view column sets and the typed cell context.
//!
//! Each [`ViewMode`] maps to exactly one [`ColumnSet`], chosen once per view.
//! A column's [`EditorKind`] decides how raw input is canonicalized before it
//! is written.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::formatters::{FormatResult, SmartFormatter};
use crate::models::{Field, ServiceRecord};
use crate::permissions::{PermissionState, ViewMode};

/// How a cell is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorKind {
    Text,
    /// Reception number with year completion.
    Reception,
    SmartDate,
    WorkOrder,
    Quotation,
    Invoice,
    Status,
    Authorization,
    Payment,
    ReadOnly,
    Computed,
}

impl EditorKind {
    pub fn is_editable(&self) -> bool {
        !matches!(self, EditorKind::ReadOnly | EditorKind::Computed)
    }
}

/// One column of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: Field,
    pub header: &'static str,
    pub editor: EditorKind,
    /// Stays visible while scrolling horizontally.
    pub pinned: bool,
    /// Default width in pixels.
    pub width: u16,
}

const fn col(field: Field, header: &'static str, editor: EditorKind, width: u16) -> ColumnSpec {
    ColumnSpec {
        field,
        header,
        editor,
        pinned: false,
        width,
    }
}

const fn pinned(field: Field, header: &'static str, editor: EditorKind, width: u16) -> ColumnSpec {
    ColumnSpec {
        field,
        header,
        editor,
        pinned: true,
        width,
    }
}

use EditorKind::*;

const LAB_COLUMNS: &[ColumnSpec] = &[
    pinned(Field::ItemNumber, "ITEM", ReadOnly, 69),
    pinned(Field::ReceptionNumber, "RECEP", Reception, 78),
    col(Field::WorkOrder, "OT", WorkOrder, 125),
    col(Field::SampleCode, "CODIGO MUESTRA", Text, 140),
    col(Field::ReceivedDate, "FECHA RECEPCION", SmartDate, 115),
    col(Field::StartDate, "FECHA INICIO", SmartDate, 110),
    col(Field::EstimatedDelivery, "FECHA ENTREGA", SmartDate, 110),
    col(Field::ClientName, "CLIENTE", Text, 160),
    col(Field::Project, "PROYECTO", Text, 150),
    col(Field::Description, "DESCRIPCION DEL SERVICIO", Text, 157),
    col(Field::ActualDelivery, "ENTREGA REAL", SmartDate, 130),
    col(Field::WorkStatus, "ESTADO", Status, 180),
    col(Field::LabQuotation, "COTIZACION", Quotation, 150),
    col(Field::LabAuthorization, "AUTORIZACION", Authorization, 130),
    col(Field::AdminNote, "NOTA", Text, 350),
    col(Field::LabDelayDays, "DIAS ATRASO", Computed, 80),
    col(Field::LabDelayReason, "MOTIVO ATRASO", Text, 140),
    col(Field::ReceptionEvidence, "EVID. RECEP.", Text, 70),
    col(Field::ReportsSent, "ENVIO INF.", Text, 70),
];

const COMMERCIAL_COLUMNS: &[ColumnSpec] = &[
    pinned(Field::ItemNumber, "ITEM", ReadOnly, 70),
    pinned(Field::ReceptionNumber, "RECEP. N", ReadOnly, 85),
    col(Field::ReceivedDate, "FECHA RECEPCION", SmartDate, 110),
    col(Field::ClientName, "CLIENTE", Text, 200),
    col(Field::Project, "PROYECTO", Text, 200),
    col(Field::QuoteRequestDate, "FECHA SOLICITUD", SmartDate, 110),
    col(Field::QuoteDeliveryDate, "FECHA ENTREGA", SmartDate, 110),
    col(
        Field::QuoteEvidence,
        "EVIDENCIA SOLICITUD - ENVIO - ACEPTACION COTIZ",
        Text,
        250,
    ),
    col(Field::QuoteDelayDays, "DIAS ATRASO ENVIO COTIZ.", Computed, 110),
    col(Field::QuoteDelayReason, "MOTIVO DIAS ATRASO", Text, 200),
];

const ADMIN_COLUMNS: &[ColumnSpec] = &[
    pinned(Field::ItemNumber, "ITEM", ReadOnly, 69),
    pinned(Field::ReceptionNumber, "RECEP", ReadOnly, 100),
    col(Field::ReceivedDate, "FECHA REC.", ReadOnly, 110),
    col(Field::ClientName, "CLIENTE", Text, 200),
    col(Field::Project, "PROYECTO", Text, 150),
    col(Field::LabQuotation, "COTIZACION", Quotation, 160),
    col(Field::InvoiceNumber, "FACTURACION", Invoice, 160),
    col(Field::PaymentStatus, "ESTADO PAGO", Payment, 130),
    col(Field::LabAuthorization, "AUTORIZADO", Authorization, 180),
    col(Field::AdminNote, "NOTA ADMIN", Text, 250),
];

/// Column set for one view mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSet {
    Lab,
    Commercial,
    Admin,
}

impl ColumnSet {
    pub fn for_view(view: ViewMode) -> Self {
        match view {
            ViewMode::Lab => ColumnSet::Lab,
            ViewMode::Commercial => ColumnSet::Commercial,
            ViewMode::Admin => ColumnSet::Admin,
        }
    }

    pub fn columns(&self) -> &'static [ColumnSpec] {
        match self {
            ColumnSet::Lab => LAB_COLUMNS,
            ColumnSet::Commercial => COMMERCIAL_COLUMNS,
            ColumnSet::Admin => ADMIN_COLUMNS,
        }
    }

    pub fn column(&self, field: Field) -> Option<&'static ColumnSpec> {
        self.columns().iter().find(|c| c.field == field)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> {
        self.columns().iter().map(|c| c.field)
    }

    /// Shown in this view with an editor that accepts input.
    pub fn is_editable(&self, field: Field) -> bool {
        self.column(field).is_some_and(|c| c.editor.is_editable())
    }

    /// The record reduced to this view's columns, computed delays filled in.
    pub fn project(&self, record: &ServiceRecord, today: NaiveDate) -> Map<String, Value> {
        let mut out = Map::new();
        for spec in self.columns() {
            let value = match spec.field {
                Field::LabDelayDays => record.lab_delay_days(today).map(Value::from),
                Field::QuoteDelayDays => record.quote_delay_days().map(Value::from),
                field => record.get(field).ok(),
            };
            out.insert(spec.field.as_str().to_string(), value.unwrap_or(Value::Null));
        }
        out
    }
}

/// Everything a cell needs to decide whether and how it can be edited.
#[derive(Debug, Clone, PartialEq)]
pub struct CellContext {
    pub view: ViewMode,
    pub field: Field,
    pub role: Option<String>,
    pub editor: EditorKind,
    /// Final per-field write permission.
    pub can_write: bool,
}

impl CellContext {
    /// `None` when the field is not a column of the view.
    pub fn new(state: &PermissionState, view: ViewMode, field: Field) -> Option<Self> {
        let spec = ColumnSet::for_view(view).column(field)?;
        Some(Self {
            view,
            field,
            role: state.role.clone(),
            editor: spec.editor,
            can_write: state.can_write_field(view, field),
        })
    }

    /// Canonicalize raw input for writing.
    ///
    /// Returns `Ok(None)` when the cell is locked or the canonical value
    /// equals `current`; a blank input clears the value.
    pub fn commit(
        &self,
        formatter: &SmartFormatter,
        raw: &str,
        current: &Value,
    ) -> FormatResult<Option<Value>> {
        if !self.can_write || !self.editor.is_editable() {
            return Ok(None);
        }

        let value = formatter.format_field(self.field, raw)?;
        if same_value(&value, current) {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    let blank = |v: &Value| v.is_null() || v.as_str().is_some_and(|s| s.is_empty());
    (blank(a) && blank(b)) || a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{resolve_permissions, UrlOverrides};
    use serde_json::json;

    fn state(role: &str) -> PermissionState {
        resolve_permissions(Some(role), UrlOverrides::default(), ViewMode::Lab, None)
    }

    #[test]
    fn test_item_number_never_editable() {
        for view in ViewMode::ALL {
            let set = ColumnSet::for_view(view);
            assert_eq!(set.columns()[0].field, Field::ItemNumber);
            assert!(!set.is_editable(Field::ItemNumber));
        }
    }

    #[test]
    fn test_editable_columns_are_client_writable() {
        for view in ViewMode::ALL {
            for spec in ColumnSet::for_view(view).columns() {
                if spec.editor.is_editable() {
                    assert!(spec.field.is_client_writable(), "{}", spec.field);
                }
            }
        }
    }

    #[test]
    fn test_commit_formats_work_order() {
        let ctx = CellContext::new(&state("admin"), ViewMode::Lab, Field::WorkOrder).unwrap();
        assert_eq!(ctx.editor, EditorKind::WorkOrder);
        let formatter = SmartFormatter::default();
        let value = ctx.commit(&formatter, "123", &Value::Null).unwrap();
        assert_eq!(value, Some(json!("123-26")));
    }

    #[test]
    fn test_commit_unchanged_is_none() {
        let ctx = CellContext::new(&state("admin"), ViewMode::Admin, Field::InvoiceNumber).unwrap();
        let formatter = SmartFormatter::default();
        assert_eq!(ctx.commit(&formatter, "7", &json!("F001-0007")).unwrap(), None);
        assert_eq!(ctx.commit(&formatter, "  ", &Value::Null).unwrap(), None);
        assert_eq!(ctx.commit(&formatter, "", &json!("F001-0007")).unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_locked_cell_reverts() {
        let ctx = CellContext::new(&state("laboratorio_lector"), ViewMode::Lab, Field::ClientName)
            .unwrap();
        assert!(!ctx.can_write);
        let formatter = SmartFormatter::default();
        assert_eq!(ctx.commit(&formatter, "ACME", &json!("")).unwrap(), None);
    }

    #[test]
    fn test_commit_rejects_invalid_date() {
        let ctx = CellContext::new(&state("admin"), ViewMode::Lab, Field::StartDate).unwrap();
        let formatter = SmartFormatter::default();
        assert!(ctx.commit(&formatter, "3102", &Value::Null).is_err());
    }

    #[test]
    fn test_field_outside_view_has_no_context() {
        assert!(CellContext::new(&state("admin"), ViewMode::Commercial, Field::InvoiceNumber).is_none());
    }

    #[test]
    fn test_project_fills_computed_delays() {
        let mut rec = ServiceRecord::default();
        rec.id = "r1".into();
        rec.fecha_solicitud_com = Some("2026-03-01".into());
        rec.fecha_entrega_com = Some("2026-03-04".into());
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();

        let row = ColumnSet::Commercial.project(&rec, today);
        assert_eq!(row.len(), COMMERCIAL_COLUMNS.len());
        assert_eq!(row["dias_atraso_envio_coti"], json!(3));
        assert!(!row.contains_key("numero_factura"));
    }
}
