//! End-to-end session tests against the local SQLite store.
//!
//! Change notifications come from the store's change log, so every local
//! write produces the same echo the hosted subscription would deliver.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use programacion_core::backend::{Backend, BackendError, BackendResult, UserPermissions};
use programacion_core::db::Database;
use programacion_core::models::{Field, NewRowDraft, Relation, ServiceRecord};
use programacion_core::permissions::{
    resolve_permissions, AreaGrant, IdentityLoader, PermissionMatrix, UrlOverrides, ViewMode,
    AREA_COMMERCIAL,
};
use programacion_core::realtime::{ChangeEvent, ChangeNotification, Outcome};
use programacion_core::session::{
    Clock, Notice, Session, SessionError, UpdateOutcome, NOTICE_FETCH_FAILED, NOTICE_INSERTED,
    NOTICE_LOAD_FAILED, NOTICE_SAVE_FAILED, NOTICE_SYNC_FAILED,
};
use programacion_core::validation::{
    DUPLICATE_SAMPLE_MESSAGE, FORBIDDEN_FIELD_MESSAGE, REQUIRED_MESSAGE,
};
use programacion_core::{Config, FrameParams};
use serde_json::{json, Map, Value};

/// Clock the test can move by hand.
#[derive(Clone)]
struct TestClock(Rc<Cell<DateTime<Utc>>>);

impl TestClock {
    fn new() -> Self {
        let start = DateTime::parse_from_rfc3339("2026-03-12T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Self(Rc::new(Cell::new(start)))
    }

    fn advance_ms(&self, ms: i64) {
        self.0.set(self.0.get() + Duration::milliseconds(ms));
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.get()
    }
}

/// Database wrapper that can refuse writes and loads, and counts row fetches.
struct FlakyBackend {
    db: Database,
    fail_writes: Cell<bool>,
    fail_loads: Cell<bool>,
    fail_fetches: Cell<bool>,
    row_fetches: Cell<usize>,
}

impl FlakyBackend {
    fn new() -> Self {
        Self {
            db: Database::open_in_memory().unwrap(),
            fail_writes: Cell::new(false),
            fail_loads: Cell::new(false),
            fail_fetches: Cell::new(false),
            row_fetches: Cell::new(0),
        }
    }

    fn refused() -> BackendError {
        BackendError::Status {
            status: 503,
            body: "unavailable".into(),
        }
    }
}

impl Backend for FlakyBackend {
    fn fetch_rows(&self, limit: usize) -> BackendResult<Vec<ServiceRecord>> {
        if self.fail_loads.get() {
            return Err(Self::refused());
        }
        self.db.fetch_rows(limit)
    }

    fn fetch_row(&self, id: &str) -> BackendResult<Option<ServiceRecord>> {
        self.row_fetches.set(self.row_fetches.get() + 1);
        if self.fail_fetches.get() {
            return Err(Self::refused());
        }
        self.db.fetch_row(id)
    }

    fn update_field(
        &self,
        relation: Relation,
        id: &str,
        field: Field,
        value: &Value,
    ) -> BackendResult<()> {
        if self.fail_writes.get() {
            return Err(Self::refused());
        }
        self.db.update_field(relation, id, field, value)
    }

    fn insert_row(&self, values: &Map<String, Value>) -> BackendResult<ServiceRecord> {
        self.db.insert_row(values)
    }

    fn fetch_permissions(&self, user_id: &str) -> BackendResult<Option<UserPermissions>> {
        self.db.fetch_permissions(user_id)
    }
}

fn session_with<B: Backend>(backend: B, role: &str) -> (Session<B, TestClock>, TestClock) {
    let clock = TestClock::new();
    let mut session = Session::with_clock(backend, Config::default(), clock.clone());
    session.set_permissions(resolve_permissions(
        Some(role),
        UrlOverrides::default(),
        ViewMode::Lab,
        None,
    ));
    (session, clock)
}

fn session(role: &str) -> (Session<Database, TestClock>, TestClock) {
    session_with(Database::open_in_memory().unwrap(), role)
}

fn draft(recep: &str, ot: &str) -> NewRowDraft {
    NewRowDraft::new()
        .with(Field::ReceptionNumber, recep)
        .with(Field::WorkOrder, ot)
}

/// Deliver every logged change to the session.
fn deliver(session: &mut Session<Database, TestClock>) -> Vec<Outcome> {
    let changes = session.backend().drain_changes().unwrap();
    session.handle_notifications(&changes)
}

fn deliver_flaky(session: &mut Session<FlakyBackend, TestClock>) -> Vec<Outcome> {
    let changes = session.backend().db.drain_changes().unwrap();
    session.handle_notifications(&changes)
}

#[test]
fn test_work_order_edits_complete_year_suffix() {
    let (mut s, _clock) = session("admin");
    let row = s.insert_row(ViewMode::Lab, &draft("10", "1")).unwrap();
    deliver(&mut s);

    let outcome = s.edit_cell(ViewMode::Lab, &row.id, Field::WorkOrder, "123").unwrap();
    assert_eq!(outcome, Some(UpdateOutcome::Saved));
    assert_eq!(s.row(&row.id).unwrap().ot.as_deref(), Some("123-26"));

    let echoes = deliver(&mut s);
    assert!(!echoes.is_empty());
    assert!(echoes
        .iter()
        .all(|o| matches!(o, Outcome::Suppressed { id } if *id == row.id)));

    s.edit_cell(ViewMode::Lab, &row.id, Field::WorkOrder, "456").unwrap();
    deliver(&mut s);
    assert_eq!(s.row(&row.id).unwrap().ot.as_deref(), Some("456-26"));

    let stored = s.backend().get_record(&row.id).unwrap().unwrap();
    assert_eq!(stored.ot.as_deref(), Some("456-26"));
}

#[test]
fn test_unchanged_value_is_not_written() {
    let (mut s, _clock) = session("admin");
    let row = s.insert_row(ViewMode::Lab, &draft("10", "123")).unwrap();
    deliver(&mut s);

    assert_eq!(
        s.edit_cell(ViewMode::Lab, &row.id, Field::WorkOrder, "123-26").unwrap(),
        None
    );
    assert!(s.backend().drain_changes().unwrap().is_empty());
}

#[test]
fn test_delete_of_unknown_row_is_noop() {
    let (mut s, _clock) = session("admin");
    s.insert_row(ViewMode::Lab, &draft("10", "1")).unwrap();
    deliver(&mut s);
    let before = s.rows().to_vec();

    let mut old = Map::new();
    old.insert("id".into(), json!("no-such-row"));
    let ghost = ChangeNotification::new("programacion_lab", ChangeEvent::Delete).with_old(old);

    assert_eq!(s.handle_notification(&ghost), Outcome::Ignored);
    assert_eq!(s.rows(), before.as_slice());
}

#[test]
fn test_remote_change_applies_after_pending_window() {
    let (mut s, clock) = session("admin");
    let row = s.insert_row(ViewMode::Lab, &draft("10", "1")).unwrap();
    deliver(&mut s);
    assert!(s.is_pending(&row.id));

    // Another client edits while the marker is live: hidden.
    s.backend()
        .write_field(Relation::Lab, &row.id, Field::ClientName, &json!("Otro"))
        .unwrap();
    let outcomes = deliver(&mut s);
    assert!(matches!(outcomes.as_slice(), [Outcome::Suppressed { .. }]));
    assert_eq!(s.row(&row.id).unwrap().cliente_nombre, "");

    clock.advance_ms(Config::default().pending_window_ms + 1);
    assert!(!s.is_pending(&row.id));

    s.backend()
        .write_field(Relation::Lab, &row.id, Field::ClientName, &json!("Minera Sur"))
        .unwrap();
    let outcomes = deliver(&mut s);
    assert!(matches!(outcomes.as_slice(), [Outcome::Merged { .. }]));
    assert_eq!(s.row(&row.id).unwrap().cliente_nombre, "Minera Sur");
}

#[test]
fn test_insert_round_trip_with_extension_fields() {
    let (mut s, _clock) = session("admin");
    let new_row = draft("88", "5")
        .with(Field::ReceivedDate, "1203")
        .with(Field::QuoteRequestDate, "0403")
        .with(Field::QuoteDeliveryDate, "0603");

    let row = s.insert_row(ViewMode::Commercial, &new_row).unwrap();
    assert_eq!(row.recep_numero, "88-26");
    assert_eq!(row.ot.as_deref(), Some("5-26"));
    assert_eq!(row.estado_trabajo, "PENDIENTE");
    assert_eq!(row.item_numero, Some(1));
    assert_eq!(s.rows()[0].id, row.id);

    let stored = s.backend().get_record(&row.id).unwrap().unwrap();
    assert_eq!(stored.fecha_recepcion.as_deref(), Some("2026-03-12"));
    assert_eq!(stored.fecha_solicitud_com.as_deref(), Some("2026-03-04"));
    assert_eq!(stored.fecha_entrega_com.as_deref(), Some("2026-03-06"));

    let notices = s.take_notices();
    assert_eq!(notices.last(), Some(&Notice::success(NOTICE_INSERTED)));

    // Echoes of the insert and the extension writes are all ours.
    let outcomes = deliver(&mut s);
    assert!(outcomes.len() >= 2);
    assert!(outcomes.iter().all(|o| matches!(o, Outcome::Suppressed { .. })));
    assert_eq!(s.rows().len(), 1);
}

#[test]
fn test_insert_validation() {
    let (mut s, _clock) = session("admin");
    s.insert_row(ViewMode::Lab, &draft("1", "1").with(Field::SampleCode, "M-1"))
        .unwrap();

    let err = s
        .insert_row(
            ViewMode::Lab,
            &NewRowDraft::new()
                .with(Field::WorkOrder, "2")
                .with(Field::SampleCode, " m-1 "),
        )
        .unwrap_err();
    let errors = match err {
        SessionError::Validation(errors) => errors,
        other => panic!("expected validation error, got {other:?}"),
    };
    assert_eq!(errors.message(Field::ReceptionNumber), Some(REQUIRED_MESSAGE));
    assert_eq!(errors.message(Field::SampleCode), Some(DUPLICATE_SAMPLE_MESSAGE));
    assert_eq!(s.rows().len(), 1);
}

#[test]
fn test_failed_write_reverts_from_backend() {
    let (mut s, _clock) = session_with(FlakyBackend::new(), "admin");
    let row = s.insert_row(ViewMode::Lab, &draft("10", "1")).unwrap();
    deliver_flaky(&mut s);
    s.take_notices();

    s.backend().fail_writes.set(true);
    let outcome = s.edit_cell(ViewMode::Lab, &row.id, Field::WorkOrder, "999").unwrap();

    assert_eq!(outcome, Some(UpdateOutcome::Reverted));
    assert_eq!(s.row(&row.id).unwrap().ot.as_deref(), Some("1-26"));
    assert!(!s.is_pending(&row.id));
    assert_eq!(s.take_notices(), vec![Notice::error(NOTICE_SAVE_FAILED)]);
}

#[test]
fn test_forbidden_edit_touches_nothing() {
    let (mut s, _clock) = session("laboratorio_tipificador");
    let row = s.insert_row(ViewMode::Lab, &draft("10", "1")).unwrap();
    deliver(&mut s);

    // A locked cell swallows input; a direct write is refused.
    assert_eq!(
        s.edit_cell(ViewMode::Lab, &row.id, Field::LabQuotation, "45").unwrap(),
        None
    );
    let err = s
        .update_field(ViewMode::Lab, &row.id, Field::LabQuotation, json!("COTIZ.N-45-26"))
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Forbidden {
            field: Field::LabQuotation,
            ..
        }
    ));
    assert_eq!(s.row(&row.id).unwrap().cotizacion_lab, None);
    assert!(s.backend().drain_changes().unwrap().is_empty());
}

#[test]
fn test_external_insert_is_fetched_once() {
    let (mut s, _clock) = session_with(FlakyBackend::new(), "admin");
    s.load().unwrap();

    // Another client creates a row and fills its commercial columns.
    let mut values = Map::new();
    values.insert("recep_numero".into(), json!("500-26"));
    let remote = s.backend().db.insert_record(&values).unwrap();
    s.backend()
        .db
        .write_field(
            Relation::Commercial,
            &remote.id,
            Field::QuoteRequestDate,
            &json!("2026-03-01"),
        )
        .unwrap();

    let outcomes = deliver_flaky(&mut s);
    assert_eq!(
        outcomes,
        vec![
            Outcome::FetchRow(remote.id.clone()),
            Outcome::FetchRow(remote.id.clone())
        ]
    );
    assert_eq!(s.backend().row_fetches.get(), 1);

    let cached = s.row(&remote.id).unwrap();
    assert_eq!(cached.recep_numero, "500-26");
    assert_eq!(cached.fecha_solicitud_com.as_deref(), Some("2026-03-01"));
}

#[test]
fn test_failed_fetch_posts_notice() {
    let (mut s, _clock) = session_with(FlakyBackend::new(), "admin");
    s.load().unwrap();
    s.backend().fail_fetches.set(true);

    let mut values = Map::new();
    values.insert("recep_numero".into(), json!("501-26"));
    s.backend().db.insert_record(&values).unwrap();

    deliver_flaky(&mut s);
    assert!(s.rows().is_empty());
    assert_eq!(s.take_notices(), vec![Notice::error(NOTICE_FETCH_FAILED)]);
}

#[test]
fn test_remote_delete_removes_row() {
    let (mut s, clock) = session("admin");
    let row = s
        .insert_row(
            ViewMode::Commercial,
            &draft("10", "1").with(Field::QuoteRequestDate, "0103"),
        )
        .unwrap();
    deliver(&mut s);
    clock.advance_ms(Config::default().pending_window_ms + 1);

    assert!(s.backend().delete_record(&row.id).unwrap());
    let outcomes = deliver(&mut s);

    assert!(outcomes.contains(&Outcome::Removed { id: row.id.clone() }));
    assert!(s.row(&row.id).is_none());
}

#[test]
fn test_identity_loaded_from_profile() {
    let db = Database::open_in_memory().unwrap();
    let matrix = PermissionMatrix::new().with_area(
        AREA_COMMERCIAL,
        AreaGrant {
            read: true,
            write: false,
            delete: false,
        },
    );
    db.upsert_role("vendor", &matrix).unwrap();
    db.upsert_profile("u-7", "vendor").unwrap();

    // The stored role replaces the one in the URL.
    let params = FrameParams::from_query("userId=u-7&role=practicante&mode=admin").unwrap();
    let loader = IdentityLoader::new(&params);
    let state = loader.resolve_with(&db);

    assert_eq!(state.role.as_deref(), Some("vendor"));
    assert_eq!(state.allowed_views(), vec![ViewMode::Commercial]);
}

#[test]
fn test_export_projects_view_columns() {
    let (mut s, _clock) = session("admin");
    s.insert_row(
        ViewMode::Commercial,
        &draft("10", "1")
            .with(Field::QuoteRequestDate, "0103")
            .with(Field::QuoteDeliveryDate, "0503"),
    )
    .unwrap();

    let batch = s.export_batch(ViewMode::Commercial).unwrap();
    assert_eq!(batch.len(), 1);
    let item = &batch.items[0];
    assert_eq!(item["recep_numero"], json!("10-26"));
    assert_eq!(item["dias_atraso_envio_coti"], json!(4));
    assert!(!item.contains_key("ot"));

    let csv = batch.to_csv();
    assert!(csv.starts_with("ITEM,RECEP. N,"));
}

#[test]
fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("programacion.db");

    let id = {
        let (mut s, _clock) = session_with(Database::open(&path).unwrap(), "admin");
        s.insert_row(ViewMode::Lab, &draft("10", "1")).unwrap().id
    };

    let (mut s, _clock) = session_with(Database::open(&path).unwrap(), "lector");
    assert_eq!(s.load().unwrap(), 1);
    assert_eq!(s.row(&id).unwrap().recep_numero, "10-26");
}

#[test]
fn test_insert_rejects_fields_the_role_cannot_write() {
    let (mut s, _clock) = session("laboratorio_tipificador");
    let new_row = draft("10", "1")
        .with(Field::LabQuotation, "45")
        .with(Field::LabAuthorization, "APROBADO");

    let errors = match s.insert_row(ViewMode::Lab, &new_row).unwrap_err() {
        SessionError::Validation(errors) => errors,
        other => panic!("expected validation error, got {other:?}"),
    };
    assert_eq!(errors.message(Field::LabQuotation), Some(FORBIDDEN_FIELD_MESSAGE));
    assert_eq!(errors.message(Field::LabAuthorization), Some(FORBIDDEN_FIELD_MESSAGE));
    assert_eq!(errors.fields().count(), 2);
    assert!(s.rows().is_empty());
    assert!(s.backend().drain_changes().unwrap().is_empty());

    // Without the restricted fields the same role can create the row.
    s.insert_row(ViewMode::Lab, &draft("10", "1")).unwrap();
    assert_eq!(s.rows().len(), 1);
}

#[test]
fn test_vendor_insert_cannot_set_payment_status() {
    let (mut s, _clock) = session("vendor");
    let new_row = draft("10", "1").with(Field::PaymentStatus, "PAGADO");

    let errors = match s.insert_row(ViewMode::Commercial, &new_row).unwrap_err() {
        SessionError::Validation(errors) => errors,
        other => panic!("expected validation error, got {other:?}"),
    };
    assert_eq!(errors.fields().collect::<Vec<_>>(), vec![Field::PaymentStatus]);
    assert!(s.rows().is_empty());
    assert!(s.backend().drain_changes().unwrap().is_empty());
}

#[test]
fn test_bad_notification_does_not_stop_batch() {
    let (mut s, clock) = session_with(FlakyBackend::new(), "admin");
    let row = s.insert_row(ViewMode::Lab, &draft("10", "1")).unwrap();
    deliver_flaky(&mut s);
    clock.advance_ms(Config::default().pending_window_ms + 1);
    s.take_notices();

    let mut image = Map::new();
    image.insert("id".into(), json!(row.id));
    image.insert("dias_atraso_lab".into(), json!(1.5));
    let unreadable = ChangeNotification::new("cuadro_control", ChangeEvent::Update).with_new(image);

    let mut values = Map::new();
    values.insert("recep_numero".into(), json!("600-26"));
    let remote = s.backend().db.insert_record(&values).unwrap();

    let mut batch = vec![unreadable];
    batch.extend(s.backend().db.drain_changes().unwrap());
    let outcomes = s.handle_notifications(&batch);

    assert_eq!(outcomes[0], Outcome::Ignored);
    assert!(outcomes.contains(&Outcome::FetchRow(remote.id.clone())));
    assert_eq!(s.row(&remote.id).unwrap().recep_numero, "600-26");
    assert_eq!(s.take_notices(), vec![Notice::error(NOTICE_SYNC_FAILED)]);
}

#[test]
fn test_export_needs_view_access() {
    let (mut s, _clock) = session("laboratorio_lector");
    s.load().unwrap();

    let err = s.export_batch(ViewMode::Admin).unwrap_err();
    assert!(matches!(err, SessionError::ViewForbidden(ViewMode::Admin)));
    assert!(s.export_batch(ViewMode::Lab).unwrap().is_empty());
}

#[test]
fn test_failed_write_and_reload_restore_previous_value() {
    let (mut s, _clock) = session_with(FlakyBackend::new(), "admin");
    let row = s.insert_row(ViewMode::Lab, &draft("10", "1")).unwrap();
    deliver_flaky(&mut s);
    s.take_notices();

    s.backend().fail_writes.set(true);
    s.backend().fail_loads.set(true);
    let outcome = s.edit_cell(ViewMode::Lab, &row.id, Field::WorkOrder, "999").unwrap();

    assert_eq!(outcome, Some(UpdateOutcome::Reverted));
    assert_eq!(s.row(&row.id).unwrap().ot.as_deref(), Some("1-26"));
    assert!(!s.is_pending(&row.id));
    assert_eq!(
        s.take_notices(),
        vec![Notice::error(NOTICE_SAVE_FAILED), Notice::error(NOTICE_LOAD_FAILED)]
    );
}

#[test]
fn test_failed_extension_write_skips_created_notice() {
    let (mut s, _clock) = session_with(FlakyBackend::new(), "admin");
    s.backend().fail_writes.set(true);

    let row = s
        .insert_row(
            ViewMode::Commercial,
            &draft("10", "1").with(Field::QuoteRequestDate, "0103"),
        )
        .unwrap();

    assert_eq!(row.recep_numero, "10-26");
    assert_eq!(row.fecha_solicitud_com, None);
    assert_eq!(s.take_notices(), vec![Notice::error(NOTICE_SAVE_FAILED)]);
}
