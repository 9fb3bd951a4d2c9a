//! SQLite schema for the local store.
//!
//! Mirrors the hosted layout: three relations sharing one identity, the
//! `cuadro_control` joined view, and the profile tables that hold each role's
//! permission matrix. Triggers append every row change to `change_log` in the
//! same shape the hosted subscription delivers.

/// Complete database schema.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Service records
-- ============================================================================

CREATE TABLE IF NOT EXISTS programacion_lab (
    id TEXT PRIMARY KEY,
    item_numero INTEGER UNIQUE,                   -- assigned on insert
    recep_numero TEXT NOT NULL UNIQUE,            -- one record per reception
    ot TEXT,
    codigo_muestra TEXT,
    fecha_recepcion TEXT,                         -- ISO date
    fecha_inicio TEXT,
    fecha_entrega_estimada TEXT,
    cliente_nombre TEXT NOT NULL DEFAULT '',
    descripcion_servicio TEXT,
    proyecto TEXT,
    entrega_real TEXT,
    estado_trabajo TEXT NOT NULL DEFAULT 'PENDIENTE',
    cotizacion_lab TEXT,
    autorizacion_lab TEXT,
    nota_lab TEXT,
    dias_atraso_lab INTEGER,
    motivo_dias_atraso_lab TEXT,
    evidencia_envio_recepcion TEXT,
    envio_informes TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_lab_created_at ON programacion_lab(created_at);

CREATE TABLE IF NOT EXISTS programacion_comercial (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    programacion_id TEXT NOT NULL UNIQUE REFERENCES programacion_lab(id) ON DELETE CASCADE,
    fecha_solicitud_com TEXT,
    fecha_entrega_com TEXT,
    evidencia_solicitud_envio TEXT,
    dias_atraso_envio_coti INTEGER,
    motivo_dias_atraso_com TEXT
);

CREATE TABLE IF NOT EXISTS programacion_administracion (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    programacion_id TEXT NOT NULL UNIQUE REFERENCES programacion_lab(id) ON DELETE CASCADE,
    numero_factura TEXT,
    estado_pago TEXT,
    estado_autorizar TEXT,
    nota_admin TEXT
);

CREATE VIEW IF NOT EXISTS cuadro_control AS
SELECT
    l.*,
    c.fecha_solicitud_com,
    c.fecha_entrega_com,
    c.evidencia_solicitud_envio,
    c.dias_atraso_envio_coti,
    c.motivo_dias_atraso_com,
    a.numero_factura,
    a.estado_pago,
    a.estado_autorizar,
    a.nota_admin
FROM programacion_lab l
LEFT JOIN programacion_comercial c ON c.programacion_id = l.id
LEFT JOIN programacion_administracion a ON a.programacion_id = l.id;

-- ============================================================================
-- Profiles and role definitions
-- ============================================================================

CREATE TABLE IF NOT EXISTS role_definitions (
    role TEXT PRIMARY KEY,
    permissions TEXT NOT NULL DEFAULT '{}'        -- JSON object area -> {read, write, delete}
);

CREATE TABLE IF NOT EXISTS perfiles (
    id TEXT PRIMARY KEY,
    role TEXT NOT NULL REFERENCES role_definitions(role)
);

-- ============================================================================
-- Change log (drained into change notifications)
-- ============================================================================

CREATE TABLE IF NOT EXISTS change_log (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    table_name TEXT NOT NULL,
    event_type TEXT NOT NULL CHECK (event_type IN ('INSERT', 'UPDATE', 'DELETE')),
    new_row TEXT,                                 -- JSON row image
    old_row TEXT,
    committed_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TRIGGER IF NOT EXISTS lab_changes_ai AFTER INSERT ON programacion_lab BEGIN
    INSERT INTO change_log (table_name, event_type, new_row, old_row)
    VALUES ('programacion_lab', 'INSERT', json_object(
        'id', new.id,
        'item_numero', new.item_numero,
        'recep_numero', new.recep_numero,
        'ot', new.ot,
        'codigo_muestra', new.codigo_muestra,
        'fecha_recepcion', new.fecha_recepcion,
        'fecha_inicio', new.fecha_inicio,
        'fecha_entrega_estimada', new.fecha_entrega_estimada,
        'cliente_nombre', new.cliente_nombre,
        'descripcion_servicio', new.descripcion_servicio,
        'proyecto', new.proyecto,
        'entrega_real', new.entrega_real,
        'estado_trabajo', new.estado_trabajo,
        'cotizacion_lab', new.cotizacion_lab,
        'autorizacion_lab', new.autorizacion_lab,
        'nota_lab', new.nota_lab,
        'dias_atraso_lab', new.dias_atraso_lab,
        'motivo_dias_atraso_lab', new.motivo_dias_atraso_lab,
        'evidencia_envio_recepcion', new.evidencia_envio_recepcion,
        'envio_informes', new.envio_informes,
        'created_at', new.created_at,
        'updated_at', new.updated_at
    ), NULL);
END;

CREATE TRIGGER IF NOT EXISTS lab_changes_au AFTER UPDATE ON programacion_lab BEGIN
    INSERT INTO change_log (table_name, event_type, new_row, old_row)
    VALUES ('programacion_lab', 'UPDATE', json_object(
        'id', new.id,
        'item_numero', new.item_numero,
        'recep_numero', new.recep_numero,
        'ot', new.ot,
        'codigo_muestra', new.codigo_muestra,
        'fecha_recepcion', new.fecha_recepcion,
        'fecha_inicio', new.fecha_inicio,
        'fecha_entrega_estimada', new.fecha_entrega_estimada,
        'cliente_nombre', new.cliente_nombre,
        'descripcion_servicio', new.descripcion_servicio,
        'proyecto', new.proyecto,
        'entrega_real', new.entrega_real,
        'estado_trabajo', new.estado_trabajo,
        'cotizacion_lab', new.cotizacion_lab,
        'autorizacion_lab', new.autorizacion_lab,
        'nota_lab', new.nota_lab,
        'dias_atraso_lab', new.dias_atraso_lab,
        'motivo_dias_atraso_lab', new.motivo_dias_atraso_lab,
        'evidencia_envio_recepcion', new.evidencia_envio_recepcion,
        'envio_informes', new.envio_informes,
        'created_at', new.created_at,
        'updated_at', new.updated_at
    ), json_object(
        'id', old.id
    ));
END;

CREATE TRIGGER IF NOT EXISTS lab_changes_ad AFTER DELETE ON programacion_lab BEGIN
    INSERT INTO change_log (table_name, event_type, new_row, old_row)
    VALUES ('programacion_lab', 'DELETE', NULL, json_object(
        'id', old.id
    ));
END;

CREATE TRIGGER IF NOT EXISTS comercial_changes_ai AFTER INSERT ON programacion_comercial BEGIN
    INSERT INTO change_log (table_name, event_type, new_row, old_row)
    VALUES ('programacion_comercial', 'INSERT', json_object(
        'id', new.id,
        'programacion_id', new.programacion_id,
        'fecha_solicitud_com', new.fecha_solicitud_com,
        'fecha_entrega_com', new.fecha_entrega_com,
        'evidencia_solicitud_envio', new.evidencia_solicitud_envio,
        'dias_atraso_envio_coti', new.dias_atraso_envio_coti,
        'motivo_dias_atraso_com', new.motivo_dias_atraso_com
    ), NULL);
END;

CREATE TRIGGER IF NOT EXISTS comercial_changes_au AFTER UPDATE ON programacion_comercial BEGIN
    INSERT INTO change_log (table_name, event_type, new_row, old_row)
    VALUES ('programacion_comercial', 'UPDATE', json_object(
        'id', new.id,
        'programacion_id', new.programacion_id,
        'fecha_solicitud_com', new.fecha_solicitud_com,
        'fecha_entrega_com', new.fecha_entrega_com,
        'evidencia_solicitud_envio', new.evidencia_solicitud_envio,
        'dias_atraso_envio_coti', new.dias_atraso_envio_coti,
        'motivo_dias_atraso_com', new.motivo_dias_atraso_com
    ), json_object(
        'id', old.id,
        'programacion_id', old.programacion_id
    ));
END;

CREATE TRIGGER IF NOT EXISTS comercial_changes_ad AFTER DELETE ON programacion_comercial BEGIN
    INSERT INTO change_log (table_name, event_type, new_row, old_row)
    VALUES ('programacion_comercial', 'DELETE', NULL, json_object(
        'id', old.id,
        'programacion_id', old.programacion_id
    ));
END;

CREATE TRIGGER IF NOT EXISTS administracion_changes_ai AFTER INSERT ON programacion_administracion BEGIN
    INSERT INTO change_log (table_name, event_type, new_row, old_row)
    VALUES ('programacion_administracion', 'INSERT', json_object(
        'id', new.id,
        'programacion_id', new.programacion_id,
        'numero_factura', new.numero_factura,
        'estado_pago', new.estado_pago,
        'estado_autorizar', new.estado_autorizar,
        'nota_admin', new.nota_admin
    ), NULL);
END;

CREATE TRIGGER IF NOT EXISTS administracion_changes_au AFTER UPDATE ON programacion_administracion BEGIN
    INSERT INTO change_log (table_name, event_type, new_row, old_row)
    VALUES ('programacion_administracion', 'UPDATE', json_object(
        'id', new.id,
        'programacion_id', new.programacion_id,
        'numero_factura', new.numero_factura,
        'estado_pago', new.estado_pago,
        'estado_autorizar', new.estado_autorizar,
        'nota_admin', new.nota_admin
    ), json_object(
        'id', old.id,
        'programacion_id', old.programacion_id
    ));
END;

CREATE TRIGGER IF NOT EXISTS administracion_changes_ad AFTER DELETE ON programacion_administracion BEGIN
    INSERT INTO change_log (table_name, event_type, new_row, old_row)
    VALUES ('programacion_administracion', 'DELETE', NULL, json_object(
        'id', old.id,
        'programacion_id', old.programacion_id
    ));
END;
"#;
