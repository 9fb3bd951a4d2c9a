//! Static role tables.
//!
//! These tables are the authoritative business rules; they are matched
//! literally, never derived.

use super::ViewMode;
use crate::models::Field;

const ALL_VIEWS: &[ViewMode] = &[ViewMode::Lab, ViewMode::Commercial, ViewMode::Admin];

/// Views and write access granted to a known role name.
#[derive(Debug, Clone, Copy)]
pub struct RoleProfile {
    pub role: &'static str,
    /// View opened by default for this role.
    pub home: ViewMode,
    pub views: &'static [ViewMode],
    pub write: &'static [ViewMode],
}

pub const ROLE_TABLE: &[RoleProfile] = &[
    RoleProfile {
        role: "admin",
        home: ViewMode::Admin,
        views: ALL_VIEWS,
        write: ALL_VIEWS,
    },
    RoleProfile {
        role: "administrativo",
        home: ViewMode::Admin,
        views: ALL_VIEWS,
        write: ALL_VIEWS,
    },
    RoleProfile {
        role: "vendor",
        home: ViewMode::Commercial,
        views: &[ViewMode::Commercial],
        write: &[ViewMode::Commercial],
    },
    RoleProfile {
        role: "laboratorio_lector",
        home: ViewMode::Lab,
        views: &[ViewMode::Lab],
        write: &[],
    },
    RoleProfile {
        role: "laboratorio_tipificador",
        home: ViewMode::Lab,
        views: &[ViewMode::Lab],
        write: &[ViewMode::Lab],
    },
];

/// Role with unrestricted access.
pub const SUPERADMIN_ROLE: &str = "admin";

/// Which fields an exception covers.
#[derive(Debug, Clone, Copy)]
pub enum FieldScope {
    All,
    Only(&'static [Field]),
}

/// A field a role may not write, even when it can write the view.
#[derive(Debug, Clone, Copy)]
pub struct FieldException {
    pub role: &'static str,
    /// `None` applies the exception in every view.
    pub view: Option<ViewMode>,
    pub fields: FieldScope,
}

pub const FIELD_EXCEPTIONS: &[FieldException] = &[
    FieldException {
        role: "laboratorio_tipificador",
        view: Some(ViewMode::Lab),
        fields: FieldScope::Only(&[Field::LabQuotation, Field::LabAuthorization]),
    },
    FieldException {
        role: "vendor",
        view: None,
        fields: FieldScope::Only(&[Field::PaymentStatus, Field::LabAuthorization]),
    },
    FieldException {
        role: "laboratorio_lector",
        view: None,
        fields: FieldScope::All,
    },
];

const HIGH_LEVEL_MARKERS: &[&str] = &["admin", "geren", "administra", "direc", "jefe"];
const COMMERCIAL_MARKERS: &[&str] = &["comercial", "vendedor", "asesor", "vendor", "ventas"];
const LAB_MARKERS: &[&str] = &["laboratorio"];

/// Lowercase, trim and strip accents so `Gerencía` matches `gerencia`.
pub fn normalize_role(role: &str) -> String {
    role.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Exact lookup of a normalized role.
pub fn role_profile(normalized_role: &str) -> Option<&'static RoleProfile> {
    ROLE_TABLE.iter().find(|p| p.role == normalized_role)
}

/// Management roles (`gerente`, `jefe de laboratorio`, `director`, ...).
pub fn is_high_level_role(normalized_role: &str) -> bool {
    HIGH_LEVEL_MARKERS.iter().any(|m| normalized_role.contains(m))
}

/// Views granted by substring heuristics: `(visible, writable)`.
pub fn heuristic_access(normalized_role: &str) -> (Vec<ViewMode>, Vec<ViewMode>) {
    if is_high_level_role(normalized_role) {
        return (ALL_VIEWS.to_vec(), ALL_VIEWS.to_vec());
    }

    let mut views = Vec::new();
    if COMMERCIAL_MARKERS.iter().any(|m| normalized_role.contains(m)) {
        views.push(ViewMode::Commercial);
    }
    if LAB_MARKERS.iter().any(|m| normalized_role.contains(m)) {
        views.push(ViewMode::Lab);
    }
    (views, Vec::new())
}

/// Preferred view for a role without an explicit `mode` parameter.
pub fn home_view(normalized_role: &str) -> ViewMode {
    if let Some(profile) = role_profile(normalized_role) {
        return profile.home;
    }
    if is_high_level_role(normalized_role) {
        return ViewMode::Admin;
    }
    if COMMERCIAL_MARKERS.iter().any(|m| normalized_role.contains(m)) {
        return ViewMode::Commercial;
    }
    ViewMode::Lab
}

/// Whether the exception table forbids `role` from writing `field` in `view`.
pub fn field_denied(normalized_role: &str, view: ViewMode, field: Field) -> bool {
    FIELD_EXCEPTIONS.iter().any(|e| {
        e.role == normalized_role
            && e.view.map_or(true, |v| v == view)
            && match e.fields {
                FieldScope::All => true,
                FieldScope::Only(fields) => fields.contains(&field),
            }
    })
}
