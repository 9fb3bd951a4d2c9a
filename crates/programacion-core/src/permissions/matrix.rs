//! View modes and the backend-held permission matrix.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three presentation contexts, each with its own column set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViewMode {
    #[serde(rename = "LAB")]
    Lab,
    #[serde(rename = "COM")]
    Commercial,
    #[serde(rename = "ADMIN")]
    Admin,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::Lab, ViewMode::Commercial, ViewMode::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Lab => "LAB",
            ViewMode::Commercial => "COM",
            ViewMode::Admin => "ADMIN",
        }
    }

    /// Parse the `mode` URL parameter.
    pub fn from_param(param: &str) -> Option<Self> {
        match param.trim().to_lowercase().as_str() {
            "lab" | "laboratorio" => Some(ViewMode::Lab),
            "com" | "comercial" => Some(ViewMode::Commercial),
            "admin" => Some(ViewMode::Admin),
            _ => None,
        }
    }

    /// Matrix areas that grant access to this view.
    pub fn areas(&self) -> &'static [&'static str] {
        match self {
            ViewMode::Lab => &[AREA_LAB, AREA_PROGRAM],
            ViewMode::Commercial => &[AREA_COMMERCIAL],
            ViewMode::Admin => &[AREA_ADMIN],
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            ViewMode::Lab => 0,
            ViewMode::Commercial => 1,
            ViewMode::Admin => 2,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const AREA_LAB: &str = "laboratorio";
pub const AREA_PROGRAM: &str = "programacion";
pub const AREA_COMMERCIAL: &str = "comercial";
pub const AREA_ADMIN: &str = "administracion";

/// Capabilities for one business area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaGrant {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub delete: bool,
}

/// Mapping from business area to capability flags, as stored on the role
/// definition in the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMatrix(pub BTreeMap<String, AreaGrant>);

impl PermissionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_area(mut self, area: &str, grant: AreaGrant) -> Self {
        self.0.insert(area.to_string(), grant);
        self
    }

    pub fn area(&self, area: &str) -> Option<&AreaGrant> {
        self.0.get(area)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn can_read(&self, view: ViewMode) -> bool {
        view.areas()
            .iter()
            .any(|a| self.area(a).is_some_and(|g| g.read))
    }

    pub fn can_write(&self, view: ViewMode) -> bool {
        view.areas()
            .iter()
            .any(|a| self.area(a).is_some_and(|g| g.write))
    }
}

/// Flags passed by the host frame that override role-based resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlOverrides {
    pub is_admin: bool,
    pub can_write: bool,
}

impl From<&programacion_bridge::FrameParams> for UrlOverrides {
    fn from(params: &programacion_bridge::FrameParams) -> Self {
        Self {
            is_admin: params.is_admin,
            can_write: params.can_write,
        }
    }
}
