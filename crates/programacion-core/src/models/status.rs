//! Option sets for the dropdown-edited columns.
//!
//! Rows store these as free strings; the enums classify known values.

use serde::{Deserialize, Serialize};

/// Lab work status (`estado_trabajo`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkStatus {
    #[default]
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[serde(rename = "PROCESO")]
    InProgress,
    #[serde(rename = "INFORME LISTO")]
    ReportReady,
    #[serde(rename = "COMPLETADO")]
    Completed,
}

impl WorkStatus {
    pub const ALL: [WorkStatus; 4] = [
        WorkStatus::Pending,
        WorkStatus::InProgress,
        WorkStatus::ReportReady,
        WorkStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Pending => "PENDIENTE",
            WorkStatus::InProgress => "PROCESO",
            WorkStatus::ReportReady => "INFORME LISTO",
            WorkStatus::Completed => "COMPLETADO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let upper = value.trim().to_uppercase();
        Self::ALL.into_iter().find(|s| s.as_str() == upper)
    }

    /// Loose classification of legacy values ("EN PROCESO", "LISTO", ...).
    pub fn classify(value: &str) -> Option<Self> {
        let upper = value.to_uppercase();
        if upper.contains("COMPLETADO") {
            Some(WorkStatus::Completed)
        } else if upper.contains("LISTO") {
            Some(WorkStatus::ReportReady)
        } else if upper.contains("PROCESO") {
            Some(WorkStatus::InProgress)
        } else if upper.contains("PENDIENTE") {
            Some(WorkStatus::Pending)
        } else {
            None
        }
    }
}

/// Authorization decision (`autorizacion_lab`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationDecision {
    #[serde(rename = "APROBADO")]
    Approved,
    #[serde(rename = "RECHAZADO")]
    Rejected,
}

impl AuthorizationDecision {
    pub const ALL: [AuthorizationDecision; 2] =
        [AuthorizationDecision::Approved, AuthorizationDecision::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationDecision::Approved => "APROBADO",
            AuthorizationDecision::Rejected => "RECHAZADO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let upper = value.trim().to_uppercase();
        Self::ALL.into_iter().find(|s| s.as_str() == upper)
    }
}

/// Payment status (`estado_pago`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[serde(rename = "EN PROCESO")]
    InProgress,
    #[serde(rename = "PAGADO")]
    Paid,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] =
        [PaymentStatus::Pending, PaymentStatus::InProgress, PaymentStatus::Paid];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDIENTE",
            PaymentStatus::InProgress => "EN PROCESO",
            PaymentStatus::Paid => "PAGADO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let upper = value.trim().to_uppercase();
        Self::ALL.into_iter().find(|s| s.as_str() == upper)
    }
}
