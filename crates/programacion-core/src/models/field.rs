//! Column names of the joined projection and the relation each one lives in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ModelError;

/// The backing relation that stores a field.
///
/// A service record is stored across three normalized tables joined by a
/// shared identity; the client only reads the joined view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// Lab-origin fields; owns the record identity.
    Lab,
    /// Commercial extension, keyed by `programacion_id`.
    Commercial,
    /// Administrative extension, keyed by `programacion_id`.
    Admin,
}

/// Read-only view joining the three relations.
pub const JOINED_VIEW: &str = "cuadro_control";

/// Column in the extension relations that references the joined identity.
pub const REFERENCE_COLUMN: &str = "programacion_id";

impl Relation {
    pub const ALL: [Relation; 3] = [Relation::Lab, Relation::Commercial, Relation::Admin];

    pub fn table_name(&self) -> &'static str {
        match self {
            Relation::Lab => "programacion_lab",
            Relation::Commercial => "programacion_comercial",
            Relation::Admin => "programacion_administracion",
        }
    }

    /// Column used to address a joined row in this relation.
    pub fn key_column(&self) -> &'static str {
        match self {
            Relation::Lab => "id",
            Relation::Commercial | Relation::Admin => REFERENCE_COLUMN,
        }
    }

    pub fn from_table(name: &str) -> Result<Self, ModelError> {
        Relation::ALL
            .into_iter()
            .find(|r| r.table_name() == name)
            .ok_or_else(|| ModelError::UnknownRelation(name.to_string()))
    }

    /// Fields stored in this relation.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL.into_iter().filter(move |f| f.relation() == *self)
    }
}

macro_rules! fields {
    (@one $variant:ident) => { 1usize };
    ($($variant:ident => $wire:literal,)*) => {
        /// A column of the joined service record projection.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Field {
            $(
                #[serde(rename = $wire)]
                $variant,
            )*
        }

        impl Field {
            pub const ALL: [Field; 0usize $(+ fields!(@one $variant))*] = [$(Field::$variant),*];

            /// Column name used on the wire and in the backend.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Field::$variant => $wire,)*
                }
            }
        }

        impl FromStr for Field {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Field::$variant),)*
                    _ => Err(ModelError::UnknownField(s.to_string())),
                }
            }
        }
    };
}

fields! {
    Id => "id",
    ItemNumber => "item_numero",
    ReceptionNumber => "recep_numero",
    WorkOrder => "ot",
    SampleCode => "codigo_muestra",
    ReceivedDate => "fecha_recepcion",
    StartDate => "fecha_inicio",
    EstimatedDelivery => "fecha_entrega_estimada",
    ClientName => "cliente_nombre",
    Description => "descripcion_servicio",
    Project => "proyecto",
    ActualDelivery => "entrega_real",
    WorkStatus => "estado_trabajo",
    LabQuotation => "cotizacion_lab",
    LabAuthorization => "autorizacion_lab",
    LabNote => "nota_lab",
    LabDelayDays => "dias_atraso_lab",
    LabDelayReason => "motivo_dias_atraso_lab",
    ReceptionEvidence => "evidencia_envio_recepcion",
    ReportsSent => "envio_informes",
    QuoteRequestDate => "fecha_solicitud_com",
    QuoteDeliveryDate => "fecha_entrega_com",
    QuoteEvidence => "evidencia_solicitud_envio",
    QuoteDelayDays => "dias_atraso_envio_coti",
    QuoteDelayReason => "motivo_dias_atraso_com",
    InvoiceNumber => "numero_factura",
    PaymentStatus => "estado_pago",
    AdminAuthorization => "estado_autorizar",
    AdminNote => "nota_admin",
    CreatedAt => "created_at",
    UpdatedAt => "updated_at",
}

impl Field {
    pub fn relation(&self) -> Relation {
        match self {
            Field::QuoteRequestDate
            | Field::QuoteDeliveryDate
            | Field::QuoteEvidence
            | Field::QuoteDelayDays
            | Field::QuoteDelayReason => Relation::Commercial,
            Field::InvoiceNumber
            | Field::PaymentStatus
            | Field::AdminAuthorization
            | Field::AdminNote => Relation::Admin,
            _ => Relation::Lab,
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(
            self,
            Field::ReceivedDate
                | Field::StartDate
                | Field::EstimatedDelivery
                | Field::ActualDelivery
                | Field::QuoteRequestDate
                | Field::QuoteDeliveryDate
        )
    }

    /// Computed from other fields, never entered by hand.
    pub fn is_computed(&self) -> bool {
        matches!(self, Field::LabDelayDays | Field::QuoteDelayDays)
    }

    /// Whether the client may ever send a value for this field.
    ///
    /// Identity, the backend-assigned item number, timestamps and computed
    /// delays are excluded regardless of role.
    pub fn is_client_writable(&self) -> bool {
        !matches!(
            self,
            Field::Id | Field::ItemNumber | Field::CreatedAt | Field::UpdatedAt
        ) && !self.is_computed()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
