//! The joined service record projection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Field, ModelError, ModelResult, REFERENCE_COLUMN};
use crate::formatters::parse_iso_date;

/// One lab service request as seen through the joined view.
///
/// Exactly one record exists per reception. `item_numero` is assigned by the
/// backend and never sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: String,
    #[serde(default)]
    pub item_numero: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recep_numero: String,
    #[serde(default)]
    pub ot: Option<String>,
    #[serde(default)]
    pub codigo_muestra: Option<String>,
    #[serde(default)]
    pub fecha_recepcion: Option<String>,
    #[serde(default)]
    pub fecha_inicio: Option<String>,
    #[serde(default)]
    pub fecha_entrega_estimada: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cliente_nombre: String,
    #[serde(default)]
    pub descripcion_servicio: Option<String>,
    #[serde(default)]
    pub proyecto: Option<String>,
    #[serde(default)]
    pub entrega_real: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub estado_trabajo: String,
    #[serde(default)]
    pub cotizacion_lab: Option<String>,
    #[serde(default)]
    pub autorizacion_lab: Option<String>,
    #[serde(default)]
    pub nota_lab: Option<String>,
    #[serde(default)]
    pub dias_atraso_lab: Option<i64>,
    #[serde(default)]
    pub motivo_dias_atraso_lab: Option<String>,
    #[serde(default)]
    pub evidencia_envio_recepcion: Option<String>,
    #[serde(default)]
    pub envio_informes: Option<String>,

    // Commercial extension
    #[serde(default)]
    pub fecha_solicitud_com: Option<String>,
    #[serde(default)]
    pub fecha_entrega_com: Option<String>,
    #[serde(default)]
    pub evidencia_solicitud_envio: Option<String>,
    #[serde(default)]
    pub dias_atraso_envio_coti: Option<i64>,
    #[serde(default)]
    pub motivo_dias_atraso_com: Option<String>,

    // Admin extension
    #[serde(default)]
    pub numero_factura: Option<String>,
    #[serde(default)]
    pub estado_pago: Option<String>,
    #[serde(default)]
    pub estado_autorizar: Option<String>,
    #[serde(default)]
    pub nota_admin: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ServiceRecord {
    /// Decode a row image from the backend.
    pub fn from_value(value: Value) -> ModelResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_map(&self) -> ModelResult<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(ModelError::RowImage(serde::de::Error::custom(format!(
                "expected an object row image, got {}",
                other
            )))),
        }
    }

    /// Read a single field as a JSON value.
    pub fn get(&self, field: Field) -> ModelResult<Value> {
        let map = self.to_map()?;
        Ok(map.get(field.as_str()).cloned().unwrap_or(Value::Null))
    }

    /// Overwrite a single field.
    pub fn set(&mut self, field: Field, value: Value) -> ModelResult<()> {
        if field == Field::Id {
            return Err(ModelError::ReadOnlyField(field.to_string()));
        }
        let mut map = self.to_map()?;
        map.insert(field.as_str().to_string(), value);
        *self = serde_json::from_value(Value::Object(map))?;
        Ok(())
    }

    /// Merge a partial row image into this record.
    ///
    /// Only known fields present in `patch` are overwritten. The joined
    /// identity is never taken from the patch, since extension relations carry
    /// their own primary key under `id`. Returns the fields whose value changed.
    pub fn merge(&mut self, patch: &Map<String, Value>) -> ModelResult<Vec<Field>> {
        let mut map = self.to_map()?;
        let mut changed = Vec::new();

        for (key, value) in patch {
            if key == Field::Id.as_str() || key == REFERENCE_COLUMN {
                continue;
            }
            let Ok(field) = key.parse::<Field>() else {
                continue;
            };
            if map.get(key) != Some(value) {
                changed.push(field);
                map.insert(key.clone(), value.clone());
            }
        }

        if !changed.is_empty() {
            *self = serde_json::from_value(Value::Object(map))?;
        }
        Ok(changed)
    }

    /// Days the lab delivery is late: actual (or `today` when still open)
    /// minus the estimated delivery. Negative means delivered early; an open
    /// record that is not yet due reports 0.
    pub fn lab_delay_days(&self, today: NaiveDate) -> Option<i64> {
        let estimated = self.fecha_entrega_estimada.as_deref().and_then(parse_iso_date)?;
        match self.entrega_real.as_deref() {
            Some(raw) => Some((parse_iso_date(raw)? - estimated).num_days()),
            None => Some((today - estimated).num_days().max(0)),
        }
    }

    /// Days between the quote request and the quote delivery.
    pub fn quote_delay_days(&self) -> Option<i64> {
        let requested = self.fecha_solicitud_com.as_deref().and_then(parse_iso_date)?;
        let delivered = self.fecha_entrega_com.as_deref().and_then(parse_iso_date)?;
        Some((delivered - requested).num_days())
    }

    /// Sample code normalized for duplicate detection.
    pub fn sample_code_key(&self) -> Option<String> {
        self.codigo_muestra
            .as_deref()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
    }
}
