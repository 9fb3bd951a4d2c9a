//! Service record queries.

use chrono::Utc;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use serde_json::{Map, Number, Value};
use tracing::debug;
use uuid::Uuid;

use super::{Database, DbError, DbResult};
use crate::models::{Field, Relation, ServiceRecord, JOINED_VIEW, REFERENCE_COLUMN};

impl Database {
    /// Joined rows, newest first.
    pub fn list_records(&self, limit: usize) -> DbResult<Vec<ServiceRecord>> {
        let sql = format!(
            "SELECT * FROM {JOINED_VIEW} ORDER BY created_at DESC, item_numero DESC LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let images = stmt
            .query_map(params![limit as i64], row_image)?
            .collect::<Result<Vec<_>, _>>()?;
        images
            .into_iter()
            .map(|image| ServiceRecord::from_value(Value::Object(image)).map_err(DbError::from))
            .collect()
    }

    pub fn get_record(&self, id: &str) -> DbResult<Option<ServiceRecord>> {
        let sql = format!("SELECT * FROM {JOINED_VIEW} WHERE id = ?1");
        let image = self
            .conn
            .query_row(&sql, params![id], row_image)
            .optional()?;
        match image {
            Some(image) => Ok(Some(ServiceRecord::from_value(Value::Object(image))?)),
            None => Ok(None),
        }
    }

    /// Write one field. Extension rows are created on first write.
    pub fn write_field(
        &self,
        relation: Relation,
        id: &str,
        field: Field,
        value: &Value,
    ) -> DbResult<()> {
        if field.relation() != relation || field == Field::Id {
            return Err(DbError::WrongRelation {
                field,
                table: relation.table_name(),
            });
        }
        let column = field.as_str();
        let table = relation.table_name();

        match relation {
            Relation::Lab => {
                let sql = format!("UPDATE {table} SET {column} = ?1, updated_at = ?2 WHERE id = ?3");
                let affected = self.conn.execute(
                    &sql,
                    params![sql_value(value), Utc::now().to_rfc3339(), id],
                )?;
                if affected == 0 {
                    return Err(DbError::NotFound(id.to_string()));
                }
            }
            Relation::Commercial | Relation::Admin => {
                if self.get_record(id)?.is_none() {
                    return Err(DbError::NotFound(id.to_string()));
                }
                let sql = format!(
                    "INSERT INTO {table} ({REFERENCE_COLUMN}, {column}) VALUES (?1, ?2) \
                     ON CONFLICT({REFERENCE_COLUMN}) DO UPDATE SET {column} = excluded.{column}"
                );
                self.conn.execute(&sql, params![id, sql_value(value)])?;
            }
        }

        debug!(table, id, field = column, "field written");
        Ok(())
    }

    /// Insert a lab-origin row and return its joined projection.
    ///
    /// Keys that are not client-writable lab columns are ignored; the item
    /// number is assigned here.
    pub fn insert_record(&self, values: &Map<String, Value>) -> DbResult<ServiceRecord> {
        let id = Uuid::new_v4().to_string();

        let mut columns = vec!["id".to_string()];
        let mut bound = vec![SqlValue::Text(id.clone())];
        for (key, value) in values {
            let Ok(field) = key.parse::<Field>() else {
                continue;
            };
            if field.relation() == Relation::Lab && field.is_client_writable() {
                columns.push(field.as_str().to_string());
                bound.push(sql_value(value));
            }
        }

        let placeholders: Vec<String> = (1..=bound.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}, item_numero) VALUES ({}, \
             (SELECT COALESCE(MAX(item_numero), 0) + 1 FROM {}))",
            Relation::Lab.table_name(),
            columns.join(", "),
            placeholders.join(", "),
            Relation::Lab.table_name(),
        );
        self.conn.execute(&sql, params_from_iter(bound))?;
        debug!(id = %id, "row inserted");

        self.get_record(&id)?.ok_or(DbError::NotFound(id))
    }

    /// Delete a joined row with its extensions. The editor never deletes;
    /// this stands in for deletions made elsewhere.
    pub fn delete_record(&self, id: &str) -> DbResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", Relation::Lab.table_name());
        Ok(self.conn.execute(&sql, params![id])? > 0)
    }
}

/// Read a result row into a JSON object keyed by column name.
fn row_image(row: &Row<'_>) -> rusqlite::Result<Map<String, Value>> {
    let mut image = Map::new();
    let columns = row.as_ref().column_count();
    for i in 0..columns {
        let name = row.as_ref().column_name(i)?.to_string();
        let value = match row.get_ref(i)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(n) => Value::from(n),
            ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(_) => Value::Null,
        };
        image.insert(name, value);
    }
    Ok(image)
}

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}
