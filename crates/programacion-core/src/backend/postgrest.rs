//! HTTP adapter for the hosted backend's REST interface.

use chrono::Utc;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::{Backend, BackendError, BackendResult, UserPermissions};
use crate::config::Config;
use crate::models::{Field, Relation, ServiceRecord, JOINED_VIEW, REFERENCE_COLUMN};
use crate::permissions::PermissionMatrix;

/// Blocking client for `/rest/v1/<relation>` endpoints.
pub struct PostgrestBackend {
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
    client: Client,
}

impl PostgrestBackend {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> BackendResult<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(BackendError::Config("backend URL must not be empty".to_string()));
        }

        let client = Client::builder().build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            access_token: None,
            client,
        })
    }

    /// Build from configuration; both the project URL and key are required.
    pub fn from_config(config: &Config) -> BackendResult<Self> {
        match (&config.supabase_url, &config.supabase_anon_key) {
            (Some(url), Some(key)) => Self::new(url.clone(), key.clone()),
            _ => Err(BackendError::Config(
                "SUPABASE_URL and SUPABASE_ANON_KEY are required".to_string(),
            )),
        }
    }

    /// Authenticate as a user instead of the anonymous role.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn endpoint(&self, relation: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, relation)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request
            .header("apikey", &self.anon_key)
            .header("Accept", "application/json")
            .bearer_auth(bearer)
    }

    fn check(response: Response) -> BackendResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .unwrap_or_else(|_| "unable to read response body".to_string());
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn eq_filter(column: &str, value: &str) -> String {
        format!("{}=eq.{}", column, urlencoding::encode(value))
    }

    fn get_rows(&self, query: &str) -> BackendResult<Vec<ServiceRecord>> {
        let url = format!("{}?{}", self.endpoint(JOINED_VIEW), query);
        let response = Self::check(self.authorize(self.client.get(url)).send()?)?;
        let rows: Vec<Value> = response.json()?;
        rows.into_iter()
            .map(|row| ServiceRecord::from_value(row).map_err(BackendError::from))
            .collect()
    }
}

impl Backend for PostgrestBackend {
    fn fetch_rows(&self, limit: usize) -> BackendResult<Vec<ServiceRecord>> {
        let rows = self.get_rows(&format!("select=*&order=created_at.desc&limit={limit}"))?;
        debug!(count = rows.len(), limit, "fetched joined rows");
        Ok(rows)
    }

    fn fetch_row(&self, id: &str) -> BackendResult<Option<ServiceRecord>> {
        let query = format!("select=*&{}", Self::eq_filter("id", id));
        Ok(self.get_rows(&query)?.into_iter().next())
    }

    fn update_field(
        &self,
        relation: Relation,
        id: &str,
        field: Field,
        value: &Value,
    ) -> BackendResult<()> {
        let now = Utc::now().to_rfc3339();
        let request = match relation {
            Relation::Lab => {
                let url = format!(
                    "{}?{}",
                    self.endpoint(relation.table_name()),
                    Self::eq_filter(relation.key_column(), id)
                );
                self.client
                    .patch(url)
                    .json(&json!({ field.as_str(): value, "updated_at": now }))
            }
            // Extension rows may not exist yet; upsert on the reference column.
            Relation::Commercial | Relation::Admin => {
                let url = format!(
                    "{}?on_conflict={}",
                    self.endpoint(relation.table_name()),
                    REFERENCE_COLUMN
                );
                self.client
                    .post(url)
                    .header("Prefer", "resolution=merge-duplicates")
                    .json(&json!({ REFERENCE_COLUMN: id, field.as_str(): value, "updated_at": now }))
            }
        };

        Self::check(self.authorize(request).send()?)?;
        debug!(table = relation.table_name(), id, field = %field, "field written");
        Ok(())
    }

    fn insert_row(&self, values: &Map<String, Value>) -> BackendResult<ServiceRecord> {
        let request = self
            .client
            .post(self.endpoint(Relation::Lab.table_name()))
            .header("Prefer", "return=representation")
            .json(values);
        let response = Self::check(self.authorize(request).send()?)?;
        let inserted: Vec<Value> = response.json()?;
        let lab_row = inserted
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound("inserted row".to_string()))?;
        let lab_record = ServiceRecord::from_value(lab_row)?;

        // The joined projection carries the backend-assigned item number.
        match self.fetch_row(&lab_record.id)? {
            Some(joined) => Ok(joined),
            None => {
                warn!(id = %lab_record.id, "inserted row missing from joined view");
                Ok(lab_record)
            }
        }
    }

    fn fetch_permissions(&self, user_id: &str) -> BackendResult<Option<UserPermissions>> {
        let url = format!(
            "{}?select=role,role_definitions!fk_perfiles_role(permissions)&{}",
            self.endpoint("perfiles"),
            Self::eq_filter("id", user_id)
        );
        let response = Self::check(self.authorize(self.client.get(url)).send()?)?;
        let profiles: Vec<ProfileRow> = response.json()?;
        Ok(profiles.into_iter().next().map(ProfileRow::into_permissions))
    }
}

/// `perfiles` row with its embedded role definition.
#[derive(Debug, Deserialize)]
struct ProfileRow {
    role: Option<String>,
    #[serde(default)]
    role_definitions: Option<RoleDefinitions>,
}

/// The embedded relation comes back as an object or a one-element array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RoleDefinitions {
    One(RoleDefinition),
    Many(Vec<RoleDefinition>),
}

#[derive(Debug, Deserialize)]
struct RoleDefinition {
    #[serde(default)]
    permissions: Option<PermissionMatrix>,
}

impl ProfileRow {
    fn into_permissions(self) -> UserPermissions {
        let definition = match self.role_definitions {
            Some(RoleDefinitions::One(def)) => Some(def),
            Some(RoleDefinitions::Many(defs)) => defs.into_iter().next(),
            None => None,
        };
        UserPermissions {
            role: self.role,
            permissions: definition.and_then(|d| d.permissions).unwrap_or_default(),
        }
    }
}
