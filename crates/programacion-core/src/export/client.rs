//! Client for the spreadsheet export service.

use chrono::NaiveDate;
use reqwest::blocking::Client;
use tracing::{info, warn};

use super::{ExportBatch, ExportError, ExportResult};
use crate::config::Config;
use crate::permissions::ViewMode;

/// A generated spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Suggested download name, e.g. `Programacion_2026-03-12.xlsx`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("Programacion_{}.xlsx", date.format("%Y-%m-%d"))
}

/// Service path for a view's export.
pub fn export_path(view: ViewMode) -> &'static str {
    match view {
        ViewMode::Lab => "/programacion/export",
        ViewMode::Commercial => "/programacion/export/comercial",
        ViewMode::Admin => "/programacion/export/administracion",
    }
}

pub struct ExportClient {
    api_url: String,
    token: Option<String>,
    client: Client,
}

impl ExportClient {
    pub fn new(api_url: impl Into<String>) -> ExportResult<Self> {
        let api_url = api_url.into();
        if api_url.trim().is_empty() {
            return Err(ExportError::Config("export API URL must not be empty".to_string()));
        }
        let client = Client::builder().build()?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        })
    }

    pub fn from_config(config: &Config) -> ExportResult<Self> {
        Self::new(config.api_url.clone())
    }

    /// Bearer credential sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn endpoint(&self, view: ViewMode) -> String {
        format!("{}{}", self.api_url, export_path(view))
    }

    /// Post the batch and return the generated document.
    pub fn export(&self, batch: &ExportBatch, today: NaiveDate) -> ExportResult<ExportedFile> {
        if batch.is_empty() {
            return Err(ExportError::Empty);
        }

        let url = self.endpoint(batch.view);
        info!(view = %batch.view, rows = batch.len(), url = %url, "requesting export");

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(batch.to_json()?);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "unable to read export response body".to_string());
            warn!(status = status.as_u16(), "export failed");
            return Err(ExportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(ExportedFile {
            file_name: export_file_name(today),
            bytes: response.bytes()?.to_vec(),
        })
    }
}
