//! Spreadsheet export.

mod batch;
mod client;

pub use batch::*;
pub use client::*;

use thiserror::Error;

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Export service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Nothing to export")]
    Empty,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type ExportResult<T> = Result<T, ExportError>;
