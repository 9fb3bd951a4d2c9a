//! Domain models for the service record editor.

mod draft;
mod field;
mod record;
mod status;

pub use draft::*;
pub use field::*;
pub use record::*;
pub use status::*;

use thiserror::Error;

/// Model errors.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown relation: {0}")]
    UnknownRelation(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Field {0} is not writable from the client")]
    ReadOnlyField(String),

    #[error("Row image error: {0}")]
    RowImage(#[from] serde_json::Error),
}

pub type ModelResult<T> = Result<T, ModelError>;
