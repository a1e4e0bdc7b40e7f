//! Core error types

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CoreError {
    #[error("Invalid identity {input:?}: {reason}")]
    InvalidIdentity { input: String, reason: String },

    #[error("Invalid release {release:?}: {message}")]
    InvalidRelease { release: String, message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
