//! Error types for plan assembly

use flotilla_core::UniqName;
use thiserror::Error;

/// Plan assembly errors
#[derive(Debug, Error)]
pub enum PlanError {
    // ============ Parse Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse plan file: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ============ Validation Errors ============
    #[error(transparent)]
    Release(#[from] flotilla_core::CoreError),

    #[error("Duplicate release: {uniq}")]
    DuplicateRelease { uniq: UniqName },

    #[error("Duplicate repository: {name}")]
    DuplicateRepository { name: String },

    #[error("Duplicate registry: {host}")]
    DuplicateRegistry { host: String },

    #[error("Invalid repository URL: {url} - {reason}")]
    InvalidRepositoryUrl { url: String, reason: String },

    #[error("Invalid registry: {message}")]
    InvalidRegistry { message: String },

    // ============ Lookup Errors ============
    #[error("Release not found: {reference}")]
    ReleaseNotFound { reference: String },

    #[error("Multiple releases found for {reference}: {}", .matches.join(", "))]
    MultipleReleasesFound {
        reference: String,
        matches: Vec<String>,
    },
}

/// Result type for plan operations
pub type Result<T> = std::result::Result<T, PlanError>;
