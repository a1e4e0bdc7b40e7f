//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Plan file failed to parse or validate
    #[error("Plan error: {message}")]
    #[diagnostic(code(flotilla::cli::plan))]
    Plan { message: String },

    /// Template rendering failed
    #[error("Template error: {message}")]
    #[diagnostic(code(flotilla::cli::template))]
    Template { message: String },

    /// The run was unschedulable (unresolved dependency, cycle)
    #[error("Execution error: {message}")]
    #[diagnostic(code(flotilla::cli::exec))]
    Exec { message: String },

    /// Deployment ran but not every release succeeded
    #[error("Deployment finished with {failed} failed and {skipped} skipped release(s)")]
    #[diagnostic(code(flotilla::cli::deploy))]
    DeployFailed { failed: usize, skipped: usize },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(flotilla::cli::io))]
    Io { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Plan { .. } => exit_codes::PLAN_ERROR,
            CliError::Template { .. } => exit_codes::TEMPLATE_ERROR,
            CliError::Exec { .. } => exit_codes::PLAN_ERROR,
            CliError::DeployFailed { .. } => exit_codes::DEPLOY_FAILED,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }

    /// Create a template error
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<flotilla_plan::PlanError> for CliError {
    fn from(err: flotilla_plan::PlanError) -> Self {
        CliError::Plan {
            message: err.to_string(),
        }
    }
}

impl From<flotilla_exec::ExecError> for CliError {
    fn from(err: flotilla_exec::ExecError) -> Self {
        CliError::Exec {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
