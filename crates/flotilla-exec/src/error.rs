//! Error types for graph construction and release execution
//!
//! Structural errors (duplicates, unresolved references, cycles) abort a run
//! before anything executes. Execution errors are recorded against a single
//! release and aggregated into the plan result.

use std::time::Duration;

use flotilla_core::UniqName;
use thiserror::Error;

use crate::executor::ReleaseState;

/// Execution engine errors
#[derive(Debug, Error, Clone)]
pub enum ExecError {
    // ============ Structural Errors ============
    #[error("Duplicate release: {uniq}")]
    DuplicateRelease { uniq: UniqName },

    #[error("Release {release} depends on {dependency} which is not in the plan")]
    UnresolvedDependency {
        release: UniqName,
        dependency: UniqName,
    },

    #[error("Dependency cycle detected: {}", display_cycle(.members))]
    DependencyCycle { members: Vec<UniqName> },

    // ============ Execution Errors ============
    #[error("Dependency {dependency} failed")]
    DependencyFailed { dependency: UniqName },

    #[error("Timed out after {}s", .timeout.as_secs())]
    Timeout { timeout: Duration },

    #[error("Release is stuck in state {state}")]
    PendingRelease { state: ReleaseState },

    #[error("Executor error: {message}")]
    Executor { message: String },

    #[error("Cancelled")]
    Cancelled,
}

fn display_cycle(members: &[UniqName]) -> String {
    members
        .iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type for execution operations
pub type Result<T> = std::result::Result<T, ExecError>;
