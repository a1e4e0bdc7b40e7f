//! Execution results
//!
//! One `ExecutionResult` per release, written exactly once when the release
//! reaches a terminal state, aggregated into a `PlanResult` when the run
//! completes. Every non-succeeded release carries its error.

use chrono::{DateTime, Utc};

use flotilla_core::UniqName;

use crate::error::ExecError;

/// Terminal outcome of one release.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The executor reported success
    Succeeded,
    /// The executor failed, or the operation timed out
    Failed(ExecError),
    /// Never dispatched: a required dependency failed, or the run was cancelled
    Skipped(ExecError),
}

impl Outcome {
    /// Check if this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// The attached error, if any.
    pub fn error(&self) -> Option<&ExecError> {
        match self {
            Self::Succeeded => None,
            Self::Failed(err) | Self::Skipped(err) => Some(err),
        }
    }

    /// Short state label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::Skipped(_) => "skipped",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(err) => write!(f, "failed: {err}"),
            Self::Skipped(err) => write!(f, "skipped: {err}"),
        }
    }
}

/// Terminal record for one release.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Release identity
    pub uniq: UniqName,

    /// Terminal outcome
    pub outcome: Outcome,

    /// When the release was considered for dispatch
    pub started_at: DateTime<Utc>,

    /// When the release reached its terminal state
    pub finished_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Wall-clock duration of the release operation.
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Aggregated result of one plan run.
#[derive(Debug, Clone)]
pub struct PlanResult {
    /// Per-release results, sorted by canonical identity
    pub results: Vec<ExecutionResult>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl PlanResult {
    /// Result for a specific release.
    pub fn get(&self, uniq: &UniqName) -> Option<&ExecutionResult> {
        self.results.iter().find(|r| &r.uniq == uniq)
    }

    /// Releases that succeeded.
    pub fn succeeded(&self) -> Vec<&ExecutionResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Succeeded))
            .collect()
    }

    /// Releases that failed.
    pub fn failed(&self) -> Vec<&ExecutionResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Failed(_)))
            .collect()
    }

    /// Releases that were skipped.
    pub fn skipped(&self) -> Vec<&ExecutionResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Skipped(_)))
            .collect()
    }

    /// Check if every release succeeded.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_success())
    }

    /// Human-readable per-release listing.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "{} succeeded, {} failed, {} skipped",
            self.succeeded().len(),
            self.failed().len(),
            self.skipped().len()
        )];

        for result in &self.results {
            lines.push(format!("  {} {}", result.uniq, result.outcome));
        }

        lines.join("\n")
    }
}
