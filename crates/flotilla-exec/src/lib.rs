//! Flotilla Exec - the execution engine
//!
//! This crate turns a resolved release set into a running deployment:
//! - **Dependency Graph**: duplicate, unresolved-reference and cycle checks
//! - **Waves**: level-grouped topological order, computed once per plan
//! - **Scheduler**: barrier concurrency per wave, failure propagation,
//!   timeouts, pending-state recovery, cancellation
//! - **Executors**: the `ReleaseExecutor` interface, a helm CLI adapter and a
//!   scripted mock for tests and dry runs

pub mod error;
pub mod executor;
pub mod graph;
pub mod helm;
pub mod mock;
pub mod result;
pub mod scheduler;
pub mod waves;

pub use error::{ExecError, Result};
pub use executor::{ReleaseExecutor, ReleaseState};
pub use graph::DependencyGraph;
pub use helm::HelmExecutor;
pub use mock::{MockExecutor, OperationCounts};
pub use result::{ExecutionResult, Outcome, PlanResult};
pub use scheduler::Scheduler;
pub use waves::{Wave, WavePlan};
