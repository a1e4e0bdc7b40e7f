//! Wave-based execution scheduler
//!
//! Drives a release set through the executor wave by wave. All releases in a
//! wave are dispatched concurrently (optionally bounded by a worker limit);
//! the scheduler waits for every release in the wave to reach a terminal
//! state before the next wave starts. Failures propagate to transitive
//! dependents unless the failing release allows failure; unrelated branches
//! keep running.
//!
//! Per release the state machine is
//! `Pending -> Running -> {Succeeded, Failed} | Skipped`; every release ends
//! in exactly one terminal state, recorded exactly once.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tracing::Instrument;

use flotilla_core::{PendingStrategy, Release, UniqName};

use crate::error::{ExecError, Result};
use crate::executor::{ReleaseExecutor, ReleaseState};
use crate::graph::DependencyGraph;
use crate::result::{ExecutionResult, Outcome, PlanResult};

/// Wave-by-wave release scheduler.
pub struct Scheduler {
    executor: Arc<dyn ReleaseExecutor>,
    worker_limit: Option<usize>,
    cancel: watch::Receiver<bool>,
}

impl Scheduler {
    /// Create a scheduler with unbounded in-wave concurrency and no external
    /// cancellation signal.
    pub fn new(executor: Arc<dyn ReleaseExecutor>) -> Self {
        let (_tx, cancel) = watch::channel(false);
        Self {
            executor,
            worker_limit: None,
            cancel,
        }
    }

    /// Bound the number of releases running concurrently within a wave.
    pub fn with_worker_limit(mut self, limit: usize) -> Self {
        self.worker_limit = Some(limit);
        self
    }

    /// Attach an external cancellation signal. When the signal turns true no
    /// new waves are dispatched, in-flight releases abort, and everything
    /// non-terminal is recorded as skipped.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the release set to completion (or cancellation).
    ///
    /// Structural errors (duplicates, unresolved dependencies, cycles) abort
    /// before anything executes. Execution-time errors are recorded in the
    /// returned `PlanResult`, which is only produced after every schedulable
    /// wave has finished.
    pub async fn run(&self, releases: &[Release]) -> Result<PlanResult> {
        let graph = DependencyGraph::build(releases)?;
        let waves = graph.waves();
        let by_uniq: HashMap<&UniqName, &Release> =
            releases.iter().map(|r| (&r.uniq, r)).collect();

        let started_at = Utc::now();
        let mut results: BTreeMap<UniqName, ExecutionResult> = BTreeMap::new();

        tracing::info!(
            releases = releases.len(),
            waves = waves.len(),
            "starting deployment"
        );

        for (index, wave) in waves.iter().enumerate() {
            if self.is_cancelled() {
                break;
            }

            tracing::info!(wave = index + 1, releases = wave.len(), "dispatching wave");

            let mut tasks = Vec::with_capacity(wave.len());
            for uniq in wave.releases() {
                let release = by_uniq[uniq];
                match self.dependency_gate(release, &results, &by_uniq) {
                    Some(err) => {
                        tracing::warn!(release = %uniq, error = %err, "skipping release");
                        let now = Utc::now();
                        results.insert(
                            uniq.clone(),
                            ExecutionResult {
                                uniq: uniq.clone(),
                                outcome: Outcome::Skipped(err),
                                started_at: now,
                                finished_at: now,
                            },
                        );
                    }
                    None => tasks.push(self.run_release(release)),
                }
            }

            let limit = self.worker_limit.unwrap_or(tasks.len()).max(1);
            let wave_results: Vec<ExecutionResult> =
                stream::iter(tasks).buffer_unordered(limit).collect().await;
            for result in wave_results {
                results.insert(result.uniq.clone(), result);
            }
        }

        // Anything still without a terminal state was cut off by cancellation.
        for release in releases {
            if !results.contains_key(&release.uniq) {
                let now = Utc::now();
                results.insert(
                    release.uniq.clone(),
                    ExecutionResult {
                        uniq: release.uniq.clone(),
                        outcome: Outcome::Skipped(ExecError::Cancelled),
                        started_at: now,
                        finished_at: now,
                    },
                );
            }
        }

        Ok(PlanResult {
            results: results.into_values().collect(),
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    // A release may only run once all dependencies succeeded. A dependency
    // that failed or was skipped blocks it, unless that dependency allows
    // failure.
    fn dependency_gate(
        &self,
        release: &Release,
        results: &BTreeMap<UniqName, ExecutionResult>,
        by_uniq: &HashMap<&UniqName, &Release>,
    ) -> Option<ExecError> {
        for dep in &release.depends_on {
            let succeeded = matches!(
                results.get(dep).map(|r| &r.outcome),
                Some(Outcome::Succeeded)
            );
            let allow_failure = by_uniq.get(dep).map(|r| r.allow_failure).unwrap_or(false);

            if !succeeded && !allow_failure {
                return Some(ExecError::DependencyFailed {
                    dependency: dep.clone(),
                });
            }
        }

        None
    }

    async fn run_release(&self, release: &Release) -> ExecutionResult {
        let started_at = Utc::now();
        let timeout = release.timeout();
        let span = tracing::info_span!("release", uniq = %release.uniq);
        let work = self.execute(release).instrument(span);
        let mut cancel = self.cancel.clone();

        let outcome = tokio::select! {
            _ = cancelled(&mut cancel) => Outcome::Skipped(ExecError::Cancelled),
            result = tokio::time::timeout(timeout, work) => match result {
                Ok(Ok(())) => Outcome::Succeeded,
                Ok(Err(err)) => Outcome::Failed(err),
                Err(_) => Outcome::Failed(ExecError::Timeout { timeout }),
            },
        };

        ExecutionResult {
            uniq: release.uniq.clone(),
            outcome,
            started_at,
            finished_at: Utc::now(),
        }
    }

    // One executor round-trip for a single release: recover from a stuck
    // pending state if needed, then install or upgrade based on the current
    // state. No automatic retries; `atomic` is the executor's concern.
    async fn execute(&self, release: &Release) -> Result<()> {
        let mut current = self.executor.status(release).await?;

        if let Some(state) = current {
            if state.is_pending() {
                match release.pending_release_strategy {
                    PendingStrategy::Fail => {
                        return Err(ExecError::PendingRelease { state });
                    }
                    PendingStrategy::Rollback => {
                        tracing::warn!(state = %state, "rolling back stuck release");
                        self.executor.rollback(release).await?;
                        current = Some(ReleaseState::Deployed);
                    }
                    PendingStrategy::Uninstall => {
                        tracing::warn!(state = %state, "uninstalling stuck release");
                        self.executor.uninstall(release).await?;
                        current = None;
                    }
                }
            }
        }

        match current {
            None | Some(ReleaseState::Uninstalled) => {
                tracing::info!("installing");
                self.executor.install(release).await
            }
            Some(_) => {
                tracing::info!("upgrading");
                self.executor.upgrade(release).await
            }
        }
    }
}

// Resolves when the signal turns true; never resolves if the sender is gone
// without having cancelled.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if *rx.borrow() {
        return;
    }
    while rx.changed().await.is_ok() {
        if *rx.borrow() {
            return;
        }
    }
    std::future::pending::<()>().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use flotilla_core::ReleaseConfig;
    use std::time::Duration;

    fn release_yaml(yaml: &str) -> Release {
        serde_yaml::from_str::<ReleaseConfig>(yaml)
            .unwrap()
            .resolve()
            .unwrap()
    }

    fn release(name: &str, deps: &[&str]) -> Release {
        let deps_yaml = if deps.is_empty() {
            String::new()
        } else {
            format!("depends_on: [{}]\n", deps.join(", "))
        };
        release_yaml(&format!(
            "name: {name}\nnamespace: test\nchart: charts/{name}\n{deps_yaml}"
        ))
    }

    fn uniq(s: &str) -> UniqName {
        s.parse().unwrap()
    }

    fn diamond() -> Vec<Release> {
        vec![
            release("a", &[]),
            release("b", &["a"]),
            release("c", &["a"]),
            release("d", &["b", "c"]),
        ]
    }

    #[tokio::test]
    async fn test_diamond_all_succeed() {
        let executor = MockExecutor::new();
        let scheduler = Scheduler::new(Arc::new(executor.clone()));

        let result = scheduler.run(&diamond()).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.succeeded().len(), 4);
        assert_eq!(executor.operation_counts().installs, 4);
    }

    #[tokio::test]
    async fn test_failure_propagates_to_transitive_dependents() {
        let releases = diamond();
        let executor = MockExecutor::new().with_failure(&uniq("a@test"), "boom");
        let scheduler = Scheduler::new(Arc::new(executor.clone()));

        let result = scheduler.run(&releases).await.unwrap();

        assert!(matches!(
            result.get(&uniq("a@test")).unwrap().outcome,
            Outcome::Failed(_)
        ));
        for skipped in ["b@test", "c@test", "d@test"] {
            match &result.get(&uniq(skipped)).unwrap().outcome {
                Outcome::Skipped(ExecError::DependencyFailed { .. }) => {}
                other => panic!("{skipped}: expected dependency-failed skip, got {other}"),
            }
        }

        // b, c and d never reached the executor
        assert_eq!(executor.operation_counts().installs, 1);
    }

    #[tokio::test]
    async fn test_allow_failure_stops_propagation() {
        let mut releases = diamond();
        releases[0] = release_yaml(
            "name: a\nnamespace: test\nchart: charts/a\nallow_failure: true\n",
        );

        let executor = MockExecutor::new().with_failure(&uniq("a@test"), "boom");
        let scheduler = Scheduler::new(Arc::new(executor.clone()));

        let result = scheduler.run(&releases).await.unwrap();

        assert!(matches!(
            result.get(&uniq("a@test")).unwrap().outcome,
            Outcome::Failed(_)
        ));
        for dispatched in ["b@test", "c@test", "d@test"] {
            assert!(
                result.get(&uniq(dispatched)).unwrap().outcome.is_success(),
                "{dispatched} should have run"
            );
        }
        assert_eq!(executor.operation_counts().installs, 4);
    }

    #[tokio::test]
    async fn test_independent_branch_unaffected_by_failure() {
        let releases = vec![
            release("a", &[]),
            release("b", &["a"]),
            release("c", &[]),
        ];
        let executor = MockExecutor::new().with_failure(&uniq("a@test"), "boom");
        let scheduler = Scheduler::new(Arc::new(executor));

        let result = scheduler.run(&releases).await.unwrap();

        assert!(matches!(
            result.get(&uniq("b@test")).unwrap().outcome,
            Outcome::Skipped(_)
        ));
        assert!(result.get(&uniq("c@test")).unwrap().outcome.is_success());
    }

    #[tokio::test]
    async fn test_structural_error_aborts_before_execution() {
        let releases = vec![release("e", &["ghost"])];
        let executor = MockExecutor::new();
        let scheduler = Scheduler::new(Arc::new(executor.clone()));

        let err = scheduler.run(&releases).await.unwrap_err();

        assert!(matches!(err, ExecError::UnresolvedDependency { .. }));
        assert_eq!(executor.operation_counts().installs, 0);
        assert_eq!(executor.operation_counts().statuses, 0);
    }

    #[tokio::test]
    async fn test_timeout_fails_the_release() {
        let releases = vec![release_yaml(
            "name: slow\nnamespace: test\nchart: charts/slow\ntimeout: 50ms\n",
        )];
        let executor =
            MockExecutor::new().with_delay(&uniq("slow@test"), Duration::from_secs(10));
        let scheduler = Scheduler::new(Arc::new(executor));

        let result = scheduler.run(&releases).await.unwrap();

        match &result.get(&uniq("slow@test")).unwrap().outcome {
            Outcome::Failed(ExecError::Timeout { .. }) => {}
            other => panic!("expected timeout failure, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_upgrade_when_already_deployed() {
        let releases = vec![release("app", &[])];
        let executor =
            MockExecutor::new().with_state(&uniq("app@test"), ReleaseState::Deployed);
        let scheduler = Scheduler::new(Arc::new(executor.clone()));

        scheduler.run(&releases).await.unwrap();

        let counts = executor.operation_counts();
        assert_eq!(counts.installs, 0);
        assert_eq!(counts.upgrades, 1);
    }

    #[tokio::test]
    async fn test_pending_strategy_fail() {
        let releases = vec![release("app", &[])];
        let executor =
            MockExecutor::new().with_state(&uniq("app@test"), ReleaseState::PendingUpgrade);
        let scheduler = Scheduler::new(Arc::new(executor.clone()));

        let result = scheduler.run(&releases).await.unwrap();

        match &result.get(&uniq("app@test")).unwrap().outcome {
            Outcome::Failed(ExecError::PendingRelease { state }) => {
                assert_eq!(*state, ReleaseState::PendingUpgrade);
            }
            other => panic!("expected pending-release failure, got {other}"),
        }
        assert_eq!(executor.operation_counts().installs, 0);
        assert_eq!(executor.operation_counts().upgrades, 0);
    }

    #[tokio::test]
    async fn test_pending_strategy_rollback_then_upgrade() {
        let releases = vec![release_yaml(
            "name: app\nnamespace: test\nchart: charts/app\npending_release_strategy: rollback\n",
        )];
        let executor =
            MockExecutor::new().with_state(&uniq("app@test"), ReleaseState::PendingUpgrade);
        let scheduler = Scheduler::new(Arc::new(executor.clone()));

        let result = scheduler.run(&releases).await.unwrap();

        assert!(result.is_success());
        let counts = executor.operation_counts();
        assert_eq!(counts.rollbacks, 1);
        assert_eq!(counts.upgrades, 1);
        assert_eq!(counts.installs, 0);
    }

    #[tokio::test]
    async fn test_pending_strategy_uninstall_then_install() {
        let releases = vec![release_yaml(
            "name: app\nnamespace: test\nchart: charts/app\npending_release_strategy: uninstall\n",
        )];
        let executor =
            MockExecutor::new().with_state(&uniq("app@test"), ReleaseState::PendingInstall);
        let scheduler = Scheduler::new(Arc::new(executor.clone()));

        let result = scheduler.run(&releases).await.unwrap();

        assert!(result.is_success());
        let counts = executor.operation_counts();
        assert_eq!(counts.uninstalls, 1);
        assert_eq!(counts.installs, 1);
        assert_eq!(counts.upgrades, 0);
    }

    #[tokio::test]
    async fn test_cancel_before_run_skips_everything() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let executor = MockExecutor::new();
        let scheduler = Scheduler::new(Arc::new(executor.clone())).with_cancel(rx);

        let result = scheduler.run(&diamond()).await.unwrap();

        assert_eq!(result.skipped().len(), 4);
        for r in &result.results {
            assert!(matches!(r.outcome, Outcome::Skipped(ExecError::Cancelled)));
        }
        assert_eq!(executor.operation_counts().installs, 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_run_aborts_in_flight_and_later_waves() {
        let releases = vec![release("a", &[]), release("b", &["a"])];
        let executor =
            MockExecutor::new().with_delay(&uniq("a@test"), Duration::from_secs(30));
        let (tx, rx) = watch::channel(false);

        let scheduler = Scheduler::new(Arc::new(executor.clone())).with_cancel(rx);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(true);
        });

        let result = scheduler.run(&releases).await.unwrap();

        assert!(matches!(
            result.get(&uniq("a@test")).unwrap().outcome,
            Outcome::Skipped(ExecError::Cancelled)
        ));
        assert!(matches!(
            result.get(&uniq("b@test")).unwrap().outcome,
            Outcome::Skipped(ExecError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_worker_limit_bounds_in_wave_concurrency() {
        let releases: Vec<Release> = (0..4)
            .map(|i| release(&format!("r{i}"), &[]))
            .collect();

        let mut executor = MockExecutor::new();
        for r in &releases {
            executor = executor.with_delay(&r.uniq, Duration::from_millis(50));
        }

        let scheduler = Scheduler::new(Arc::new(executor.clone())).with_worker_limit(2);
        let result = scheduler.run(&releases).await.unwrap();

        assert!(result.is_success());
        assert!(
            executor.max_concurrency() <= 2,
            "observed {} concurrent operations",
            executor.max_concurrency()
        );
    }

    async fn run_once(releases: &[Release]) -> Vec<String> {
        let executor = MockExecutor::new().with_failure(&uniq("b@test"), "boom");
        let scheduler = Scheduler::new(Arc::new(executor));
        let result = scheduler.run(releases).await.unwrap();
        result
            .results
            .iter()
            .map(|r| format!("{} {}", r.uniq, r.outcome.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn test_runs_are_deterministic() {
        let releases = diamond();
        assert_eq!(run_once(&releases).await, run_once(&releases).await);
    }
}
