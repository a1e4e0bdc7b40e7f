//! Mock executor for testing and dry runs
//!
//! Scripts per-release outcomes in memory, so scheduler behavior (waves,
//! failure propagation, timeouts) is observable without a cluster.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use flotilla_core::{Release, UniqName};

use crate::error::{ExecError, Result};
use crate::executor::{ReleaseExecutor, ReleaseState};

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone)]
pub struct OperationCounts {
    pub statuses: usize,
    pub installs: usize,
    pub upgrades: usize,
    pub rollbacks: usize,
    pub uninstalls: usize,
}

/// In-memory scripted executor
#[derive(Clone, Default)]
pub struct MockExecutor {
    /// Releases whose install/upgrade should fail
    failures: Arc<RwLock<HashMap<UniqName, String>>>,
    /// Pre-existing release states (None in status() for everything else)
    states: Arc<RwLock<HashMap<UniqName, ReleaseState>>>,
    /// Per-release artificial latency
    delays: Arc<RwLock<HashMap<UniqName, Duration>>>,
    /// Track operation counts for assertions
    counts: Arc<RwLock<OperationCounts>>,
    /// Concurrency tracking
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
}

impl MockExecutor {
    /// Create a new executor where every operation succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script install/upgrade of a release to fail.
    pub fn with_failure(self, uniq: &UniqName, message: impl Into<String>) -> Self {
        self.failures
            .write()
            .unwrap()
            .insert(uniq.clone(), message.into());
        self
    }

    /// Script the pre-existing state reported for a release.
    pub fn with_state(self, uniq: &UniqName, state: ReleaseState) -> Self {
        self.states.write().unwrap().insert(uniq.clone(), state);
        self
    }

    /// Add artificial latency to a release's install/upgrade.
    pub fn with_delay(self, uniq: &UniqName, delay: Duration) -> Self {
        self.delays.write().unwrap().insert(uniq.clone(), delay);
        self
    }

    /// Get operation counts for assertions.
    pub fn operation_counts(&self) -> OperationCounts {
        self.counts.read().unwrap().clone()
    }

    /// Highest number of concurrently running operations observed.
    pub fn max_concurrency(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    /// State currently recorded for a release.
    pub fn state_of(&self, uniq: &UniqName) -> Option<ReleaseState> {
        self.states.read().unwrap().get(uniq).copied()
    }

    async fn apply(&self, release: &Release) -> Result<()> {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(running, Ordering::SeqCst);

        let delay = self.delays.read().unwrap().get(&release.uniq).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.running.fetch_sub(1, Ordering::SeqCst);

        let failure = self.failures.read().unwrap().get(&release.uniq).cloned();
        match failure {
            Some(message) => {
                self.states
                    .write()
                    .unwrap()
                    .insert(release.uniq.clone(), ReleaseState::Failed);
                Err(ExecError::Executor { message })
            }
            None => {
                self.states
                    .write()
                    .unwrap()
                    .insert(release.uniq.clone(), ReleaseState::Deployed);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ReleaseExecutor for MockExecutor {
    async fn status(&self, release: &Release) -> Result<Option<ReleaseState>> {
        self.counts.write().unwrap().statuses += 1;
        Ok(self.states.read().unwrap().get(&release.uniq).copied())
    }

    async fn install(&self, release: &Release) -> Result<()> {
        self.counts.write().unwrap().installs += 1;
        self.apply(release).await
    }

    async fn upgrade(&self, release: &Release) -> Result<()> {
        self.counts.write().unwrap().upgrades += 1;
        self.apply(release).await
    }

    async fn rollback(&self, release: &Release) -> Result<()> {
        self.counts.write().unwrap().rollbacks += 1;
        self.states
            .write()
            .unwrap()
            .insert(release.uniq.clone(), ReleaseState::Deployed);
        Ok(())
    }

    async fn uninstall(&self, release: &Release) -> Result<()> {
        self.counts.write().unwrap().uninstalls += 1;
        self.states.write().unwrap().remove(&release.uniq);
        Ok(())
    }
}
