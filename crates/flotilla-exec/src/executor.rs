//! Release executor interface
//!
//! The scheduler never touches a cluster itself; all install/upgrade/status
//! mechanics go through this interface. `HelmExecutor` delegates to the helm
//! binary, `MockExecutor` scripts outcomes for tests and dry runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use flotilla_core::Release;

use crate::error::Result;

/// State of a deployed release as reported by the target environment.
///
/// Note: This enum is non-exhaustive - new variants may be added in future versions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ReleaseState {
    #[default]
    Unknown,
    Deployed,
    Uninstalled,
    Superseded,
    Failed,
    Uninstalling,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
}

impl ReleaseState {
    /// Check if the release is stuck in an in-progress state.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::PendingInstall | Self::PendingUpgrade | Self::PendingRollback | Self::Uninstalling
        )
    }
}

impl std::fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Deployed => "deployed",
            Self::Uninstalled => "uninstalled",
            Self::Superseded => "superseded",
            Self::Failed => "failed",
            Self::Uninstalling => "uninstalling",
            Self::PendingInstall => "pending-install",
            Self::PendingUpgrade => "pending-upgrade",
            Self::PendingRollback => "pending-rollback",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ReleaseState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "deployed" => Ok(Self::Deployed),
            "uninstalled" => Ok(Self::Uninstalled),
            "superseded" => Ok(Self::Superseded),
            "failed" => Ok(Self::Failed),
            "uninstalling" => Ok(Self::Uninstalling),
            "pending-install" => Ok(Self::PendingInstall),
            "pending-upgrade" => Ok(Self::PendingUpgrade),
            "pending-rollback" => Ok(Self::PendingRollback),
            _ => Err(format!("unknown release state: {}", s)),
        }
    }
}

/// Performs the actual release operations against a target environment.
///
/// Implementations own any serialization needed against the target (for
/// example two releases in the same namespace); the scheduler imposes no
/// locking of its own.
#[async_trait]
pub trait ReleaseExecutor: Send + Sync {
    /// Current state of the release, or `None` if it was never installed.
    async fn status(&self, release: &Release) -> Result<Option<ReleaseState>>;

    /// Install the release for the first time.
    async fn install(&self, release: &Release) -> Result<()>;

    /// Upgrade an existing release.
    async fn upgrade(&self, release: &Release) -> Result<()>;

    /// Roll a release back to its previous revision.
    async fn rollback(&self, release: &Release) -> Result<()>;

    /// Uninstall a release.
    async fn uninstall(&self, release: &Release) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_states() {
        assert!(ReleaseState::PendingInstall.is_pending());
        assert!(ReleaseState::PendingUpgrade.is_pending());
        assert!(ReleaseState::PendingRollback.is_pending());
        assert!(ReleaseState::Uninstalling.is_pending());
        assert!(!ReleaseState::Deployed.is_pending());
        assert!(!ReleaseState::Failed.is_pending());
    }

    #[test]
    fn test_state_round_trip() {
        for state in [
            ReleaseState::Deployed,
            ReleaseState::PendingInstall,
            ReleaseState::Uninstalling,
        ] {
            assert_eq!(state.to_string().parse::<ReleaseState>().unwrap(), state);
        }
        assert!("sideways".parse::<ReleaseState>().is_err());
    }
}
