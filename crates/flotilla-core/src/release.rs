//! Release model
//!
//! A release goes through two phases. `ReleaseConfig` is the raw declaration
//! as deserialized from the plan file. `ReleaseConfig::resolve` validates it
//! and freezes the derived values (identity, dependency identities) into a
//! `Release`, which never changes afterwards. Callers only ever see fully
//! resolved releases.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::uniqname::UniqName;

/// Default timeout for a single release operation (5 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

fn default_namespace() -> String {
    "default".to_string()
}

/// Chart reference: name plus optional version constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chart {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// A chart may be declared as a bare string (`chart: bitnami/redis`) or as a
// mapping with an explicit version.
impl<'de> Deserialize<'de> for Chart {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Name(String),
            Full {
                name: String,
                #[serde(default)]
                version: Option<String>,
            },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Name(name) => Ok(Chart { name, version: None }),
            Repr::Full { name, version } => Ok(Chart { name, version }),
        }
    }
}

/// What to do with a release found stuck in a pending state from a previous
/// run, before a new install/upgrade is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PendingStrategy {
    /// Fail the release (default)
    #[default]
    Fail,

    /// Roll back to the previous revision, then proceed
    Rollback,

    /// Uninstall the stuck release, then proceed with a fresh install
    Uninstall,
}

impl std::fmt::Display for PendingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::Rollback => write!(f, "rollback"),
            Self::Uninstall => write!(f, "uninstall"),
        }
    }
}

impl std::str::FromStr for PendingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "rollback" => Ok(Self::Rollback),
            "uninstall" => Ok(Self::Uninstall),
            _ => Err(format!("unknown pending release strategy: {}", s)),
        }
    }
}

/// Raw release declaration from the plan file.
///
/// Unknown fields are rejected at parse time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Release name
    pub name: String,

    /// Target namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Free-form description, recorded with the deployed release
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Chart to install
    pub chart: Chart,

    /// Dependency references: bare names or `name@namespace`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Tags for plan filtering
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Do not propagate this release's failure to its dependents
    #[serde(default)]
    pub allow_failure: bool,

    /// Roll back on partial failure
    #[serde(default)]
    pub atomic: bool,

    /// Create the target namespace if it does not exist
    #[serde(default)]
    pub create_namespace: bool,

    /// How to handle a release stuck in a pending state
    #[serde(default)]
    pub pending_release_strategy: PendingStrategy,

    /// Operation timeout (e.g. `5m`, `300s`)
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// Maximum number of stored revisions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_history: Option<u32>,
}

impl ReleaseConfig {
    /// Validate the declaration and freeze derived values.
    ///
    /// The identity is generated once from name and namespace. Dependency
    /// references are resolved once against this release's own namespace;
    /// a reference that cannot be parsed is dropped with a diagnostic rather
    /// than failing the release. (References to releases that do not exist
    /// are caught later, at graph build, and are fatal there.)
    pub fn resolve(&self) -> Result<Release> {
        if self.chart.name.trim().is_empty() {
            return Err(CoreError::InvalidRelease {
                release: self.name.clone(),
                message: "chart name is required".to_string(),
            });
        }

        let uniq = UniqName::new(&self.name, &self.namespace)?;

        let mut depends_on = Vec::with_capacity(self.depends_on.len());
        for reference in &self.depends_on {
            match UniqName::with_default_namespace(reference, &self.namespace) {
                Ok(dep) => depends_on.push(dep),
                Err(err) => {
                    tracing::warn!(
                        release = %uniq,
                        dependency = %reference,
                        error = %err,
                        "dropping malformed dependency reference"
                    );
                }
            }
        }

        Ok(Release {
            uniq,
            description: self.description.clone(),
            chart: self.chart.clone(),
            depends_on,
            tags: self.tags.clone(),
            allow_failure: self.allow_failure,
            atomic: self.atomic,
            create_namespace: self.create_namespace,
            pending_release_strategy: self.pending_release_strategy,
            timeout: self.timeout,
            max_history: self.max_history,
        })
    }
}

/// A validated release with frozen identity and dependency identities.
#[derive(Debug, Clone, Serialize)]
pub struct Release {
    /// Canonical identity
    pub uniq: UniqName,

    /// Free-form description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Chart to install
    pub chart: Chart,

    /// Resolved dependency identities
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<UniqName>,

    /// Tags for plan filtering
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Do not propagate this release's failure to its dependents
    pub allow_failure: bool,

    /// Roll back on partial failure
    pub atomic: bool,

    /// Create the target namespace if it does not exist
    pub create_namespace: bool,

    /// How to handle a release stuck in a pending state
    pub pending_release_strategy: PendingStrategy,

    /// Operation timeout override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Maximum number of stored revisions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_history: Option<u32>,
}

impl Release {
    /// Release name part of the identity.
    pub fn name(&self) -> &str {
        self.uniq.name()
    }

    /// Namespace part of the identity.
    pub fn namespace(&self) -> &str {
        self.uniq.namespace()
    }

    /// Effective operation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Check if this release carries any of the given tags.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.tags.contains(t))
    }
}
