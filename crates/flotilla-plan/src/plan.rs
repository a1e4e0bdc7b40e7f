//! Plan assembly
//!
//! A plan is the fully validated set of releases plus repository and registry
//! metadata for one deployment run. It is built once from a plan file and is
//! read-only afterwards; duplicate identities, malformed repositories and
//! unknown fields are all rejected here, before anything executes.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use semver::Version;
use serde::{Deserialize, Serialize};

use flotilla_core::{Release, ReleaseConfig, UniqName};

use crate::error::{PlanError, Result};
use crate::registry::Registry;
use crate::repository::Repository;

/// Raw plan file schema.
///
/// Unknown fields and duplicate keys are rejected at parse time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanBody {
    /// Project name (reserved)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project: String,

    /// Version of flotilla the plan was written for
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Chart repositories
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<Repository>,

    /// OCI registries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registries: Vec<Registry>,

    /// Releases to deploy
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub releases: Vec<ReleaseConfig>,
}

/// A validated plan: resolved releases plus repository/registry metadata.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Project name (reserved)
    pub project: String,

    /// Declared plan version
    pub version: String,

    /// Chart repositories
    pub repositories: Vec<Repository>,

    /// OCI registries
    pub registries: Vec<Registry>,

    /// Resolved releases in declaration order
    pub releases: Vec<Release>,
}

impl Plan {
    /// Load and validate a plan from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a plan from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let body: PlanBody = serde_yaml::from_str(yaml)?;
        Self::from_body(body)
    }

    /// Validate a parsed plan body.
    pub fn from_body(body: PlanBody) -> Result<Self> {
        if !body.version.is_empty() {
            check_version(&body.version);
        }

        let mut repo_names = HashSet::new();
        for repo in &body.repositories {
            repo.validate()?;
            if !repo_names.insert(repo.name.clone()) {
                return Err(PlanError::DuplicateRepository {
                    name: repo.name.clone(),
                });
            }
        }

        let mut registry_hosts = HashSet::new();
        for registry in &body.registries {
            registry.validate()?;
            if !registry_hosts.insert(registry.host.clone()) {
                return Err(PlanError::DuplicateRegistry {
                    host: registry.host.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        let mut releases = Vec::with_capacity(body.releases.len());
        for config in &body.releases {
            let release = config.resolve()?;
            if !seen.insert(release.uniq.clone()) {
                return Err(PlanError::DuplicateRelease { uniq: release.uniq });
            }
            releases.push(release);
        }

        Ok(Self {
            project: body.project,
            version: body.version,
            repositories: body.repositories,
            registries: body.registries,
            releases,
        })
    }

    /// Restrict the plan to releases matching any of the given tags, plus
    /// their transitive dependencies. An empty tag list keeps everything.
    pub fn with_tags(&self, tags: &[String]) -> Self {
        if tags.is_empty() {
            return self.clone();
        }

        let by_uniq: HashMap<&UniqName, &Release> =
            self.releases.iter().map(|r| (&r.uniq, r)).collect();

        let mut wanted: HashSet<UniqName> = self
            .releases
            .iter()
            .filter(|r| r.has_any_tag(tags))
            .map(|r| r.uniq.clone())
            .collect();

        // Pull in dependencies of everything selected. References that point
        // outside the plan are left for the graph builder to report.
        let mut queue: Vec<UniqName> = wanted.iter().cloned().collect();
        while let Some(uniq) = queue.pop() {
            let Some(release) = by_uniq.get(&uniq) else {
                continue;
            };
            for dep in &release.depends_on {
                if wanted.insert(dep.clone()) {
                    queue.push(dep.clone());
                }
            }
        }

        let releases = self
            .releases
            .iter()
            .filter(|r| wanted.contains(&r.uniq))
            .cloned()
            .collect();

        Self {
            project: self.project.clone(),
            version: self.version.clone(),
            repositories: self.repositories.clone(),
            registries: self.registries.clone(),
            releases,
        }
    }

    /// Look up a release by exact identity.
    pub fn release(&self, uniq: &UniqName) -> Option<&Release> {
        self.releases.iter().find(|r| &r.uniq == uniq)
    }

    /// Resolve a possibly short reference against the plan.
    ///
    /// A qualified `name@namespace` must match exactly. A bare name matches
    /// at most one release; more than one match across namespaces is an
    /// error the caller has to disambiguate.
    pub fn find(&self, reference: &str) -> Result<&Release> {
        if reference.contains(flotilla_core::uniqname::SEPARATOR) {
            let uniq: UniqName =
                reference
                    .parse()
                    .map_err(|_| PlanError::ReleaseNotFound {
                        reference: reference.to_string(),
                    })?;
            return self.release(&uniq).ok_or_else(|| PlanError::ReleaseNotFound {
                reference: reference.to_string(),
            });
        }

        let matches: Vec<&Release> = self
            .releases
            .iter()
            .filter(|r| r.name() == reference)
            .collect();

        match matches.as_slice() {
            [] => Err(PlanError::ReleaseNotFound {
                reference: reference.to_string(),
            }),
            [release] => Ok(release),
            _ => Err(PlanError::MultipleReleasesFound {
                reference: reference.to_string(),
                matches: matches.iter().map(|r| r.uniq.to_string()).collect(),
            }),
        }
    }

    /// Number of releases in the plan.
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    /// Check if the plan has no releases.
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}

// The declared plan version is advisory: a plan written for a newer flotilla
// gets a warning, not an error.
fn check_version(declared: &str) {
    let current = env!("CARGO_PKG_VERSION");
    match (Version::parse(declared), Version::parse(current)) {
        (Ok(declared_version), Ok(current_version)) => {
            if declared_version > current_version {
                tracing::warn!(
                    declared = %declared_version,
                    current = %current_version,
                    "plan was written for a newer flotilla"
                );
            }
        }
        (Err(err), _) => {
            tracing::warn!(version = declared, error = %err, "unparseable plan version");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"
project: demo
repositories:
  - name: bitnami
    url: https://charts.bitnami.com/bitnami
registries:
  - host: ghcr.io
releases:
  - name: postgres
    namespace: db
    chart: bitnami/postgresql
    tags: [backend]
  - name: app
    namespace: prod
    chart: my/app
    depends_on: [postgres@db]
    tags: [frontend]
  - name: worker
    namespace: prod
    chart: my/worker
    depends_on: [app]
    tags: [backend]
"#;

    #[test]
    fn test_parse_and_resolve() {
        let plan = Plan::from_yaml(PLAN).unwrap();
        assert_eq!(plan.project, "demo");
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.repositories.len(), 1);
        assert_eq!(plan.registries.len(), 1);

        let worker = plan.find("worker").unwrap();
        assert_eq!(worker.depends_on[0].to_string(), "app@prod");
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let err = Plan::from_yaml("releases: []\nextra: 1\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_duplicate_top_level_key_rejected() {
        let err = Plan::from_yaml("project: a\nproject: b\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_duplicate_release_identity() {
        let err = Plan::from_yaml(
            r#"
releases:
  - name: app
    namespace: prod
    chart: my/app
  - name: app
    namespace: prod
    chart: other/app
"#,
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::DuplicateRelease { .. }));
    }

    #[test]
    fn test_same_name_different_namespace_is_fine() {
        let plan = Plan::from_yaml(
            r#"
releases:
  - name: app
    namespace: staging
    chart: my/app
  - name: app
    namespace: prod
    chart: my/app
"#,
        )
        .unwrap();
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_duplicate_repository() {
        let err = Plan::from_yaml(
            r#"
repositories:
  - name: bitnami
    url: https://charts.bitnami.com/bitnami
  - name: bitnami
    url: https://other.example.com
"#,
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::DuplicateRepository { .. }));
    }

    #[test]
    fn test_with_tags_includes_dependencies() {
        let plan = Plan::from_yaml(PLAN).unwrap();

        // frontend selects app, which drags in postgres@db transitively
        let filtered = plan.with_tags(&["frontend".to_string()]);
        let names: Vec<String> = filtered.releases.iter().map(|r| r.uniq.to_string()).collect();
        assert_eq!(names, vec!["postgres@db", "app@prod"]);
    }

    #[test]
    fn test_with_tags_empty_keeps_all() {
        let plan = Plan::from_yaml(PLAN).unwrap();
        assert_eq!(plan.with_tags(&[]).len(), 3);
    }

    #[test]
    fn test_find_qualified_and_bare() {
        let plan = Plan::from_yaml(PLAN).unwrap();

        assert_eq!(plan.find("app@prod").unwrap().name(), "app");
        assert_eq!(plan.find("postgres").unwrap().namespace(), "db");

        assert!(matches!(
            plan.find("ghost"),
            Err(PlanError::ReleaseNotFound { .. })
        ));
    }

    #[test]
    fn test_find_ambiguous_bare_name() {
        let plan = Plan::from_yaml(
            r#"
releases:
  - name: app
    namespace: staging
    chart: my/app
  - name: app
    namespace: prod
    chart: my/app
"#,
        )
        .unwrap();

        assert!(matches!(
            plan.find("app"),
            Err(PlanError::MultipleReleasesFound { .. })
        ));
        assert_eq!(plan.find("app@prod").unwrap().namespace(), "prod");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flotilla.yml");
        std::fs::write(&path, PLAN).unwrap();

        let plan = Plan::from_file(&path).unwrap();
        assert_eq!(plan.len(), 3);
    }
}
