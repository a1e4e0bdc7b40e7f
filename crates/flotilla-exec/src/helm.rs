//! Helm executor
//!
//! Thin delegation layer that drives the `helm` binary. It translates a
//! release into helm arguments and reports outcomes back; chart fetching,
//! authentication and rendering all stay on helm's side.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use flotilla_core::Release;

use crate::error::{ExecError, Result};
use crate::executor::{ReleaseExecutor, ReleaseState};

/// Executor backed by the helm CLI.
pub struct HelmExecutor {
    binary: String,
}

impl HelmExecutor {
    /// Use `helm` from PATH.
    pub fn new() -> Self {
        Self {
            binary: "helm".to_string(),
        }
    }

    /// Use a specific helm binary.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<String> {
        tracing::debug!(?args, "invoking helm");

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|err| ExecError::Executor {
                message: format!("failed to spawn {}: {}", self.binary, err),
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(ExecError::Executor {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl Default for HelmExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn install_args(release: &Release) -> Vec<String> {
    let mut args = vec![
        "install".to_string(),
        release.name().to_string(),
        release.chart.name.clone(),
        "--namespace".to_string(),
        release.namespace().to_string(),
        "--wait".to_string(),
        "--timeout".to_string(),
        format!("{}s", release.timeout().as_secs()),
    ];

    if let Some(version) = &release.chart.version {
        args.push("--version".to_string());
        args.push(version.clone());
    }
    if release.atomic {
        args.push("--atomic".to_string());
    }
    if release.create_namespace {
        args.push("--create-namespace".to_string());
    }
    if !release.description.is_empty() {
        args.push("--description".to_string());
        args.push(release.description.clone());
    }

    args
}

fn upgrade_args(release: &Release) -> Vec<String> {
    let mut args = vec![
        "upgrade".to_string(),
        release.name().to_string(),
        release.chart.name.clone(),
        "--namespace".to_string(),
        release.namespace().to_string(),
        "--wait".to_string(),
        "--timeout".to_string(),
        format!("{}s", release.timeout().as_secs()),
    ];

    if let Some(version) = &release.chart.version {
        args.push("--version".to_string());
        args.push(version.clone());
    }
    if release.atomic {
        args.push("--atomic".to_string());
    }
    if let Some(max_history) = release.max_history {
        args.push("--history-max".to_string());
        args.push(max_history.to_string());
    }
    if !release.description.is_empty() {
        args.push("--description".to_string());
        args.push(release.description.clone());
    }

    args
}

#[derive(Deserialize)]
struct HelmStatus {
    info: HelmStatusInfo,
}

#[derive(Deserialize)]
struct HelmStatusInfo {
    status: String,
}

#[async_trait]
impl ReleaseExecutor for HelmExecutor {
    async fn status(&self, release: &Release) -> Result<Option<ReleaseState>> {
        let args = vec![
            "status".to_string(),
            release.name().to_string(),
            "--namespace".to_string(),
            release.namespace().to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];

        match self.run(&args).await {
            Ok(stdout) => {
                let status: HelmStatus =
                    serde_json::from_str(&stdout).map_err(|err| ExecError::Executor {
                        message: format!("unparseable helm status: {err}"),
                    })?;
                let state = status
                    .info
                    .status
                    .parse()
                    .unwrap_or(ReleaseState::Unknown);
                Ok(Some(state))
            }
            Err(ExecError::Executor { message }) if message.contains("not found") => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn install(&self, release: &Release) -> Result<()> {
        self.run(&install_args(release)).await.map(|_| ())
    }

    async fn upgrade(&self, release: &Release) -> Result<()> {
        self.run(&upgrade_args(release)).await.map(|_| ())
    }

    async fn rollback(&self, release: &Release) -> Result<()> {
        let args = vec![
            "rollback".to_string(),
            release.name().to_string(),
            "--namespace".to_string(),
            release.namespace().to_string(),
            "--wait".to_string(),
        ];
        self.run(&args).await.map(|_| ())
    }

    async fn uninstall(&self, release: &Release) -> Result<()> {
        let args = vec![
            "uninstall".to_string(),
            release.name().to_string(),
            "--namespace".to_string(),
            release.namespace().to_string(),
        ];
        self.run(&args).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::ReleaseConfig;

    fn release(yaml: &str) -> Release {
        serde_yaml::from_str::<ReleaseConfig>(yaml)
            .unwrap()
            .resolve()
            .unwrap()
    }

    #[test]
    fn test_install_args() {
        let rel = release(
            r#"
name: redis
namespace: cache
chart:
  name: bitnami/redis
  version: 17.0.1
atomic: true
create_namespace: true
timeout: 10m
"#,
        );

        let args = install_args(&rel);
        assert_eq!(args[0], "install");
        assert_eq!(args[1], "redis");
        assert_eq!(args[2], "bitnami/redis");
        assert!(args.contains(&"--namespace".to_string()));
        assert!(args.contains(&"cache".to_string()));
        assert!(args.contains(&"--version".to_string()));
        assert!(args.contains(&"--atomic".to_string()));
        assert!(args.contains(&"--create-namespace".to_string()));
        assert!(args.contains(&"600s".to_string()));
    }

    #[test]
    fn test_upgrade_args_with_history() {
        let rel = release("name: app\nchart: my/app\nmax_history: 5\n");

        let args = upgrade_args(&rel);
        assert_eq!(args[0], "upgrade");
        assert!(args.contains(&"--history-max".to_string()));
        assert!(args.contains(&"5".to_string()));
        assert!(!args.contains(&"--atomic".to_string()));
    }

    #[test]
    fn test_status_json_parse() {
        let status: HelmStatus =
            serde_json::from_str(r#"{"info": {"status": "pending-upgrade"}}"#).unwrap();
        assert_eq!(
            status.info.status.parse::<ReleaseState>().unwrap(),
            ReleaseState::PendingUpgrade
        );
    }
}
