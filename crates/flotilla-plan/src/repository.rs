//! Chart repository metadata
//!
//! Repositories are declared in the plan file and handed to the release
//! executor as-is; flotilla only validates their shape.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

/// A chart repository declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Repository {
    /// Unique name for this repository
    pub name: String,

    /// Repository URL (HTTP(S) or OCI)
    pub url: String,

    /// Username for basic auth (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for basic auth (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// CA bundle for TLS verification (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<PathBuf>,

    /// Skip TLS verification (insecure, not recommended)
    #[serde(default)]
    pub insecure_skip_tls: bool,
}

impl Repository {
    /// Validate the declaration.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PlanError::InvalidRepositoryUrl {
                url: self.url.clone(),
                reason: "repository name must not be empty".to_string(),
            });
        }

        if self.url.starts_with("http://")
            || self.url.starts_with("https://")
            || self.url.starts_with("oci://")
        {
            Ok(())
        } else {
            Err(PlanError::InvalidRepositoryUrl {
                url: self.url.clone(),
                reason: "URL must start with http://, https://, or oci://".to_string(),
            })
        }
    }

    /// Check if this is an OCI repository
    pub fn is_oci(&self) -> bool {
        self.url.starts_with("oci://")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str, url: &str) -> Repository {
        Repository {
            name: name.to_string(),
            url: url.to_string(),
            username: None,
            password: None,
            ca_bundle: None,
            insecure_skip_tls: false,
        }
    }

    #[test]
    fn test_url_validation() {
        assert!(repo("bitnami", "https://charts.bitnami.com/bitnami").validate().is_ok());
        assert!(repo("local", "http://localhost:8879").validate().is_ok());
        assert!(repo("ghcr", "oci://ghcr.io/myorg/charts").validate().is_ok());
        assert!(repo("bad", "ftp://example.com").validate().is_err());
        assert!(repo("", "https://example.com").validate().is_err());
    }

    #[test]
    fn test_is_oci() {
        assert!(repo("ghcr", "oci://ghcr.io/myorg/charts").is_oci());
        assert!(!repo("bitnami", "https://charts.bitnami.com/bitnami").is_oci());
    }
}
