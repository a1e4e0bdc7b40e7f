//! OCI registry metadata

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

/// An OCI registry declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registry {
    /// Registry host, optionally with port
    pub host: String,

    /// Username for login (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for login (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Allow plain HTTP
    #[serde(default)]
    pub insecure: bool,
}

impl Registry {
    /// Validate the declaration.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(PlanError::InvalidRegistry {
                message: "registry host must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
