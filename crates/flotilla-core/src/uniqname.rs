//! Canonical release identifiers
//!
//! Every release is addressed by its unique name, the pair of release name
//! and namespace rendered as `name@namespace`. The canonical string is the
//! identity: equality, ordering and hashing all compare it directly, and a
//! `UniqName` is immutable once generated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Separator between name and namespace in the canonical form.
pub const SEPARATOR: char = '@';

/// Canonical `name@namespace` identifier for a release.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UniqName(String);

impl UniqName {
    /// Generate a unique name from a release name and namespace.
    pub fn new(name: &str, namespace: &str) -> Result<Self> {
        validate_part(name, "name")?;
        validate_part(namespace, "namespace")?;

        Ok(Self(format!("{name}{SEPARATOR}{namespace}")))
    }

    /// Resolve a dependency reference against a default namespace.
    ///
    /// Accepts either a bare release name (`redis`) or an already qualified
    /// reference (`redis@cache`). Bare names take the default namespace.
    pub fn with_default_namespace(reference: &str, default_namespace: &str) -> Result<Self> {
        if reference.contains(SEPARATOR) {
            reference.parse()
        } else {
            Self::new(reference, default_namespace)
        }
    }

    /// Release name part.
    pub fn name(&self) -> &str {
        // new() guarantees exactly one separator
        self.0.split_once(SEPARATOR).map(|(n, _)| n).unwrap_or(&self.0)
    }

    /// Namespace part.
    pub fn namespace(&self) -> &str {
        self.0.split_once(SEPARATOR).map(|(_, ns)| ns).unwrap_or("")
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_part(part: &str, what: &str) -> Result<()> {
    if part.is_empty() {
        return Err(CoreError::InvalidIdentity {
            input: part.to_string(),
            reason: format!("{what} must not be empty"),
        });
    }

    if part.contains(SEPARATOR) {
        return Err(CoreError::InvalidIdentity {
            input: part.to_string(),
            reason: format!("{what} must not contain '{SEPARATOR}'"),
        });
    }

    Ok(())
}

impl fmt::Display for UniqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UniqName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, namespace) = s.split_once(SEPARATOR).ok_or_else(|| CoreError::InvalidIdentity {
            input: s.to_string(),
            reason: format!("expected 'name{SEPARATOR}namespace'"),
        })?;

        Self::new(name, namespace)
    }
}

impl TryFrom<String> for UniqName {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<UniqName> for String {
    fn from(u: UniqName) -> Self {
        u.0
    }
}
