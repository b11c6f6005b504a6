//! Content-addressed cache key

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

const MIN_LEN: usize = 8;
const MAX_LEN: usize = 128;

/// A filesystem-safe digest addressing one cached artifact
///
/// Only ASCII alphanumerics, `-` and `_` are accepted so the key can be used
/// verbatim as a file stem inside the artifact directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey(String);

impl CacheKey {
    /// Validate and wrap a digest
    pub fn parse(digest: impl Into<String>) -> Result<Self, DomainError> {
        let digest = digest.into();
        let digest = digest.trim();

        if digest.len() < MIN_LEN || digest.len() > MAX_LEN {
            return Err(DomainError::InvalidCacheKey(format!(
                "length {} not in {MIN_LEN}..={MAX_LEN}",
                digest.len()
            )));
        }

        if !digest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidCacheKey(digest.to_string()));
        }

        Ok(Self(digest.to_string()))
    }

    /// The raw digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name for this key with the given extension
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CacheKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
