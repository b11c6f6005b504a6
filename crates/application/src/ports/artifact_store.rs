//! Artifact store port - content-addressed cache of generated output

use async_trait::async_trait;
use domain::{Artifact, CacheKey};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for the flat artifact cache
///
/// Entries are immutable once written. Writers of the same key always carry
/// identical content, so implementations need no write exclusion as long as
/// a reader never observes a partial file.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Look up an artifact; text wins when both kinds exist
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Artifact>, ApplicationError>;

    /// Store an artifact under `key`, replacing any identical predecessor
    async fn write(&self, key: &CacheKey, artifact: &Artifact) -> Result<(), ApplicationError>;
}
