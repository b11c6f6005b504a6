//! Flat-directory artifact store
//!
//! Artifacts live as `{key}.wav` or `{key}.txt` in a single directory shared
//! with the synthesis worker, which also evicts them. Writes go through a
//! temp file in the same directory and an atomic rename, so readers never
//! observe a partial artifact and concurrent writers of one key leave a
//! single complete file behind.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use application::{error::ApplicationError, ports::ArtifactStore};
use async_trait::async_trait;
use domain::{Artifact, CacheKey};
use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};

const TEXT_EXTENSION: &str = "txt";
const AUDIO_EXTENSION: &str = "wav";

/// Artifact store backed by a flat directory
pub struct FileArtifactStore {
    dir: PathBuf,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for FileArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileArtifactStore")
            .field("dir", &self.dir)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl FileArtifactStore {
    /// Open the store, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Configuration` if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ApplicationError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            ApplicationError::Configuration(format!(
                "cannot create artifact directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(Self {
            dir,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// (hits, misses) since startup
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    fn path_for(&self, key: &CacheKey, extension: &str) -> PathBuf {
        self.dir.join(key.file_name(extension))
    }

    async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, ApplicationError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ApplicationError::Internal(format!(
                "failed to read artifact {}: {e}",
                path.display()
            ))),
        }
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    #[instrument(skip(self), fields(key = %key))]
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Artifact>, ApplicationError> {
        // Text wins when both exist
        if let Some(bytes) = Self::read_optional(&self.path_for(key, TEXT_EXTENSION)).await? {
            match String::from_utf8(bytes) {
                Ok(text) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(Artifact::Text(text)));
                },
                Err(e) => warn!(error = %e, "Cached text is not UTF-8, ignoring"),
            }
        }

        if let Some(bytes) = Self::read_optional(&self.path_for(key, AUDIO_EXTENSION)).await? {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(Artifact::Audio(bytes)));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Artifact not cached");
        Ok(None)
    }

    #[instrument(skip(self, artifact), fields(key = %key, bytes = artifact.len()))]
    async fn write(&self, key: &CacheKey, artifact: &Artifact) -> Result<(), ApplicationError> {
        let dir = self.dir.clone();
        let target = self.path_for(key, artifact.extension());
        let bytes = artifact.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| ApplicationError::Internal(format!("artifact write task failed: {e}")))?
        .map_err(|e| ApplicationError::Internal(format!("failed to write artifact: {e}")))?;

        debug!("Artifact stored");
        Ok(())
    }
}
