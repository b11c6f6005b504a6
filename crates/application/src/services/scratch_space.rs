//! Per-request scratch directories
//!
//! Inline voices and uploaded speech are materialized as files because the
//! synthesis worker reads them by path. Every request gets its own directory
//! named after its id plus a random suffix, created exclusively, because the
//! id may come from a client header. The directory is removed exactly once: by
//! [`ScratchSpace::cleanup`] on the normal path, or by `Drop` when the
//! request unwinds through an error or panic.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use domain::RequestId;
use tracing::{debug, warn};

use crate::error::ApplicationError;

/// Parent of all request scratch directories
#[derive(Debug, Clone)]
pub struct ScratchRoot {
    root: PathBuf,
}

impl ScratchRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create a fresh scratch directory for one request
    ///
    /// Never reuses an existing directory, even for a repeated request id.
    pub async fn create(&self, request_id: RequestId) -> Result<ScratchSpace, ApplicationError> {
        let mut attempt = 0;
        loop {
            let dir = self.root.join(format!("{request_id}-{}", random_suffix()));
            match tokio::fs::create_dir(&dir).await {
                Ok(()) => {
                    debug!(dir = %dir.display(), "Created scratch directory");
                    return Ok(ScratchSpace {
                        dir,
                        cleaned: false,
                    });
                },
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_CREATE_ATTEMPTS => {
                    attempt += 1;
                },
                Err(e) => {
                    return Err(ApplicationError::Internal(format!(
                        "Failed to create scratch directory {}: {e}",
                        dir.display()
                    )));
                },
            }
        }
    }
}

const MAX_CREATE_ATTEMPTS: u32 = 3;

/// Random tail of a fresh v7 UUID
fn random_suffix() -> String {
    let hex = RequestId::new().as_uuid().simple().to_string();
    hex[hex.len() - 12..].to_string()
}

/// Scratch directory owned by exactly one request
#[derive(Debug)]
pub struct ScratchSpace {
    dir: PathBuf,
    cleaned: bool,
}

impl ScratchSpace {
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to `name` inside the directory and return the full path
    pub async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, ApplicationError> {
        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            ApplicationError::Internal(format!("Failed to write {}: {e}", path.display()))
        })?;
        Ok(path)
    }

    /// Path for a file that a collaborator will create
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Remove the directory and everything in it
    pub async fn cleanup(mut self) {
        self.cleaned = true;
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => debug!(dir = %self.dir.display(), "Removed scratch directory"),
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => warn!(dir = %self.dir.display(), error = %e, "Failed to remove scratch directory"),
        }
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!(dir = %self.dir.display(), "Removed scratch directory on drop"),
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => warn!(dir = %self.dir.display(), error = %e, "Failed to remove scratch directory"),
        }
    }
}
