//! Artifact caching
//!
//! - `FileArtifactStore`: flat directory of `{key}.wav` / `{key}.txt` files

mod artifact_store;

pub use artifact_store::FileArtifactStore;
