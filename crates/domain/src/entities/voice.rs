//! Voice references: what the client asked for and what it resolved to

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entities::audio::{DecodedAudio, payload_digest};
use crate::errors::DomainError;
use crate::value_objects::DurationBounds;

/// Preset used when a request names no voice
pub const DEFAULT_VOICE: &str = "alloy";

/// How a request identifies the reference voice
#[derive(Clone, PartialEq, Eq)]
pub enum VoiceDescriptor {
    /// A named preset from the voice catalog
    NamedPreset(String),
    /// Base64 audio sent with the request
    InlineAudio {
        encoded: String,
        bounds: DurationBounds,
    },
    /// A file already present on this host
    FilePath(PathBuf),
}

impl VoiceDescriptor {
    /// A named preset
    pub fn preset(name: impl Into<String>) -> Self {
        Self::NamedPreset(name.into())
    }

    /// Inline audio validated against the voice-cloning window
    pub fn inline(encoded: impl Into<String>) -> Self {
        Self::InlineAudio {
            encoded: encoded.into(),
            bounds: DurationBounds::cloning_reference(),
        }
    }

    /// Stable identifier folded into the cache key
    ///
    /// Inline audio is identified by a digest of its decoded bytes, so the
    /// same recording yields the same id however its base64 is wrapped.
    pub fn identifier(&self) -> String {
        match self {
            Self::NamedPreset(name) => name.clone(),
            Self::InlineAudio { encoded, .. } => {
                let digest = payload_digest(encoded);
                format!("inline-{}", &digest.to_hex()[..16])
            },
            Self::FilePath(path) => format!("file:{}", path.display()),
        }
    }

    /// Decode inline audio and check its duration window
    ///
    /// Returns `None` for presets and file paths, which are checked by the
    /// resolver against the catalog and filesystem.
    pub fn decode_inline(&self) -> Result<Option<DecodedAudio>, DomainError> {
        match self {
            Self::InlineAudio { encoded, bounds } => {
                let audio = DecodedAudio::from_base64(encoded)?;
                audio.ensure_within(*bounds)?;
                Ok(Some(audio))
            },
            Self::NamedPreset(_) | Self::FilePath(_) => Ok(None),
        }
    }

    /// Short label for logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NamedPreset(_) => "preset",
            Self::InlineAudio { .. } => "inline",
            Self::FilePath(_) => "file",
        }
    }
}

impl Default for VoiceDescriptor {
    fn default() -> Self {
        Self::preset(DEFAULT_VOICE)
    }
}

impl std::fmt::Debug for VoiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NamedPreset(name) => f.debug_tuple("NamedPreset").field(name).finish(),
            Self::InlineAudio { encoded, bounds } => f
                .debug_struct("InlineAudio")
                .field("encoded_len", &encoded.len())
                .field("bounds", bounds)
                .finish(),
            Self::FilePath(path) => f.debug_tuple("FilePath").field(path).finish(),
        }
    }
}

/// Where a resolved voice came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceOrigin {
    /// Catalog preset, referenced in place
    Preset(String),
    /// Materialized from inline audio into request scratch space
    Inline,
    /// An existing file on an allowed root
    File,
}

/// A voice reference usable by the synthesis worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVoiceRef {
    local_path: PathBuf,
    origin: VoiceOrigin,
}

impl ResolvedVoiceRef {
    pub const fn new(local_path: PathBuf, origin: VoiceOrigin) -> Self {
        Self { local_path, origin }
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub const fn origin(&self) -> &VoiceOrigin {
        &self.origin
    }

    /// Whether the file lives in request scratch space
    pub const fn is_ephemeral(&self) -> bool {
        matches!(self.origin, VoiceOrigin::Inline)
    }
}
