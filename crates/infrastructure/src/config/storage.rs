//! Filesystem, voice and routing settings.

use std::path::PathBuf;

use domain::DEFAULT_VOICE;
use serde::{Deserialize, Serialize};

/// Artifact store location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory shared with the synthesis worker
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("data/artifacts")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
        }
    }
}

/// Per-request scratch space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchConfig {
    /// Parent of the per-request directories; must be readable by the worker
    #[serde(default = "default_scratch_root")]
    pub root: PathBuf,
}

fn default_scratch_root() -> PathBuf {
    PathBuf::from("data/scratch")
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            root: default_scratch_root(),
        }
    }
}

/// Preset voices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicesConfig {
    /// Directory scanned for `{name}.wav` presets
    #[serde(default = "default_preset_dir")]
    pub preset_dir: PathBuf,

    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// Substitute the default preset for an invalid voice at the HTTP edge
    #[serde(default)]
    pub fallback_to_default: bool,
}

fn default_preset_dir() -> PathBuf {
    PathBuf::from("voices")
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            preset_dir: default_preset_dir(),
            default_voice: default_voice(),
            fallback_to_default: false,
        }
    }
}

/// Pipeline router behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Tool-calling rounds before a non-conforming reply becomes an error
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

const fn default_max_rounds() -> u32 {
    1
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

/// Uploaded speech handling
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeechInputConfig {
    /// FFmpeg binary (defaults to `ffmpeg` on PATH)
    #[serde(default)]
    pub ffmpeg_path: Option<String>,
}
