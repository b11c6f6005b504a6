//! Preset voice discovery

use std::path::{Path, PathBuf};

use application::{error::ApplicationError, services::VoiceCatalog};
use tracing::{debug, info, warn};

use crate::config::VoicesConfig;

/// Build the catalog from `{name}.wav` files in the preset directory
///
/// A missing directory yields an empty catalog so the server can still
/// answer inline-voice requests.
///
/// # Errors
///
/// Returns `ApplicationError::Configuration` if the directory exists but
/// cannot be read.
pub fn load_voice_catalog(config: &VoicesConfig) -> Result<VoiceCatalog, ApplicationError> {
    let dir = absolute(&config.preset_dir)?;
    let mut catalog = VoiceCatalog::new(&dir).with_default_voice(&config.default_voice);

    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "Preset voice directory missing");
            return Ok(catalog);
        },
        Err(e) => {
            return Err(ApplicationError::Configuration(format!(
                "cannot read preset voices in {}: {e}",
                dir.display()
            )));
        },
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_wav = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if is_wav && path.is_file() {
            debug!(voice = name, "Registered preset voice");
            catalog = catalog.with_preset(name.to_string(), path.clone());
        }
    }

    if !catalog.contains(&config.default_voice) {
        warn!(
            default_voice = %config.default_voice,
            "Default voice has no preset file"
        );
    }
    info!(presets = catalog.len(), dir = %dir.display(), "Voice catalog loaded");
    Ok(catalog)
}

/// Absolute form of `path` so allow-list checks compare like with like
pub fn absolute(path: &Path) -> Result<PathBuf, ApplicationError> {
    std::fs::canonicalize(path).or_else(|_| {
        std::path::absolute(path).map_err(|e| {
            ApplicationError::Configuration(format!("invalid path {}: {e}", path.display()))
        })
    })
}
