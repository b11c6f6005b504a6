//! Voice reference resolution
//!
//! Validation is pure and runs before any remote call. Resolution turns a
//! validated voice into a file the synthesis worker can read, writing
//! inline audio into the request's scratch space.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use domain::{
    DEFAULT_VOICE, DecodedAudio, DurationBounds, ResolvedVoiceRef, VoiceDescriptor, VoiceOrigin,
};
use tracing::{debug, instrument, warn};

use crate::error::ApplicationError;
use crate::services::scratch_space::ScratchSpace;

/// File name of a materialized inline voice inside scratch space
pub const CLONE_FILE_NAME: &str = "clone.wav";

/// Named preset voices available on this host
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    preset_dir: PathBuf,
    default_voice: String,
    presets: BTreeMap<String, PathBuf>,
}

impl VoiceCatalog {
    pub fn new(preset_dir: impl Into<PathBuf>) -> Self {
        Self {
            preset_dir: preset_dir.into(),
            default_voice: DEFAULT_VOICE.to_string(),
            presets: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_default_voice(mut self, name: impl Into<String>) -> Self {
        self.default_voice = name.into();
        self
    }

    /// Register a preset; later registrations replace earlier ones
    #[must_use]
    pub fn with_preset(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.presets.insert(name.into(), path.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.presets.get(name).map(PathBuf::as_path)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn default_voice(&self) -> &str {
        &self.default_voice
    }

    pub fn preset_dir(&self) -> &Path {
        &self.preset_dir
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

/// A voice that passed validation but has not touched the filesystem yet
#[derive(Debug)]
pub enum ValidatedVoice {
    Preset { name: String, path: PathBuf },
    Inline(DecodedAudio),
    File(PathBuf),
}

/// Validates and resolves voice references against the catalog
#[derive(Debug, Clone)]
pub struct VoiceResolver {
    catalog: Arc<VoiceCatalog>,
    scratch_root: PathBuf,
    fallback_to_default: bool,
}

impl VoiceResolver {
    pub fn new(catalog: Arc<VoiceCatalog>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            scratch_root: scratch_root.into(),
            fallback_to_default: false,
        }
    }

    /// Substitute the default preset for invalid voices at the request edge
    #[must_use]
    pub const fn with_fallback_to_default(mut self, enabled: bool) -> Self {
        self.fallback_to_default = enabled;
        self
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    /// Validate a descriptor without side effects
    pub fn validate(&self, descriptor: &VoiceDescriptor) -> Result<ValidatedVoice, ApplicationError> {
        match descriptor {
            VoiceDescriptor::NamedPreset(name) => self.preset(name),
            VoiceDescriptor::InlineAudio { .. } => {
                let audio = descriptor.decode_inline()?.ok_or_else(|| {
                    ApplicationError::Internal("inline voice decoded to nothing".into())
                })?;
                Ok(ValidatedVoice::Inline(audio))
            },
            VoiceDescriptor::FilePath(path) => {
                self.ensure_allowed(path)?;
                Ok(ValidatedVoice::File(path.clone()))
            },
        }
    }

    /// Validate at the outermost entry point, honoring the fallback policy
    ///
    /// Returns the descriptor that was actually validated so the cache key
    /// reflects any substitution.
    pub fn validate_at_edge(
        &self,
        descriptor: VoiceDescriptor,
    ) -> Result<(VoiceDescriptor, ValidatedVoice), ApplicationError> {
        match self.validate(&descriptor) {
            Ok(validated) => Ok((descriptor, validated)),
            Err(e) if self.fallback_to_default => {
                warn!(error = %e, kind = descriptor.kind(), "Invalid voice, using default preset");
                let fallback = VoiceDescriptor::preset(self.catalog.default_voice());
                let validated = self.validate(&fallback)?;
                Ok((fallback, validated))
            },
            Err(e) => Err(e),
        }
    }

    /// Turn a validated voice into a readable file
    #[instrument(skip(self, validated, scratch))]
    pub async fn resolve(
        &self,
        validated: ValidatedVoice,
        scratch: &ScratchSpace,
    ) -> Result<ResolvedVoiceRef, ApplicationError> {
        match validated {
            ValidatedVoice::Preset { name, path } => {
                Ok(ResolvedVoiceRef::new(path, VoiceOrigin::Preset(name)))
            },
            ValidatedVoice::Inline(audio) => {
                let path = scratch.write_file(CLONE_FILE_NAME, audio.bytes()).await?;
                debug!(path = %path.display(), duration_ms = audio.duration_ms(), "Materialized inline voice");
                Ok(ResolvedVoiceRef::new(path, VoiceOrigin::Inline))
            },
            ValidatedVoice::File(path) => {
                Self::ensure_readable_wav(&path).await?;
                Ok(ResolvedVoiceRef::new(path, VoiceOrigin::File))
            },
        }
    }

    /// Classify a raw voice string from pipeline arguments
    ///
    /// Tried in order: exact preset name, inline audio, file path on an
    /// allowed root. Inline audio that decodes but violates `bounds` is an
    /// error rather than a fall-through.
    #[instrument(skip(self, raw, scratch), fields(raw_len = raw.len()))]
    pub async fn resolve_reference(
        &self,
        raw: &str,
        bounds: DurationBounds,
        scratch: &ScratchSpace,
    ) -> Result<ResolvedVoiceRef, ApplicationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ApplicationError::VoiceResolution("voice reference is empty".into()));
        }

        if let Some(path) = self.catalog.get(raw) {
            return Ok(ResolvedVoiceRef::new(
                path.to_path_buf(),
                VoiceOrigin::Preset(raw.to_string()),
            ));
        }

        if let Ok(audio) = DecodedAudio::from_base64(raw) {
            audio.ensure_within(bounds)?;
            return self.resolve(ValidatedVoice::Inline(audio), scratch).await;
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            self.ensure_allowed(path)?;
            return self.resolve(ValidatedVoice::File(path.to_path_buf()), scratch).await;
        }

        Err(ApplicationError::VoiceResolution(format!(
            "'{}' is not a known voice, audio payload or allowed file",
            truncate(raw, 64)
        )))
    }

    fn preset(&self, name: &str) -> Result<ValidatedVoice, ApplicationError> {
        self.catalog.get(name).map_or_else(
            || Err(ApplicationError::VoiceResolution(format!("unknown voice '{name}'"))),
            |path| {
                Ok(ValidatedVoice::Preset {
                    name: name.to_string(),
                    path: path.to_path_buf(),
                })
            },
        )
    }

    /// Paths must be absolute, free of `..` and under the preset or scratch root
    fn ensure_allowed(&self, path: &Path) -> Result<(), ApplicationError> {
        let traverses = path
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        let under_root = path.starts_with(self.catalog.preset_dir())
            || path.starts_with(&self.scratch_root);

        if path.is_absolute() && !traverses && under_root {
            Ok(())
        } else {
            Err(ApplicationError::VoiceResolution(format!(
                "voice file {} is outside the allowed directories",
                path.display()
            )))
        }
    }

    async fn ensure_readable_wav(path: &Path) -> Result<(), ApplicationError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ApplicationError::VoiceResolution(format!("cannot read voice file {}: {e}", path.display()))
        })?;
        DecodedAudio::from_wav_bytes(bytes)?;
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use domain::{PcmAudio, RequestId};

    use super::*;
    use crate::services::scratch_space::ScratchRoot;

    fn wav_of(ms: u64) -> Vec<u8> {
        PcmAudio::silence(ms, 16_000).to_wav().unwrap()
    }

    fn inline_of(ms: u64) -> String {
        STANDARD.encode(wav_of(ms))
    }

    struct Fixture {
        _presets: tempfile::TempDir,
        scratch_root: tempfile::TempDir,
        resolver: VoiceResolver,
    }

    fn fixture() -> Fixture {
        let presets = tempfile::tempdir().unwrap();
        let alloy = presets.path().join("alloy.wav");
        std::fs::write(&alloy, wav_of(6_000)).unwrap();
        let catalog = VoiceCatalog::new(presets.path()).with_preset("alloy", &alloy);
        let scratch_root = tempfile::tempdir().unwrap();
        let resolver = VoiceResolver::new(Arc::new(catalog), scratch_root.path());
        Fixture {
            _presets: presets,
            scratch_root,
            resolver,
        }
    }

    #[test]
    fn known_preset_validates() {
        let f = fixture();
        let validated = f.resolver.validate(&VoiceDescriptor::preset("alloy")).unwrap();
        assert!(matches!(validated, ValidatedVoice::Preset { ref name, .. } if name == "alloy"));
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let f = fixture();
        let err = f.resolver.validate(&VoiceDescriptor::preset("nova")).unwrap_err();
        assert!(matches!(err, ApplicationError::VoiceResolution(_)));
    }

    #[test]
    fn inline_voice_at_minimum_passes() {
        let f = fixture();
        let descriptor = VoiceDescriptor::inline(inline_of(DurationBounds::CLONING_MIN_MS));
        assert!(matches!(
            f.resolver.validate(&descriptor).unwrap(),
            ValidatedVoice::Inline(_)
        ));
    }

    #[test]
    fn inline_voice_below_minimum_fails() {
        let f = fixture();
        let descriptor = VoiceDescriptor::inline(inline_of(4_999));
        let err = f.resolver.validate(&descriptor).unwrap_err();
        assert!(matches!(err, ApplicationError::VoiceResolution(_)));
    }

    #[test]
    fn inline_voice_above_maximum_fails() {
        let f = fixture();
        let descriptor = VoiceDescriptor::inline(inline_of(8_001));
        assert!(f.resolver.validate(&descriptor).is_err());
    }

    #[test]
    fn garbage_inline_voice_fails() {
        let f = fixture();
        let descriptor = VoiceDescriptor::inline("definitely not audio");
        assert!(matches!(
            f.resolver.validate(&descriptor).unwrap_err(),
            ApplicationError::VoiceResolution(_)
        ));
    }

    #[test]
    fn file_outside_roots_is_rejected() {
        let f = fixture();
        let descriptor = VoiceDescriptor::FilePath("/etc/passwd".into());
        assert!(f.resolver.validate(&descriptor).is_err());
    }

    #[test]
    fn traversal_out_of_root_is_rejected() {
        let f = fixture();
        let sneaky = f.resolver.catalog().preset_dir().join("../../etc/passwd");
        assert!(f.resolver.validate(&VoiceDescriptor::FilePath(sneaky)).is_err());
    }

    #[test]
    fn edge_fallback_only_when_enabled() {
        let f = fixture();
        let strict = f.resolver.validate_at_edge(VoiceDescriptor::preset("nova"));
        assert!(strict.is_err());

        let lenient = f.resolver.clone().with_fallback_to_default(true);
        let (descriptor, _) = lenient
            .validate_at_edge(VoiceDescriptor::preset("nova"))
            .unwrap();
        assert_eq!(descriptor, VoiceDescriptor::preset("alloy"));
    }

    #[tokio::test]
    async fn inline_voice_is_written_to_scratch() {
        let f = fixture();
        let scratch = ScratchRoot::new(f.scratch_root.path())
            .create(RequestId::new())
            .await
            .unwrap();
        let validated = f
            .resolver
            .validate(&VoiceDescriptor::inline(inline_of(6_000)))
            .unwrap();

        let resolved = f.resolver.resolve(validated, &scratch).await.unwrap();

        assert!(resolved.is_ephemeral());
        assert!(resolved.local_path().starts_with(scratch.path()));
        assert!(resolved.local_path().exists());
        scratch.cleanup().await;
        assert!(!resolved.local_path().exists());
    }

    #[tokio::test]
    async fn reference_prefers_preset_name() {
        let f = fixture();
        let scratch = ScratchRoot::new(f.scratch_root.path())
            .create(RequestId::new())
            .await
            .unwrap();
        let resolved = f
            .resolver
            .resolve_reference("alloy", DurationBounds::cloning_reference(), &scratch)
            .await
            .unwrap();
        assert_eq!(resolved.origin(), &VoiceOrigin::Preset("alloy".into()));
    }

    #[tokio::test]
    async fn reference_accepts_preset_file_path() {
        let f = fixture();
        let scratch = ScratchRoot::new(f.scratch_root.path())
            .create(RequestId::new())
            .await
            .unwrap();
        let path = f.resolver.catalog().get("alloy").unwrap().to_path_buf();
        let resolved = f
            .resolver
            .resolve_reference(
                path.to_str().unwrap(),
                DurationBounds::cloning_reference(),
                &scratch,
            )
            .await
            .unwrap();
        assert_eq!(resolved.origin(), &VoiceOrigin::File);
        assert_eq!(resolved.local_path(), path);
    }

    #[tokio::test]
    async fn reference_rejects_short_inline_audio() {
        let f = fixture();
        let scratch = ScratchRoot::new(f.scratch_root.path())
            .create(RequestId::new())
            .await
            .unwrap();
        let err = f
            .resolver
            .resolve_reference(&inline_of(1_000), DurationBounds::cloning_reference(), &scratch)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::VoiceResolution(_)));
    }

    #[tokio::test]
    async fn reference_rejects_unknown_name() {
        let f = fixture();
        let scratch = ScratchRoot::new(f.scratch_root.path())
            .create(RequestId::new())
            .await
            .unwrap();
        let err = f
            .resolver
            .resolve_reference("shimmer", DurationBounds::cloning_reference(), &scratch)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::VoiceResolution(_)));
    }
}
