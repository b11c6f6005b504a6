//! Audio container formats accepted as speech input

use serde::{Deserialize, Serialize};

/// Format of an audio payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// WAV (RIFF) container
    #[default]
    Wav,
    /// MP3 format
    Mp3,
    /// OGG container
    Ogg,
    /// Opus codec
    Opus,
    /// FLAC lossless
    Flac,
    /// AAC in an MP4 container
    M4a,
    /// WebM container
    Webm,
}

impl AudioFormat {
    /// Get the MIME type for this format
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::Opus => "audio/opus",
            Self::Flac => "audio/flac",
            Self::M4a => "audio/mp4",
            Self::Webm => "audio/webm",
        }
    }

    /// Get the file extension for this format
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Opus => "opus",
            Self::Flac => "flac",
            Self::M4a => "m4a",
            Self::Webm => "webm",
        }
    }

    /// Parse a format label as sent by clients (`"wav"`, `"mp3"`, `"audio/wav"`)
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        if label.contains('/') {
            return Self::from_mime_type(&label);
        }
        match label.as_str() {
            "wav" | "wave" => Some(Self::Wav),
            "mp3" | "mpeg" => Some(Self::Mp3),
            "ogg" | "oga" => Some(Self::Ogg),
            "opus" => Some(Self::Opus),
            "flac" => Some(Self::Flac),
            "m4a" | "mp4" | "aac" => Some(Self::M4a),
            "webm" => Some(Self::Webm),
            _ => None,
        }
    }

    /// Parse from MIME type
    #[must_use]
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let base = mime.split(';').next().unwrap_or(mime).trim();
        match base {
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some(Self::Wav),
            "audio/mpeg" | "audio/mp3" => Some(Self::Mp3),
            "audio/ogg" => Some(Self::Ogg),
            "audio/opus" => Some(Self::Opus),
            "audio/flac" | "audio/x-flac" => Some(Self::Flac),
            "audio/mp4" | "audio/m4a" | "audio/aac" => Some(Self::M4a),
            "audio/webm" => Some(Self::Webm),
            _ => None,
        }
    }

    /// Whether the payload needs transcoding before WAV inspection
    #[must_use]
    pub const fn needs_conversion(&self) -> bool {
        !matches!(self, Self::Wav)
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse() {
        assert_eq!(AudioFormat::from_label("wav"), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::from_label(" MP3 "), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_label("audio/x-wav"), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::from_label("midi"), None);
    }

    #[test]
    fn mime_with_parameters() {
        assert_eq!(
            AudioFormat::from_mime_type("audio/ogg; codecs=opus"),
            Some(AudioFormat::Ogg)
        );
    }

    #[test]
    fn only_wav_skips_conversion() {
        assert!(!AudioFormat::Wav.needs_conversion());
        assert!(AudioFormat::Mp3.needs_conversion());
    }

    #[test]
    fn display_is_extension() {
        assert_eq!(AudioFormat::Flac.to_string(), "flac");
        assert_eq!(AudioFormat::default(), AudioFormat::Wav);
    }
}
