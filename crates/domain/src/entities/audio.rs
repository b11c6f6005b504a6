//! Decoded audio payloads and PCM sample buffers

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::errors::DomainError;
use crate::value_objects::DurationBounds;

/// A WAV payload that decoded successfully, with its measured duration
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedAudio {
    bytes: Vec<u8>,
    sample_rate: u32,
    channels: u16,
    frames: u64,
}

impl DecodedAudio {
    /// Decode a base64 payload (optionally a `data:` URL) into WAV audio
    pub fn from_base64(encoded: &str) -> Result<Self, DomainError> {
        let payload = strip_data_url(encoded);
        if payload.is_empty() {
            return Err(DomainError::InvalidAudio("empty audio payload".to_string()));
        }

        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| DomainError::InvalidAudio(format!("base64 decode failed: {e}")))?;

        Self::from_wav_bytes(bytes)
    }

    /// Inspect raw WAV bytes
    pub fn from_wav_bytes(bytes: Vec<u8>) -> Result<Self, DomainError> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes.as_slice()))
            .map_err(|e| DomainError::InvalidAudio(format!("not a WAV file: {e}")))?;

        let spec = reader.spec();
        if spec.sample_rate == 0 || spec.channels == 0 {
            return Err(DomainError::InvalidAudio(
                "WAV header declares zero sample rate or channels".to_string(),
            ));
        }

        // The header alone is not trusted for duration
        let declared = u64::from(reader.len());
        let present = match spec.sample_format {
            hound::SampleFormat::Float => count_samples(reader.samples::<f32>())?,
            hound::SampleFormat::Int => count_samples(reader.samples::<i32>())?,
        };
        if present != declared {
            return Err(DomainError::InvalidAudio(format!(
                "WAV data is truncated: {present} of {declared} samples present"
            )));
        }

        let frames = u64::from(reader.duration());
        drop(reader);

        Ok(Self {
            bytes,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            frames,
        })
    }

    /// Duration in whole milliseconds (floored)
    pub fn duration_ms(&self) -> u64 {
        self.frames * 1000 / u64::from(self.sample_rate)
    }

    /// Reject the audio when its duration falls outside the window
    pub fn ensure_within(&self, bounds: DurationBounds) -> Result<(), DomainError> {
        bounds.check(self.duration_ms())
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub const fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl std::fmt::Debug for DecodedAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedAudio")
            .field("len", &self.bytes.len())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("duration_ms", &self.duration_ms())
            .finish()
    }
}

fn count_samples<S>(samples: impl Iterator<Item = hound::Result<S>>) -> Result<u64, DomainError> {
    let mut count = 0u64;
    for sample in samples {
        sample.map_err(|e| DomainError::InvalidAudio(format!("unreadable WAV samples: {e}")))?;
        count += 1;
    }
    Ok(count)
}

/// Digest of a base64 payload's decoded bytes
///
/// Line wrapping and any `data:` prefix do not affect the result.
/// Undecodable payloads hash their compacted text instead.
pub(crate) fn payload_digest(encoded: &str) -> blake3::Hash {
    let compact: String = strip_data_url(encoded)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    match STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => blake3::hash(&bytes),
        Err(_) => blake3::hash(compact.as_bytes()),
    }
}

/// Remove a `data:<mime>;base64,` prefix if present
pub fn strip_data_url(encoded: &str) -> &str {
    let trimmed = encoded.trim();
    if trimmed.starts_with("data:") {
        trimmed
            .split_once(',')
            .map_or(trimmed, |(_, payload)| payload)
    } else {
        trimmed
    }
}

/// Mono floating-point samples as returned by the synthesis worker
#[derive(Clone, PartialEq)]
pub struct PcmAudio {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl PcmAudio {
    pub const fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A buffer of silence, mostly useful for fixtures
    pub fn silence(duration_ms: u64, sample_rate: u32) -> Self {
        let frames = usize::try_from(duration_ms * u64::from(sample_rate) / 1000).unwrap_or(0);
        Self::new(vec![0.0; frames], sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Encode as 16-bit PCM mono WAV
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_wav(&self) -> Result<Vec<u8>, DomainError> {
        if self.sample_rate == 0 {
            return Err(DomainError::InvalidAudio("sample rate is zero".to_string()));
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(44 + self.samples.len() * 2));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| DomainError::InvalidAudio(format!("WAV header: {e}")))?;
            for sample in &self.samples {
                let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
                writer
                    .write_sample(value)
                    .map_err(|e| DomainError::InvalidAudio(format!("WAV write: {e}")))?;
            }
            writer
                .finalize()
                .map_err(|e| DomainError::InvalidAudio(format!("WAV finalize: {e}")))?;
        }

        Ok(cursor.into_inner())
    }
}

impl std::fmt::Debug for PcmAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcmAudio")
            .field("samples", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_of(duration_ms: u64) -> Vec<u8> {
        PcmAudio::silence(duration_ms, 16_000).to_wav().unwrap()
    }

    fn encode(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    #[test]
    fn decodes_wav_and_measures_duration() {
        let audio = DecodedAudio::from_base64(&encode(&wav_of(6_000))).unwrap();
        assert_eq!(audio.duration_ms(), 6_000);
        assert_eq!(audio.sample_rate(), 16_000);
        assert_eq!(audio.channels(), 1);
    }

    #[test]
    fn accepts_data_url_prefix() {
        let encoded = format!("data:audio/wav;base64,{}", encode(&wav_of(500)));
        let audio = DecodedAudio::from_base64(&encoded).unwrap();
        assert_eq!(audio.duration_ms(), 500);
    }

    #[test]
    fn rejects_garbage_base64() {
        let err = DecodedAudio::from_base64("!!!not base64!!!").unwrap_err();
        assert!(matches!(err, DomainError::InvalidAudio(_)));
    }

    #[test]
    fn rejects_non_wav_bytes() {
        let err = DecodedAudio::from_base64(&encode(b"ID3 definitely an mp3")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidAudio(_)));
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(DecodedAudio::from_base64("   ").is_err());
    }

    #[test]
    fn exactly_minimum_duration_passes() {
        let audio = DecodedAudio::from_wav_bytes(wav_of(5_000)).unwrap();
        assert!(audio.ensure_within(DurationBounds::cloning_reference()).is_ok());
    }

    #[test]
    fn one_frame_below_minimum_fails() {
        let mut pcm = PcmAudio::silence(5_000, 16_000).samples().to_vec();
        pcm.pop();
        let bytes = PcmAudio::new(pcm, 16_000).to_wav().unwrap();
        let audio = DecodedAudio::from_wav_bytes(bytes).unwrap();
        assert_eq!(audio.duration_ms(), 4_999);
        assert!(audio.ensure_within(DurationBounds::cloning_reference()).is_err());
    }

    #[test]
    fn header_only_wav_is_rejected() {
        let mut bytes = wav_of(6_000);
        bytes.truncate(100);
        let err = DecodedAudio::from_wav_bytes(bytes).unwrap_err();
        assert!(matches!(err, DomainError::InvalidAudio(_)));
    }

    #[test]
    fn wav_cut_mid_data_is_rejected() {
        let mut bytes = wav_of(6_000);
        bytes.truncate(bytes.len() / 2);
        assert!(DecodedAudio::from_base64(&encode(&bytes)).is_err());
    }

    #[test]
    fn too_long_reference_fails() {
        let audio = DecodedAudio::from_wav_bytes(wav_of(9_000)).unwrap();
        assert!(audio.ensure_within(DurationBounds::cloning_reference()).is_err());
    }

    #[test]
    fn to_wav_clamps_out_of_range_samples() {
        let bytes = PcmAudio::new(vec![2.0, -2.0, 0.5], 8_000).to_wav().unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples[0], i16::MAX);
        assert_eq!(samples[1], -i16::MAX);
        assert_eq!(samples.len(), 3);
    }

    #[test]
    fn to_wav_rejects_zero_rate() {
        assert!(PcmAudio::new(vec![0.0], 0).to_wav().is_err());
    }

    #[test]
    fn debug_omits_payload() {
        let audio = DecodedAudio::from_wav_bytes(wav_of(100)).unwrap();
        let debug = format!("{audio:?}");
        assert!(debug.contains("duration_ms"));
        assert!(!debug.contains("RIFF"));
    }
}
