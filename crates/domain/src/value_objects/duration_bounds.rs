//! Accepted duration windows for supplied audio

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Inclusive duration window in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationBounds {
    min_ms: u64,
    max_ms: u64,
}

impl DurationBounds {
    /// Shortest accepted voice-cloning reference
    pub const CLONING_MIN_MS: u64 = 5_000;
    /// Longest accepted voice-cloning reference
    pub const CLONING_MAX_MS: u64 = 8_000;
    /// Longest accepted input speech
    pub const SPEECH_INPUT_MAX_MS: u64 = 60_000;

    /// Create a window, rejecting inverted bounds
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, DomainError> {
        if min_ms > max_ms {
            return Err(DomainError::ValidationError(format!(
                "duration bounds inverted: {min_ms} > {max_ms}"
            )));
        }
        Ok(Self { min_ms, max_ms })
    }

    /// Window for inline voice-cloning references (5s to 8s)
    pub const fn cloning_reference() -> Self {
        Self {
            min_ms: Self::CLONING_MIN_MS,
            max_ms: Self::CLONING_MAX_MS,
        }
    }

    /// Window for input speech (anything non-empty up to 60s)
    pub const fn speech_input() -> Self {
        Self {
            min_ms: 1,
            max_ms: Self::SPEECH_INPUT_MAX_MS,
        }
    }

    pub const fn min_ms(&self) -> u64 {
        self.min_ms
    }

    pub const fn max_ms(&self) -> u64 {
        self.max_ms
    }

    /// Whether a duration falls inside the window (inclusive)
    pub const fn contains(&self, duration_ms: u64) -> bool {
        duration_ms >= self.min_ms && duration_ms <= self.max_ms
    }

    /// Check a duration, returning a typed error when outside the window
    pub fn check(&self, duration_ms: u64) -> Result<(), DomainError> {
        if self.contains(duration_ms) {
            Ok(())
        } else {
            Err(DomainError::DurationOutOfBounds {
                duration_ms,
                min_ms: self.min_ms,
                max_ms: self.max_ms,
            })
        }
    }
}
