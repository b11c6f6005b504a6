//! Cached generation artifacts

/// An immutable artifact stored under a cache key
#[derive(Clone, PartialEq, Eq)]
pub enum Artifact {
    /// WAV bytes
    Audio(Vec<u8>),
    /// UTF-8 text
    Text(String),
}

impl Artifact {
    /// File extension used when persisting this artifact
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Audio(_) => "wav",
            Self::Text(_) => "txt",
        }
    }

    /// Raw bytes as written to disk
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Audio(bytes) => bytes,
            Self::Text(text) => text.as_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio(bytes) => f.debug_struct("Audio").field("len", &bytes.len()).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
        }
    }
}
