//! Audio conversion port - transcoding of uploaded speech

use std::path::Path;

use async_trait::async_trait;
use domain::AudioFormat;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for turning arbitrary speech uploads into WAV
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AudioConversionPort: Send + Sync {
    /// Transcode `data` to a mono WAV file at `output`
    async fn convert_to_wav(
        &self,
        data: &[u8],
        format: AudioFormat,
        output: &Path,
    ) -> Result<(), ApplicationError>;
}
