use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::EncodeError;
use crate::modules::encode::ladder::ResolutionLevel;

pub mod ffmpeg;

/// Intrinsic properties of a source video, as reported by ffprobe's first
/// video stream entry.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub codec_name: String,
    #[serde(default)]
    pub bit_rate: String,
}

impl VideoInfo {
    /// Whole seconds, truncated. ffprobe reports duration as a decimal string
    /// and omits it entirely for some containers.
    pub fn duration_seconds(&self) -> u64 {
        self.duration.parse::<f64>().unwrap_or_default() as u64
    }
}

/// The transcoding engine, treated as a black box: it can report a file's
/// properties, re-encode it to a ladder level, and package a re-encode as a
/// segmented DASH stream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    async fn probe(&self, input: &Path) -> Result<VideoInfo, EncodeError>;

    async fn transcode_to_resolution(
        &self,
        input: &Path,
        output: &Path,
        level: &ResolutionLevel,
    ) -> Result<(), EncodeError>;

    /// Writes the manifest at `manifest` and the chunk files next to it.
    async fn segment_to_dash(
        &self,
        input: &Path,
        manifest: &Path,
        level: &ResolutionLevel,
    ) -> Result<(), EncodeError>;
}
