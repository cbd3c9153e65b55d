/// One rung of the delivery ladder: the resolution, codecs and bitrates of a
/// rendition plus how it gets segmented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionLevel {
    pub width: u32,
    pub height: u32,
    pub video_codec: &'static str,
    pub audio_codec: &'static str,
    pub video_bitrate: &'static str,
    pub audio_bitrate: &'static str,
    pub segment_duration_secs: u32,
    pub format: &'static str,
}

impl ResolutionLevel {
    /// Directory and file prefix for this level, e.g. "1280x720".
    pub fn prefix(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Encoding presets in descending quality order. Read-only configuration;
/// the orchestrator walks it from the best level that fits the source down
/// to the last entry.
pub const LADDER: [ResolutionLevel; 5] = [
    ResolutionLevel {
        width: 1920,
        height: 1080,
        video_codec: "libx264",
        audio_codec: "aac",
        video_bitrate: "1000k",
        audio_bitrate: "192k",
        segment_duration_secs: 3,
        format: "mp4",
    },
    ResolutionLevel {
        width: 1280,
        height: 720,
        video_codec: "libx264",
        audio_codec: "aac",
        video_bitrate: "750k",
        audio_bitrate: "160k",
        segment_duration_secs: 5,
        format: "mp4",
    },
    ResolutionLevel {
        width: 854,
        height: 480,
        video_codec: "libx264",
        audio_codec: "aac",
        video_bitrate: "500k",
        audio_bitrate: "128k",
        segment_duration_secs: 7,
        format: "mp4",
    },
    ResolutionLevel {
        width: 640,
        height: 360,
        video_codec: "libx264",
        audio_codec: "aac",
        video_bitrate: "250k",
        audio_bitrate: "96k",
        segment_duration_secs: 10,
        format: "mp4",
    },
    ResolutionLevel {
        width: 320,
        height: 180,
        video_codec: "libx264",
        audio_codec: "aac",
        video_bitrate: "150k",
        audio_bitrate: "48k",
        segment_duration_secs: 10,
        format: "mp4",
    },
];

/// Index of the first level whose dimensions do not exceed the source's, so
/// nothing gets upscaled. Sources smaller than every level fall back to
/// index 0.
pub fn start_index(width: u32, height: u32) -> usize {
    LADDER
        .iter()
        .position(|level| level.width <= width && level.height <= height)
        .unwrap_or(0)
}
