use std::path::PathBuf;

use thiserror::Error;

/// Everything that can fail one encode job. Each variant names the pipeline
/// step and the subject so the consumer can log a diagnosable failure before
/// leaving the message unacknowledged.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("unable to create working directory {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to download {key}: {source}")]
    Download {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("ffprobe failed for {path}: {message}")]
    Probe { path: PathBuf, message: String },

    #[error("transcode to {width}x{height} failed: {message}")]
    Transcode {
        width: u32,
        height: u32,
        message: String,
    },

    #[error("DASH segmenting at {width}x{height} failed: {message}")]
    Segment {
        width: u32,
        height: u32,
        message: String,
    },

    #[error("unable to read chunk directory {path}: {source}")]
    ChunkListing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to upload {key}: {source}")]
    Upload {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}
