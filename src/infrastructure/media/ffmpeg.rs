use std::path::Path;
use std::process::Output;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::EncodeError;
use crate::infrastructure::media::{MediaEncoder, VideoInfo};
use crate::modules::encode::ladder::ResolutionLevel;

/// Shells out to ffprobe/ffmpeg; both binaries must be on PATH.
pub struct FfmpegEncoder;

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<VideoInfo>,
}

// ffmpeg is chatty on stderr; the failure reason sits at the end.
fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(8);
    lines[start..].join("\n")
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    async fn probe(&self, input: &Path) -> Result<VideoInfo, EncodeError> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,duration,codec_name,bit_rate",
                "-of",
                "json",
            ])
            .arg(input)
            .output()
            .await
            .map_err(|e| EncodeError::Probe {
                path: input.to_path_buf(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(EncodeError::Probe {
                path: input.to_path_buf(),
                message: stderr_tail(&output),
            });
        }

        let probed: ProbeOutput =
            serde_json::from_slice(&output.stdout).map_err(|e| EncodeError::Probe {
                path: input.to_path_buf(),
                message: format!("invalid ffprobe output: {e}"),
            })?;

        probed
            .streams
            .into_iter()
            .next()
            .ok_or_else(|| EncodeError::Probe {
                path: input.to_path_buf(),
                message: "no video stream found".to_string(),
            })
    }

    async fn transcode_to_resolution(
        &self,
        input: &Path,
        output: &Path,
        level: &ResolutionLevel,
    ) -> Result<(), EncodeError> {
        let scale = format!("scale={}:{}", level.width, level.height);

        let result = Command::new("ffmpeg")
            .arg("-i")
            .arg(input)
            .args([
                "-c:v",
                level.video_codec,
                "-vf",
                &scale,
                "-b:v",
                level.video_bitrate,
                "-c:a",
                level.audio_codec,
                "-b:a",
                level.audio_bitrate,
                "-y",
            ])
            .arg(output)
            .output()
            .await
            .map_err(|e| EncodeError::Transcode {
                width: level.width,
                height: level.height,
                message: e.to_string(),
            })?;

        if !result.status.success() {
            return Err(EncodeError::Transcode {
                width: level.width,
                height: level.height,
                message: stderr_tail(&result),
            });
        }

        debug!("Transcoded {} to {}", input.display(), output.display());

        Ok(())
    }

    async fn segment_to_dash(
        &self,
        input: &Path,
        manifest: &Path,
        level: &ResolutionLevel,
    ) -> Result<(), EncodeError> {
        let seg_duration = level.segment_duration_secs.to_string();

        let result = Command::new("ffmpeg")
            .arg("-i")
            .arg(input)
            .args([
                "-c",
                "copy",
                "-f",
                "dash",
                "-seg_duration",
                &seg_duration,
                "-use_timeline",
                "1",
                "-use_template",
                "1",
                "-y",
            ])
            .arg(manifest)
            .output()
            .await
            .map_err(|e| EncodeError::Segment {
                width: level.width,
                height: level.height,
                message: e.to_string(),
            })?;

        if !result.status.success() {
            return Err(EncodeError::Segment {
                width: level.width,
                height: level.height,
                message: stderr_tail(&result),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ffprobe_stream_json() {
        let raw = r#"{
            "programs": [],
            "streams": [{
                "codec_name": "h264",
                "width": 1280,
                "height": 720,
                "duration": "10.933333",
                "bit_rate": "1205959"
            }]
        }"#;

        let probed: ProbeOutput = serde_json::from_str(raw).unwrap();
        let info = &probed.streams[0];

        assert_eq!(info.width, 1280);
        assert_eq!(info.height, 720);
        assert_eq!(info.codec_name, "h264");
        assert_eq!(info.duration_seconds(), 10);
    }

    #[test]
    fn duration_defaults_to_zero_when_missing() {
        let info: VideoInfo = serde_json::from_str(r#"{"width": 640, "height": 360}"#).unwrap();
        assert_eq!(info.duration_seconds(), 0);
    }

    #[test]
    fn empty_probe_output_has_no_streams() {
        let probed: ProbeOutput = serde_json::from_str(r#"{"programs": []}"#).unwrap();
        assert!(probed.streams.is_empty());
    }
}
