use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EncodeError;
use crate::modules::encode::events::{
    EncodedResolution, VideoEncodingCompletedMessage, VideoUploadedMessage,
};
use crate::modules::encode::ladder::{self, LADDER, ResolutionLevel};
use crate::state::AppState;

const RAW_VIDEOS_PREFIX: &str = "raw-videos";
const ENCODED_VIDEOS_PREFIX: &str = "encoded-videos";
const THUMBNAILS_PREFIX: &str = "thumbnails";
const MANIFEST_FILENAME: &str = "master.mpd";

/// Drives one upload through download, probe, the ladder walk and chunk
/// upload, and assembles the completion event. Any failing step aborts the
/// job; retries come from queue redelivery, not from here.
#[derive(Clone)]
pub struct EncodeService {
    state: AppState,
}

impl EncodeService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn run(
        &self,
        job: &VideoUploadedMessage,
    ) -> Result<VideoEncodingCompletedMessage, EncodeError> {
        let work_root = PathBuf::from(&self.state.config.work_dir);
        tokio::fs::create_dir_all(&work_root)
            .await
            .map_err(|e| EncodeError::Workspace {
                path: work_root.clone(),
                source: e,
            })?;

        // A leftover directory from a crashed attempt fails the job rather
        // than mixing stale artifacts into fresh output.
        let workdir = work_root.join(&job.video_id);
        tokio::fs::create_dir(&workdir)
            .await
            .map_err(|e| EncodeError::Workspace {
                path: workdir.clone(),
                source: e,
            })?;

        let result = self.process(&workdir, job).await;

        if let Err(e) = tokio::fs::remove_dir_all(&workdir).await {
            warn!("Unable to clean up {}: {}", workdir.display(), e);
        }

        result
    }

    async fn process(
        &self,
        workdir: &Path,
        job: &VideoUploadedMessage,
    ) -> Result<VideoEncodingCompletedMessage, EncodeError> {
        let object_key = format!("{}/{}", RAW_VIDEOS_PREFIX, job.video_id);
        let source = workdir.join(format!("source-{}", Uuid::new_v4()));

        self.state
            .storage
            .download(&object_key, &source)
            .await
            .map_err(|e| EncodeError::Download {
                key: object_key,
                source: e,
            })?;

        let info = self.state.encoder.probe(&source).await?;
        info!(
            "Video {} probed: {}x{}, {}s",
            job.video_id,
            info.width,
            info.height,
            info.duration_seconds()
        );

        let start = ladder::start_index(info.width, info.height);
        let resolutions = self
            .encode_ladder(workdir, &source, &job.video_id, start)
            .await?;

        info!("✅ Video encoding {} completed", job.video_id);

        Ok(VideoEncodingCompletedMessage {
            title: job.title.clone(),
            description: job.description.clone(),
            published_at: job.published_at.clone(),
            height: info.height,
            width: info.width,
            duration: info.duration_seconds(),
            resolutions,
            user_id: job.user_id,
            original_id: job.video_id.clone(),
            thumbnail: format!("{}/{}", THUMBNAILS_PREFIX, job.thumbnail_id),
            path: format!("{}/{}", ENCODED_VIDEOS_PREFIX, job.video_id),
        })
    }

    /// Walks the ladder from `start` down to the lowest tier, accumulating
    /// one rendition per level and stopping at the first failure.
    async fn encode_ladder(
        &self,
        workdir: &Path,
        source: &Path,
        video_id: &str,
        start: usize,
    ) -> Result<Vec<EncodedResolution>, EncodeError> {
        let mut renditions = Vec::with_capacity(LADDER.len() - start);

        for level in &LADDER[start..] {
            renditions.push(self.encode_level(workdir, source, video_id, level).await?);
        }

        Ok(renditions)
    }

    async fn encode_level(
        &self,
        workdir: &Path,
        source: &Path,
        video_id: &str,
        level: &ResolutionLevel,
    ) -> Result<EncodedResolution, EncodeError> {
        let prefix = level.prefix();

        let encoded = workdir.join(format!("{}.{}", prefix, level.format));
        self.state
            .encoder
            .transcode_to_resolution(source, &encoded, level)
            .await?;

        let chunk_dir = workdir.join(&prefix);
        tokio::fs::create_dir(&chunk_dir)
            .await
            .map_err(|e| EncodeError::Workspace {
                path: chunk_dir.clone(),
                source: e,
            })?;

        let manifest = chunk_dir.join(MANIFEST_FILENAME);
        self.state
            .encoder
            .segment_to_dash(&encoded, &manifest, level)
            .await?;

        let upload_prefix = format!("{}/{}/{}", ENCODED_VIDEOS_PREFIX, video_id, prefix);
        let chunks = self.upload_chunks(&chunk_dir, &upload_prefix).await?;

        info!("Processed {} chunks for {}", chunks.len(), upload_prefix);

        Ok(EncodedResolution {
            height: level.height,
            width: level.width,
            codec: level.video_codec.to_string(),
            chunks,
        })
    }

    /// Uploads every file in the chunk directory (manifest included) and
    /// returns their object keys.
    async fn upload_chunks(
        &self,
        chunk_dir: &Path,
        upload_prefix: &str,
    ) -> Result<Vec<String>, EncodeError> {
        let mut names = Vec::new();
        let mut entries =
            tokio::fs::read_dir(chunk_dir)
                .await
                .map_err(|e| EncodeError::ChunkListing {
                    path: chunk_dir.to_path_buf(),
                    source: e,
                })?;

        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|e| EncodeError::ChunkListing {
                    path: chunk_dir.to_path_buf(),
                    source: e,
                })?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        // read_dir order is platform dependent; keep chunk keys stable.
        names.sort();

        let mut chunks = Vec::with_capacity(names.len());

        for name in names {
            let key = format!("{}/{}", upload_prefix, name);
            self.state
                .storage
                .upload(&chunk_dir.join(&name), &key)
                .await
                .map_err(|e| EncodeError::Upload {
                    key: key.clone(),
                    source: e,
                })?;
            chunks.push(key);
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tempfile::TempDir;

    use super::*;
    use crate::config::settings::AppConfig;
    use crate::infrastructure::media::{MockMediaEncoder, VideoInfo};
    use crate::infrastructure::storage::MockObjectStorage;

    fn test_config(work_dir: &TempDir) -> AppConfig {
        AppConfig {
            amqp_url: "amqp://localhost".to_string(),
            amqp_retry_attempts: 1,
            amqp_retry_interval_secs: 1,
            amqp_publish_timeout_secs: 1,
            minio_url: String::new(),
            minio_bucket: String::new(),
            minio_access_key: String::new(),
            minio_secret_key: String::new(),
            work_dir: work_dir.path().to_string_lossy().into_owned(),
        }
    }

    fn test_job() -> VideoUploadedMessage {
        VideoUploadedMessage {
            video_id: "abc123".into(),
            thumbnail_id: "thumb1".into(),
            title: "T".into(),
            description: "D".into(),
            published_at: "2024-01-01".into(),
            user_id: 42,
        }
    }

    fn probe_result(width: u32, height: u32) -> VideoInfo {
        VideoInfo {
            width,
            height,
            duration: "11.4".into(),
            codec_name: "h264".into(),
            bit_rate: "1200000".into(),
        }
    }

    fn service(
        dir: &TempDir,
        storage: MockObjectStorage,
        encoder: MockMediaEncoder,
    ) -> EncodeService {
        EncodeService::new(AppState::new(
            test_config(dir),
            Arc::new(storage),
            Arc::new(encoder),
        ))
    }

    #[tokio::test]
    async fn encodes_every_level_from_best_fit_down() {
        let dir = tempfile::tempdir().unwrap();

        let mut storage = MockObjectStorage::new();
        storage.expect_download().times(1).returning(|_, path| {
            std::fs::write(path, b"raw").unwrap();
            Ok(())
        });

        let uploaded = Arc::new(Mutex::new(Vec::new()));
        let keys = uploaded.clone();
        storage.expect_upload().returning(move |_, key| {
            keys.lock().unwrap().push(key.to_string());
            Ok(())
        });

        let mut encoder = MockMediaEncoder::new();
        encoder
            .expect_probe()
            .times(1)
            .returning(|_| Ok(probe_result(1280, 720)));
        encoder
            .expect_transcode_to_resolution()
            .times(4)
            .returning(|_, output, _| {
                std::fs::write(output, b"enc").unwrap();
                Ok(())
            });
        encoder
            .expect_segment_to_dash()
            .times(4)
            .returning(|_, manifest, _| {
                let dir = manifest.parent().unwrap();
                std::fs::write(dir.join("chunk-001.m4s"), b"c").unwrap();
                std::fs::write(dir.join("chunk-000.m4s"), b"c").unwrap();
                std::fs::write(manifest, b"mpd").unwrap();
                Ok(())
            });

        let completed = service(&dir, storage, encoder)
            .run(&test_job())
            .await
            .unwrap();

        assert_eq!(completed.width, 1280);
        assert_eq!(completed.height, 720);
        assert_eq!(completed.duration, 11);
        assert_eq!(completed.original_id, "abc123");
        assert_eq!(completed.thumbnail, "thumbnails/thumb1");
        assert_eq!(completed.path, "encoded-videos/abc123");

        // The 720p source skips 1080p and cascades through the rest.
        let widths: Vec<u32> = completed.resolutions.iter().map(|r| r.width).collect();
        assert_eq!(widths, vec![1280, 854, 640, 320]);

        assert_eq!(
            completed.resolutions[0].chunks,
            vec![
                "encoded-videos/abc123/1280x720/chunk-000.m4s",
                "encoded-videos/abc123/1280x720/chunk-001.m4s",
                "encoded-videos/abc123/1280x720/master.mpd",
            ]
        );

        assert_eq!(uploaded.lock().unwrap().len(), 12);

        // The working directory is removed after a finished attempt.
        assert!(!dir.path().join("abc123").exists());
    }

    #[tokio::test]
    async fn transcode_failure_aborts_before_any_upload() {
        let dir = tempfile::tempdir().unwrap();

        let mut storage = MockObjectStorage::new();
        storage.expect_download().returning(|_, path| {
            std::fs::write(path, b"raw").unwrap();
            Ok(())
        });
        storage.expect_upload().never();

        let mut encoder = MockMediaEncoder::new();
        encoder
            .expect_probe()
            .returning(|_| Ok(probe_result(1920, 1080)));
        encoder
            .expect_transcode_to_resolution()
            .times(1)
            .returning(|_, _, _| {
                Err(EncodeError::Transcode {
                    width: 1920,
                    height: 1080,
                    message: "boom".into(),
                })
            });
        encoder.expect_segment_to_dash().never();

        let err = service(&dir, storage, encoder)
            .run(&test_job())
            .await
            .unwrap_err();

        assert!(matches!(err, EncodeError::Transcode { .. }));
        assert!(!dir.path().join("abc123").exists());
    }

    #[tokio::test]
    async fn download_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();

        let mut storage = MockObjectStorage::new();
        storage
            .expect_download()
            .returning(|_, _| Err(anyhow::anyhow!("connection refused")));

        let mut encoder = MockMediaEncoder::new();
        encoder.expect_probe().never();

        let err = service(&dir, storage, encoder)
            .run(&test_job())
            .await
            .unwrap_err();

        assert!(matches!(err, EncodeError::Download { .. }));
    }

    #[tokio::test]
    async fn stale_working_directory_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("abc123")).unwrap();

        let err = service(&dir, MockObjectStorage::new(), MockMediaEncoder::new())
            .run(&test_job())
            .await
            .unwrap_err();

        assert!(matches!(err, EncodeError::Workspace { .. }));

        // Not ours; stays in place for inspection.
        assert!(dir.path().join("abc123").exists());
    }
}
