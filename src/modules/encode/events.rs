use serde::{Deserialize, Serialize};

pub const QUEUE_ENCODE_SERVICE: &str = "EncodeService";
pub const QUEUE_VIDEO_CATALOG_SERVICE: &str = "VideoCatalogService";

pub const MESSAGE_ENCODE_UPLOADED_VIDEO: &str = "EncodeUploadedVideo";
pub const MESSAGE_VIDEO_ENCODING_COMPLETED: &str = "VideoEncodingCompleted";

/// Wrapper for every message this service sends; `key` tells the receiving
/// side which payload shape `data` carries.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub key: &'static str,
    pub data: T,
}

/// First-pass decode of an inbound message: the discriminator plus the raw
/// payload, so the consumer can count and dispatch on the key before
/// committing to a concrete payload type.
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    pub key: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One unit of work: a freshly uploaded video waiting to be encoded.
/// `video_id` is also the object-store key root for everything this job
/// reads and writes.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoUploadedMessage {
    pub video_id: String,
    pub thumbnail_id: String,
    pub title: String,
    pub description: String,
    pub published_at: String,
    pub user_id: i64,
}

/// Completion event for the video catalog service. Renditions are listed in
/// ladder order, best quality first.
#[derive(Debug, Serialize)]
pub struct VideoEncodingCompletedMessage {
    pub title: String,
    pub description: String,
    pub published_at: String,
    pub height: u32,
    pub width: u32,
    pub duration: u64,
    pub resolutions: Vec<EncodedResolution>,
    pub user_id: i64,
    pub original_id: String,
    pub thumbnail: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct EncodedResolution {
    pub height: u32,
    pub width: u32,
    pub codec: String,
    pub chunks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_video_uploaded_envelope() {
        let body = json!({
            "key": "EncodeUploadedVideo",
            "data": {
                "video_id": "abc123",
                "thumbnail_id": "thumb1",
                "title": "T",
                "description": "D",
                "published_at": "2024-01-01",
                "user_id": 42
            }
        });

        let envelope: RawEnvelope = serde_json::from_value(body).unwrap();
        assert_eq!(envelope.key, MESSAGE_ENCODE_UPLOADED_VIDEO);

        let job: VideoUploadedMessage = serde_json::from_value(envelope.data).unwrap();
        assert_eq!(job.video_id, "abc123");
        assert_eq!(job.thumbnail_id, "thumb1");
        assert_eq!(job.user_id, 42);
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let data = json!({"video_id": "abc123"});
        assert!(serde_json::from_value::<VideoUploadedMessage>(data).is_err());
    }

    #[test]
    fn unknown_key_still_decodes_as_raw_envelope() {
        let body = json!({"key": "SomethingElse", "data": {"x": 1}});
        let envelope: RawEnvelope = serde_json::from_value(body).unwrap();
        assert_eq!(envelope.key, "SomethingElse");
    }

    #[test]
    fn envelope_without_data_defaults_to_null() {
        let envelope: RawEnvelope = serde_json::from_value(json!({"key": "Ping"})).unwrap();
        assert!(envelope.data.is_null());
    }

    #[test]
    fn completed_envelope_wire_shape() {
        let message = VideoEncodingCompletedMessage {
            title: "T".into(),
            description: "D".into(),
            published_at: "2024-01-01".into(),
            height: 720,
            width: 1280,
            duration: 11,
            resolutions: vec![EncodedResolution {
                height: 720,
                width: 1280,
                codec: "libx264".into(),
                chunks: vec!["encoded-videos/abc123/1280x720/master.mpd".into()],
            }],
            user_id: 42,
            original_id: "abc123".into(),
            thumbnail: "thumbnails/thumb1".into(),
            path: "encoded-videos/abc123".into(),
        };

        let envelope = Envelope {
            key: MESSAGE_VIDEO_ENCODING_COMPLETED,
            data: message,
        };
        let wire = serde_json::to_value(&envelope).unwrap();

        assert_eq!(wire["key"], "VideoEncodingCompleted");
        assert_eq!(wire["data"]["original_id"], "abc123");
        assert_eq!(wire["data"]["duration"], 11);
        assert_eq!(wire["data"]["user_id"], 42);
        assert_eq!(wire["data"]["thumbnail"], "thumbnails/thumb1");
        assert_eq!(wire["data"]["path"], "encoded-videos/abc123");
        assert_eq!(
            wire["data"]["resolutions"][0]["chunks"][0],
            "encoded-videos/abc123/1280x720/master.mpd"
        );
    }
}
