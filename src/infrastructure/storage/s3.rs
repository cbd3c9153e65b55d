use std::path::Path;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use tracing::info;

use crate::infrastructure::storage::ObjectStorage;

#[derive(Clone)]
pub struct StorageService {
    client: Client,
    bucket: String,
}

impl StorageService {
    pub async fn new(endpoint: &str, bucket: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(config);

        info!("✅ Connected to S3 (MinIO)");

        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for StorageService {
    async fn download(&self, key: &str, local_path: &Path) -> Result<()> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("S3 get object error for {}: {}", key, e))?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| anyhow!("Unable to read object body for {}: {}", key, e))?;

        tokio::fs::write(local_path, data.into_bytes())
            .await
            .map_err(|e| anyhow!("Unable to write {}: {}", local_path.display(), e))?;

        Ok(())
    }

    async fn upload(&self, local_path: &Path, key: &str) -> Result<()> {
        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            anyhow!(
                "Unable to read file for upload {}: {}",
                local_path.display(),
                e
            )
        })?;

        let content_type = mime_guess::from_path(local_path).first_or_octet_stream();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type.as_ref())
            .send()
            .await
            .map_err(|e| anyhow!("S3 put object error for {}: {}", key, e))?;

        Ok(())
    }
}
