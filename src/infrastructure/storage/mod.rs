use std::path::Path;

use async_trait::async_trait;

pub mod s3;

/// Object storage operations the encode pipeline needs: fetch the raw upload
/// and push encoded chunks back, both addressed by object key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Download the object at `key` to `local_path`.
    async fn download(&self, key: &str, local_path: &Path) -> anyhow::Result<()>;

    /// Upload the file at `local_path` to `key`.
    async fn upload(&self, local_path: &Path, key: &str) -> anyhow::Result<()>;
}
