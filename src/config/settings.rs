use crate::config::env::{self, EnvKey};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub amqp_url: String,
    pub amqp_retry_attempts: u32,
    /// Liveness tick period and the base of the reconnect backoff.
    pub amqp_retry_interval_secs: u64,
    pub amqp_publish_timeout_secs: u64,
    pub minio_url: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub work_dir: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Ok(Self {
            amqp_url: env::get(EnvKey::AmqpUrl)?,
            amqp_retry_attempts: env::get_parsed(EnvKey::AmqpRetryAttempts, 5),
            amqp_retry_interval_secs: env::get_parsed(EnvKey::AmqpRetryInterval, 10),
            amqp_publish_timeout_secs: env::get_parsed(EnvKey::AmqpPublishTimeout, 5),
            minio_url: env::get(EnvKey::MinioUrl)?,
            minio_bucket: env::get(EnvKey::MinioBucket)?,
            minio_access_key: env::get(EnvKey::MinioAccessKey)?,
            minio_secret_key: env::get(EnvKey::MinioSecretKey)?,
            work_dir: env::get_or(EnvKey::WorkDir, "/tmp/encode-videos"),
        })
    }
}
