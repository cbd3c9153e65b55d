use std::env;
use std::str::FromStr;

pub enum EnvKey {
    AmqpUrl,
    AmqpRetryAttempts,
    AmqpRetryInterval,
    AmqpPublishTimeout,
    MinioUrl,
    MinioBucket,
    MinioAccessKey,
    MinioSecretKey,
    WorkDir,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::AmqpUrl => "AMQP_URL",
            EnvKey::AmqpRetryAttempts => "AMQP_RETRY_ATTEMPTS",
            EnvKey::AmqpRetryInterval => "AMQP_RETRY_INTERVAL_SECONDS",
            EnvKey::AmqpPublishTimeout => "AMQP_PUBLISH_TIMEOUT_SECONDS",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::MinioBucket => "MINIO_BUCKET_VIDEOS",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::WorkDir => "ENCODE_WORK_DIR",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
