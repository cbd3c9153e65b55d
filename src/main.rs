use std::sync::Arc;

use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod config;
mod error;
mod infrastructure;
mod modules;
mod state;

use crate::config::settings::AppConfig;
use crate::infrastructure::media::ffmpeg::FfmpegEncoder;
use crate::infrastructure::queue::broker::Broker;
use crate::infrastructure::storage::s3::StorageService;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting encode service...");

    let config = AppConfig::new()?;

    let storage = StorageService::new(
        &config.minio_url,
        &config.minio_bucket,
        &config.minio_access_key,
        &config.minio_secret_key,
    )
    .await;

    let state = AppState::new(config, Arc::new(storage), Arc::new(FfmpegEncoder));

    let broker = Arc::new(Broker::new(state));
    let shutdown = CancellationToken::new();

    let mut supervisor = tokio::spawn({
        let broker = broker.clone();
        let shutdown = shutdown.clone();
        async move { broker.maintain(shutdown).await }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            shutdown.cancel();
            let _ = (&mut supervisor).await;
            info!("Shutdown complete");
        }
        result = &mut supervisor => {
            // Consuming from the broker is this service's whole purpose, so
            // a terminal connection failure ends the process.
            result??;
        }
    }

    Ok(())
}
