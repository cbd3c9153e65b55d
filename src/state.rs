use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::media::MediaEncoder;
use crate::infrastructure::storage::ObjectStorage;

/// Handles shared by every component: configuration plus the two external
/// collaborators (object storage and the media encoder), passed in at
/// construction so nothing reaches for globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStorage>,
    pub encoder: Arc<dyn MediaEncoder>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStorage>,
        encoder: Arc<dyn MediaEncoder>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            encoder,
        }
    }
}
