use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use lapin::{Connection, ConnectionProperties};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::infrastructure::queue::consumer::Consumer;
use crate::infrastructure::queue::publisher::Publisher;
use crate::modules::encode::events;
use crate::state::AppState;

/// Lifecycle of the single broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Every reconnect attempt exhausted; the process should shut down.
    Failed,
}

/// Owns the broker connection: performs the initial connect, watches
/// liveness on a fixed tick, and reconnects with bounded exponential
/// backoff. Each successful (re)connect provisions fresh channels, rebuilds
/// the publisher and restarts the consumer loop.
pub struct Broker {
    state: AppState,
    conn: Mutex<Option<Connection>>,
    status: Mutex<ConnectionState>,
    // Serializes reconnect cycles across overlapping liveness ticks.
    reconnect_lock: Mutex<()>,
}

impl Broker {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            conn: Mutex::new(None),
            status: Mutex::new(ConnectionState::Disconnected),
            reconnect_lock: Mutex::new(()),
        }
    }

    /// Supervises the connection until `shutdown` fires or reconnection is
    /// exhausted. The returned error is terminal: without a broker this
    /// service has nothing to do.
    pub async fn maintain(self: Arc<Self>, shutdown: CancellationToken) -> Result<()> {
        if let Err(e) = self.connect().await {
            error!("Initial AMQP connection attempt failed: {:#}", e);
        }

        let interval = Duration::from_secs(self.state.config.amqp_retry_interval_secs);
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick completes immediately

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("AMQP supervisor stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.ensure_connected().await {
                        error!("{:#}", e);
                        return Err(e);
                    }
                }
            }
        }
    }

    async fn ensure_connected(&self) -> Result<()> {
        let _guard = self.reconnect_lock.lock().await;

        if self.healthy().await {
            return Ok(());
        }

        warn!("AMQP health check failed, reconnecting...");
        self.set_status(ConnectionState::Reconnecting).await;

        let attempts = self.state.config.amqp_retry_attempts;
        let base = Duration::from_secs(self.state.config.amqp_retry_interval_secs);

        for attempt in 0..attempts {
            info!("AMQP connection attempt {} of {}", attempt + 1, attempts);

            match self.connect().await {
                Ok(()) => return Ok(()),
                Err(e) => warn!("AMQP connection attempt failed: {:#}", e),
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(backoff_delay(base, attempt)).await;
            }
        }

        self.set_status(ConnectionState::Failed).await;

        bail!("Could not reconnect to AMQP after {} attempts", attempts)
    }

    async fn set_status(&self, next: ConnectionState) {
        let mut status = self.status.lock().await;

        if *status != next {
            debug!("AMQP connection state: {:?} -> {:?}", *status, next);
        }

        *status = next;
    }

    /// A connection declared `Failed` stays unhealthy even if the underlying
    /// socket still reports itself alive.
    async fn healthy(&self) -> bool {
        if *self.status.lock().await == ConnectionState::Failed {
            return false;
        }

        match self.conn.lock().await.as_ref() {
            Some(conn) => conn.status().connected(),
            None => false,
        }
    }

    async fn connect(&self) -> Result<()> {
        self.set_status(ConnectionState::Connecting).await;

        let result = self.try_connect().await;

        self.set_status(if result.is_ok() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        })
        .await;

        result
    }

    async fn try_connect(&self) -> Result<()> {
        let config = &self.state.config;

        let conn = Connection::connect(&config.amqp_url, ConnectionProperties::default())
            .await
            .map_err(|e| anyhow!("Failed to connect to AMQP: {}", e))?;

        info!("✅ Connected to AMQP");

        let publisher_channel = conn
            .create_channel()
            .await
            .map_err(|e| anyhow!("Failed to create publisher channel: {}", e))?;

        let consumer_channel = conn
            .create_channel()
            .await
            .map_err(|e| anyhow!("Failed to create consumer channel: {}", e))?;

        let publisher = Arc::new(Publisher::new(
            publisher_channel,
            Duration::from_secs(config.amqp_publish_timeout_secs),
        ));
        let consumer = Consumer::new(consumer_channel, self.state.clone(), publisher);

        // Ends on its own when the connection drops; the next reconnect
        // spawns a replacement.
        tokio::spawn(async move {
            if let Err(e) = consumer.subscribe(events::QUEUE_ENCODE_SERVICE).await {
                error!("AMQP consumer stopped: {:#}", e);
            }
        });

        *self.conn.lock().await = Some(conn);

        Ok(())
    }
}

/// Inter-attempt reconnect delay: `base * 2^attempt`, attempt 0-indexed.
pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::settings::AppConfig;
    use crate::infrastructure::media::MockMediaEncoder;
    use crate::infrastructure::storage::MockObjectStorage;

    fn test_state() -> AppState {
        let config = AppConfig {
            amqp_url: "amqp://localhost".to_string(),
            amqp_retry_attempts: 3,
            amqp_retry_interval_secs: 10,
            amqp_publish_timeout_secs: 5,
            minio_url: String::new(),
            minio_bucket: String::new(),
            minio_access_key: String::new(),
            minio_secret_key: String::new(),
            work_dir: "/tmp".to_string(),
        };

        AppState::new(
            config,
            Arc::new(MockObjectStorage::new()),
            Arc::new(MockMediaEncoder::new()),
        )
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_secs(10);

        assert_eq!(backoff_delay(base, 0), Duration::from_secs(10));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(20));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(40));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(80));
    }

    #[tokio::test]
    async fn starts_disconnected_and_unhealthy() {
        let broker = Broker::new(test_state());

        assert_eq!(*broker.status.lock().await, ConnectionState::Disconnected);
        assert!(!broker.healthy().await);
    }

    #[tokio::test]
    async fn records_state_transitions() {
        let broker = Broker::new(test_state());

        broker.set_status(ConnectionState::Connecting).await;
        assert_eq!(*broker.status.lock().await, ConnectionState::Connecting);

        broker.set_status(ConnectionState::Reconnecting).await;
        assert_eq!(*broker.status.lock().await, ConnectionState::Reconnecting);
    }

    #[tokio::test]
    async fn failed_state_is_never_healthy() {
        let broker = Broker::new(test_state());

        broker.set_status(ConnectionState::Failed).await;

        assert!(!broker.healthy().await);
    }
}
