use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel};
use serde::Serialize;
use tracing::info;

use crate::modules::encode::events::{self, Envelope, VideoEncodingCompletedMessage};

/// The one outbound event the consumer needs to send. A seam so the
/// dispatch/ack path can be tested without a live channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionPublisher: Send + Sync {
    async fn publish_completion(&self, message: VideoEncodingCompletedMessage) -> Result<()>;
}

/// Sends completion events: declares the destination queue durable and
/// publishes persistent JSON messages, waiting for the broker confirm under
/// a bounded timeout.
#[derive(Clone)]
pub struct Publisher {
    channel: Channel,
    timeout: Duration,
}

impl Publisher {
    pub fn new(channel: Channel, timeout: Duration) -> Self {
        Self { channel, timeout }
    }

    pub async fn publish<T: Serialize>(&self, queue: &str, envelope: &Envelope<T>) -> Result<()> {
        let payload = serde_json::to_vec(envelope)
            .map_err(|e| anyhow!("Unable to serialize {} message: {}", envelope.key, e))?;

        self.declare(queue).await?;

        // The timeout bounds delivery and confirm only.
        tokio::time::timeout(self.timeout, self.deliver(queue, &payload))
            .await
            .map_err(|_| {
                anyhow!(
                    "Publish to {:?} timed out after {:?}",
                    queue,
                    self.timeout
                )
            })??;

        info!("Message {:?} sent to {:?}", envelope.key, queue);

        Ok(())
    }

    async fn declare(&self, queue: &str) -> Result<()> {
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| anyhow!("Failed to declare queue {}: {}", queue, e))?;

        Ok(())
    }

    async fn deliver(&self, queue: &str, payload: &[u8]) -> Result<()> {
        self.channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_delivery_mode(2), // Persistent
            )
            .await
            .map_err(|e| anyhow!("Failed to publish message: {}", e))?
            .await
            .map_err(|e| anyhow!("Failed to confirm publication: {}", e))?;

        Ok(())
    }
}

#[async_trait]
impl CompletionPublisher for Publisher {
    async fn publish_completion(&self, message: VideoEncodingCompletedMessage) -> Result<()> {
        let envelope = Envelope {
            key: events::MESSAGE_VIDEO_ENCODING_COMPLETED,
            data: message,
        };

        self.publish(events::QUEUE_VIDEO_CATALOG_SERVICE, &envelope)
            .await
    }
}
