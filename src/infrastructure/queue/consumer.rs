use std::sync::Arc;

use anyhow::{Result, anyhow};
use futures_util::StreamExt;
use lapin::Channel;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use metrics::counter;
use tracing::{error, info, warn};

use crate::infrastructure::queue::publisher::CompletionPublisher;
use crate::modules::encode::events::{self, RawEnvelope, VideoUploadedMessage};
use crate::modules::encode::service::EncodeService;
use crate::state::AppState;

/// Fate of one delivery. `Skip` leaves it unacknowledged so the broker
/// redelivers it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Skip,
}

/// Decides what to do with a delivery without touching the channel: decode
/// the envelope, run the encode pipeline, publish the completion event. A
/// delivery is acknowledged only when all of that succeeded.
pub struct Dispatcher {
    service: EncodeService,
    publisher: Arc<dyn CompletionPublisher>,
}

impl Dispatcher {
    pub fn new(state: AppState, publisher: Arc<dyn CompletionPublisher>) -> Self {
        Self {
            service: EncodeService::new(state),
            publisher,
        }
    }

    pub async fn dispatch(&self, payload: &[u8]) -> Disposition {
        let envelope: RawEnvelope = match serde_json::from_slice(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("Failed to decode message envelope: {}", e);
                return Disposition::Skip;
            }
        };

        counter!("amqp_messages_received_total", "key" => envelope.key.clone()).increment(1);
        info!("📦 Message received: {:?}", envelope.key);

        match envelope.key.as_str() {
            events::MESSAGE_ENCODE_UPLOADED_VIDEO => {
                let job: VideoUploadedMessage = match serde_json::from_value(envelope.data) {
                    Ok(job) => job,
                    Err(e) => {
                        error!(
                            "Invalid {} payload: {}",
                            events::MESSAGE_ENCODE_UPLOADED_VIDEO,
                            e
                        );
                        return Disposition::Skip;
                    }
                };

                match self.process(&job).await {
                    Ok(()) => Disposition::Ack,
                    Err(e) => {
                        counter!("amqp_message_failures_total", "key" => events::MESSAGE_ENCODE_UPLOADED_VIDEO)
                            .increment(1);
                        error!("❌ Failed to process video {}: {:#}", job.video_id, e);
                        Disposition::Skip
                    }
                }
            }
            key => {
                warn!("Unrecognized message key {:?}", key);
                Disposition::Skip
            }
        }
    }

    async fn process(&self, job: &VideoUploadedMessage) -> Result<()> {
        let completed = self.service.run(job).await?;
        self.publisher.publish_completion(completed).await?;

        Ok(())
    }
}

/// Consumes the inbound job queue and applies the dispatcher's verdict to
/// each delivery.
pub struct Consumer {
    channel: Channel,
    dispatcher: Dispatcher,
}

impl Consumer {
    pub fn new(channel: Channel, state: AppState, publisher: Arc<dyn CompletionPublisher>) -> Self {
        Self {
            channel,
            dispatcher: Dispatcher::new(state, publisher),
        }
    }

    pub async fn subscribe(self, queue: &str) -> Result<()> {
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

        let mut deliveries = self
            .channel
            .basic_consume(
                queue,
                "encode_worker",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| anyhow!("Failed to create consumer on {}: {}", queue, e))?;

        info!("🎥 Listening on queue {:?}", queue);

        // Strictly sequential: one ffmpeg pipeline at a time is all this
        // instance is sized for.
        while let Some(delivery) = deliveries.next().await {
            match delivery {
                Ok(delivery) => {
                    if self.dispatcher.dispatch(&delivery.data).await == Disposition::Ack {
                        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                            error!("Failed to ack message: {}", e);
                        }
                    }
                }
                Err(e) => error!("AMQP delivery error: {}", e),
            }
        }

        warn!("Delivery stream for {:?} closed", queue);

        Ok(())
    }
}
