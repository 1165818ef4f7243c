use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    application::services::webhook::{DeliveryError, WebhookClient, synthesize_delivery_id},
    domain::{
        models::{CycleReport, Message},
        repositories::{DeliveryCacheRepository, MessageRepository},
    },
};

#[derive(Debug, Clone)]
pub struct DispatchCycleConfig {
    pub batch_size: u32,
    pub delivery_timeout: Duration,
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Delivered { delivery_id: String },
    AlreadyDelivered,
    Failed,
}

/// Runs dispatch cycles: pulls unsent messages, delivers them and records
/// the outcome in the message store and the delivery cache.
///
/// Cycles never overlap: a loop started right after a stop waits for the
/// cancelled loop to finish its batch before fetching.
pub struct MessageDispatchHandler {
    messages: Arc<dyn MessageRepository>,
    cache: Arc<dyn DeliveryCacheRepository>,
    client: Arc<dyn WebhookClient>,
    config: DispatchCycleConfig,
    cycle: Mutex<()>,
}

impl MessageDispatchHandler {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        cache: Arc<dyn DeliveryCacheRepository>,
        client: Arc<dyn WebhookClient>,
        config: DispatchCycleConfig,
    ) -> Self {
        Self {
            messages,
            cache,
            client,
            config,
            cycle: Mutex::new(()),
        }
    }

    /// One pass over the oldest unsent messages. Failures are contained per
    /// message and never abort the batch.
    pub async fn run_cycle(&self) -> CycleReport {
        let _cycle = self.cycle.lock().await;
        let mut report = CycleReport::default();

        let batch = match self.messages.fetch_unsent(self.config.batch_size).await {
            Ok(batch) => batch,
            Err(err) => {
                error!(error = %err, "failed to fetch unsent messages");
                return report;
            }
        };

        if batch.is_empty() {
            debug!("no unsent messages");
            return report;
        }

        report.fetched = batch.len();
        debug!(count = batch.len(), "dispatching unsent messages");

        for message in &batch {
            match self.handle(message).await {
                MessageOutcome::Delivered { .. } => report.delivered += 1,
                MessageOutcome::AlreadyDelivered => report.skipped += 1,
                MessageOutcome::Failed => report.failed += 1,
            }
        }

        info!(
            fetched = report.fetched,
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            "dispatch cycle finished"
        );
        report
    }

    /// Delivers one message and records the outcome.
    ///
    /// A message whose prior delivery id is still cached is skipped and left
    /// unsent, so it is fetched again by every cycle and holds a batch slot
    /// until the cache entry expires.
    pub async fn handle(&self, message: &Message) -> MessageOutcome {
        // A delivery id on an unsent record means an earlier attempt got as
        // far as the webhook; the cache decides whether it went through.
        if let Some(prior) = message.prior_delivery_id() {
            match self.cache.exists(prior).await {
                Ok(true) => {
                    debug!(
                        message_id = message.id,
                        delivery_id = prior,
                        "message already delivered according to cache"
                    );
                    return MessageOutcome::AlreadyDelivered;
                }
                Ok(false) => {}
                Err(err) => {
                    error!(
                        message_id = message.id,
                        delivery_id = prior,
                        error = %err,
                        "failed to check delivery cache"
                    );
                    return MessageOutcome::Failed;
                }
            }
        }

        let remote_id = match self.deliver(message).await {
            Ok(remote_id) => remote_id,
            Err(err) => {
                warn!(message_id = message.id, error = %err, "failed to deliver message");
                return MessageOutcome::Failed;
            }
        };

        let sent_at = Utc::now();
        let delivery_id = remote_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| synthesize_delivery_id(message.id, sent_at));

        if let Err(err) = self
            .messages
            .mark_sent(message.id, &delivery_id, sent_at)
            .await
        {
            // The webhook accepted the message but nothing records it: the
            // next cycle will deliver it again.
            error!(
                message_id = message.id,
                delivery_id = %delivery_id,
                error = %err,
                "failed to mark message as sent"
            );
            return MessageOutcome::Failed;
        }

        if let Err(err) = self
            .cache
            .put(&delivery_id, sent_at, self.config.cache_ttl)
            .await
        {
            error!(
                message_id = message.id,
                delivery_id = %delivery_id,
                error = %err,
                "failed to cache delivery"
            );
        }

        info!(
            message_id = message.id,
            delivery_id = %delivery_id,
            "message sent"
        );
        MessageOutcome::Delivered { delivery_id }
    }

    async fn deliver(&self, message: &Message) -> Result<Option<String>, DeliveryError> {
        let timeout = self.config.delivery_timeout;
        tokio::time::timeout(
            timeout,
            self.client.deliver(&message.content, &message.recipient),
        )
        .await
        .map_err(|_| DeliveryError::Timeout(timeout))?
    }
}
