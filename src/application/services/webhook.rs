use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Why a delivery attempt failed. The dispatcher handles every variant the
/// same way: the message stays unsent and is picked up by a later cycle.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webhook returned non-success status: {0}")]
    Status(u16),
    #[error("webhook did not respond within {0:?}")]
    Timeout(Duration),
}

/// Sends one message to the remote endpoint.
///
/// On success returns the delivery id assigned by the remote system, or
/// `None` when the remote did not supply one. Callers that need an id for
/// every successful delivery use [`synthesize_delivery_id`] for the `None`
/// case.
#[async_trait]
pub trait WebhookClient: Send + Sync {
    async fn deliver(&self, content: &str, recipient: &str)
    -> Result<Option<String>, DeliveryError>;
}

/// Local delivery id for a message whose delivery was not tagged by the
/// remote. Unique per message and instant.
pub fn synthesize_delivery_id(message_id: i64, at: DateTime<Utc>) -> String {
    let nanos = at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| at.timestamp_micros().saturating_mul(1_000));
    format!("webhook-{message_id}-{nanos}")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn synthesized_ids_embed_message_and_instant() {
        let at = Utc.timestamp_opt(1_700_000_000, 42).unwrap();
        assert_eq!(
            synthesize_delivery_id(7, at),
            "webhook-7-1700000000000000042"
        );
    }

    #[test]
    fn synthesized_ids_differ_per_message_and_instant() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let later = at + chrono::Duration::nanoseconds(1);
        assert_ne!(synthesize_delivery_id(1, at), synthesize_delivery_id(2, at));
        assert_ne!(synthesize_delivery_id(1, at), synthesize_delivery_id(1, later));
    }
}
