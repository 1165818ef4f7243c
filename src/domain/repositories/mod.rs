use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::models::{DispatchState, Message, NewMessage};

/// Durable source of truth for messages and their sent state.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Up to `limit` unsent messages, oldest first.
    async fn fetch_unsent(&self, limit: u32) -> anyhow::Result<Vec<Message>>;

    /// Marks an unsent message as sent. Fails if the message is unknown or
    /// was already marked.
    async fn mark_sent(
        &self,
        id: i64,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// One page of sent messages, most recently sent first, and the total
    /// number of sent messages.
    async fn list_sent(&self, page: u32, limit: u32) -> anyhow::Result<(Vec<Message>, u64)>;

    async fn get(&self, id: i64) -> anyhow::Result<Option<Message>>;

    async fn insert(&self, message: NewMessage) -> anyhow::Result<i64>;
}

/// Shared flag recording whether dispatch is active.
#[async_trait]
pub trait DispatchStatusRepository: Send + Sync {
    async fn get(&self) -> anyhow::Result<DispatchState>;
    async fn set(&self, state: DispatchState) -> anyhow::Result<()>;
}

/// TTL-bounded record of delivery ids that were already acted upon.
#[async_trait]
pub trait DeliveryCacheRepository: Send + Sync {
    async fn exists(&self, delivery_id: &str) -> anyhow::Result<bool>;
    async fn put(
        &self,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
        ttl: Duration,
    ) -> anyhow::Result<()>;
    async fn list_all(&self) -> anyhow::Result<HashMap<String, DateTime<Utc>>>;
}
