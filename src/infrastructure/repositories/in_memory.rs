use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::{sync::RwLock, time::Instant};

use crate::domain::{
    models::{DispatchState, Message, NewMessage},
    repositories::{DeliveryCacheRepository, DispatchStatusRepository, MessageRepository},
};

#[derive(Default)]
struct MessageTable {
    rows: BTreeMap<i64, Message>,
    last_id: i64,
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    table: Arc<RwLock<MessageTable>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing records, keeping their ids.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        let last_id = messages.iter().map(|m| m.id).max().unwrap_or(0);
        let rows = messages.into_iter().map(|m| (m.id, m)).collect();
        Self {
            table: Arc::new(RwLock::new(MessageTable { rows, last_id })),
        }
    }

    pub async fn all(&self) -> Vec<Message> {
        self.table.read().await.rows.values().cloned().collect()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn fetch_unsent(&self, limit: u32) -> anyhow::Result<Vec<Message>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|m| !m.sent)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_sent(
        &self,
        id: i64,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut table = self.table.write().await;
        let message = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("message {id} not found"))?;
        if message.sent {
            anyhow::bail!("message {id} is already marked as sent");
        }
        message.sent = true;
        message.sent_at = Some(sent_at);
        message.delivery_id = Some(delivery_id.to_string());
        Ok(())
    }

    async fn list_sent(&self, page: u32, limit: u32) -> anyhow::Result<(Vec<Message>, u64)> {
        let table = self.table.read().await;
        let mut sent: Vec<&Message> = table.rows.values().filter(|m| m.sent).collect();
        sent.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then(b.id.cmp(&a.id)));

        let total = sent.len() as u64;
        let offset = page.saturating_sub(1) as usize * limit as usize;
        let messages = sent
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((messages, total))
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<Message>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn insert(&self, message: NewMessage) -> anyhow::Result<i64> {
        let mut table = self.table.write().await;
        table.last_id += 1;
        let id = table.last_id;
        table.rows.insert(
            id,
            Message {
                id,
                content: message.content,
                recipient: message.recipient,
                sent: false,
                sent_at: None,
                delivery_id: None,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }
}

#[derive(Default)]
pub struct InMemoryDispatchStatusRepository {
    state: Arc<RwLock<DispatchState>>,
}

impl InMemoryDispatchStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DispatchStatusRepository for InMemoryDispatchStatusRepository {
    async fn get(&self) -> anyhow::Result<DispatchState> {
        Ok(*self.state.read().await)
    }

    async fn set(&self, state: DispatchState) -> anyhow::Result<()> {
        *self.state.write().await = state;
        Ok(())
    }
}

struct CachedDelivery {
    sent_at: DateTime<Utc>,
    expires_at: Instant,
}

/// Delivery cache with per-entry expiry, checked on read.
#[derive(Default)]
pub struct InMemoryDeliveryCacheRepository {
    entries: Arc<RwLock<HashMap<String, CachedDelivery>>>,
}

impl InMemoryDeliveryCacheRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryCacheRepository for InMemoryDeliveryCacheRepository {
    async fn exists(&self, delivery_id: &str) -> anyhow::Result<bool> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(delivery_id)
            .is_some_and(|entry| entry.expires_at > Instant::now()))
    }

    async fn put(
        &self,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
        ttl: Duration,
    ) -> anyhow::Result<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            delivery_id.to_string(),
            CachedDelivery {
                sent_at,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn list_all(&self) -> anyhow::Result<HashMap<String, DateTime<Utc>>> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(id, entry)| (id.clone(), entry.sent_at))
            .collect())
    }
}
