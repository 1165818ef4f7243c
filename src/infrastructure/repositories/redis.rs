use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tracing::warn;

use crate::domain::{
    models::{DeliveryRecord, DispatchState},
    repositories::{DeliveryCacheRepository, DispatchStatusRepository},
};

#[derive(Clone)]
pub struct RedisConfig {
    pub url: String,
    pub status_key: String,
    pub sent_prefix: String,
    pub cache_ttl: Duration,
}

pub async fn connect(url: &str) -> anyhow::Result<MultiplexedConnection> {
    let client = Client::open(url)?;
    let mut conn = client.get_multiplexed_async_connection().await?;
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;
    Ok(conn)
}

/// Dispatch state stored under a single string key. A missing key reads
/// as stopped.
#[derive(Clone)]
pub struct RedisDispatchStatusRepository {
    conn: MultiplexedConnection,
    key: String,
}

impl RedisDispatchStatusRepository {
    pub fn new(conn: MultiplexedConnection, key: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            conn,
            key: key.into(),
        })
    }
}

#[async_trait]
impl DispatchStatusRepository for RedisDispatchStatusRepository {
    async fn get(&self) -> anyhow::Result<DispatchState> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(&self.key).await?;
        match value {
            None => Ok(DispatchState::Stopped),
            Some(value) => DispatchState::from_str(&value)
                .ok_or_else(|| anyhow::anyhow!("unknown dispatch state {value}")),
        }
    }

    async fn set(&self, state: DispatchState) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(&self.key, state.as_str()).await?;
        Ok(())
    }
}

/// Delivery records stored as JSON under `prefix + delivery_id`, each with
/// its own expiry.
#[derive(Clone)]
pub struct RedisDeliveryCacheRepository {
    conn: MultiplexedConnection,
    prefix: String,
}

impl RedisDeliveryCacheRepository {
    pub fn new(conn: MultiplexedConnection, prefix: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            conn,
            prefix: prefix.into(),
        })
    }

    fn key(&self, delivery_id: &str) -> String {
        format!("{}{}", self.prefix, delivery_id)
    }
}

#[async_trait]
impl DeliveryCacheRepository for RedisDeliveryCacheRepository {
    async fn exists(&self, delivery_id: &str) -> anyhow::Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(self.key(delivery_id)).await?;
        Ok(exists)
    }

    async fn put(
        &self,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
        ttl: Duration,
    ) -> anyhow::Result<()> {
        let payload = serde_json::to_string(&DeliveryRecord {
            delivery_id: delivery_id.to_string(),
            sent_at,
        })?;
        let seconds = ttl.as_secs().max(1) as usize;
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(self.key(delivery_id), payload, seconds).await?;
        Ok(())
    }

    async fn list_all(&self) -> anyhow::Result<HashMap<String, DateTime<Utc>>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(format!("{}*", self.prefix)).await?;

        let mut records = HashMap::with_capacity(keys.len());
        for key in keys {
            // Entries may expire between KEYS and GET.
            let Some(payload): Option<String> = conn.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<DeliveryRecord>(&payload) {
                Ok(record) => {
                    records.insert(record.delivery_id, record.sent_at);
                }
                Err(err) => warn!(key = %key, error = %err, "skipping unreadable delivery record"),
            }
        }
        Ok(records)
    }
}
