#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use message_dispatcher::{
    application::{
        handlers::message_dispatcher::{DispatchCycleConfig, MessageDispatchHandler},
        services::{
            dispatcher::Dispatcher,
            webhook::{DeliveryError, WebhookClient},
        },
    },
    domain::{
        models::{DispatchState, Message, NewMessage},
        repositories::{DeliveryCacheRepository, DispatchStatusRepository, MessageRepository},
    },
    infrastructure::repositories::in_memory::{
        InMemoryDeliveryCacheRepository, InMemoryDispatchStatusRepository,
        InMemoryMessageRepository,
    },
};

/// What the scripted webhook answers for one delivery.
#[derive(Clone, Debug)]
pub enum Reply {
    Id(&'static str),
    NoId,
    Status(u16),
    /// Accepts without an id after the given number of milliseconds.
    Slow(u64),
    Hang,
}

/// Webhook double. Replies are queued per message content; content without
/// a queued reply is accepted without an id.
#[derive(Default)]
pub struct ScriptedWebhook {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedWebhook {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, content: &str, replies: impl IntoIterator<Item = Reply>) {
        self.replies
            .lock()
            .unwrap()
            .entry(content.to_string())
            .or_default()
            .extend(replies);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, content: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == content)
            .count()
    }
}

#[async_trait]
impl WebhookClient for ScriptedWebhook {
    async fn deliver(
        &self,
        content: &str,
        _recipient: &str,
    ) -> Result<Option<String>, DeliveryError> {
        self.calls.lock().unwrap().push(content.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(content)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Reply::NoId);

        match reply {
            Reply::Id(id) => Ok(Some(id.to_string())),
            Reply::NoId => Ok(None),
            Reply::Status(code) => Err(DeliveryError::Status(code)),
            Reply::Slow(millis) => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(None)
            }
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
        }
    }
}

/// Message store that fails `mark_sent` for chosen ids a set number of
/// times before delegating.
pub struct FlakyMessageRepository {
    inner: InMemoryMessageRepository,
    mark_sent_failures: Mutex<HashMap<i64, usize>>,
}

impl FlakyMessageRepository {
    pub fn new(inner: InMemoryMessageRepository) -> Arc<Self> {
        Arc::new(Self {
            inner,
            mark_sent_failures: Mutex::new(HashMap::new()),
        })
    }

    pub fn fail_mark_sent(&self, id: i64, times: usize) {
        self.mark_sent_failures.lock().unwrap().insert(id, times);
    }

    pub async fn all(&self) -> Vec<Message> {
        self.inner.all().await
    }

    pub async fn by_id(&self, id: i64) -> Message {
        self.inner.get(id).await.unwrap().unwrap()
    }
}

#[async_trait]
impl MessageRepository for FlakyMessageRepository {
    async fn fetch_unsent(&self, limit: u32) -> anyhow::Result<Vec<Message>> {
        self.inner.fetch_unsent(limit).await
    }

    async fn mark_sent(
        &self,
        id: i64,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        {
            let mut failures = self.mark_sent_failures.lock().unwrap();
            if let Some(left) = failures.get_mut(&id).filter(|left| **left > 0) {
                *left -= 1;
                anyhow::bail!("connection reset while updating message {id}");
            }
        }
        self.inner.mark_sent(id, delivery_id, sent_at).await
    }

    async fn list_sent(&self, page: u32, limit: u32) -> anyhow::Result<(Vec<Message>, u64)> {
        self.inner.list_sent(page, limit).await
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<Message>> {
        self.inner.get(id).await
    }

    async fn insert(&self, message: NewMessage) -> anyhow::Result<i64> {
        self.inner.insert(message).await
    }
}

/// Delivery cache whose lookups or writes can be switched to fail.
#[derive(Default)]
pub struct FlakyDeliveryCacheRepository {
    inner: InMemoryDeliveryCacheRepository,
    fail_exists: AtomicBool,
    fail_put: AtomicBool,
}

impl FlakyDeliveryCacheRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_lookups(&self) {
        self.fail_exists.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_put.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeliveryCacheRepository for FlakyDeliveryCacheRepository {
    async fn exists(&self, delivery_id: &str) -> anyhow::Result<bool> {
        if self.fail_exists.load(Ordering::SeqCst) {
            anyhow::bail!("cache timed out looking up {delivery_id}");
        }
        self.inner.exists(delivery_id).await
    }

    async fn put(
        &self,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
        ttl: Duration,
    ) -> anyhow::Result<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            anyhow::bail!("cache rejected write for {delivery_id}");
        }
        self.inner.put(delivery_id, sent_at, ttl).await
    }

    async fn list_all(&self) -> anyhow::Result<HashMap<String, DateTime<Utc>>> {
        self.inner.list_all().await
    }
}

/// Status store whose writes always fail.
#[derive(Default)]
pub struct ReadOnlyStatusRepository;

#[async_trait]
impl DispatchStatusRepository for ReadOnlyStatusRepository {
    async fn get(&self) -> anyhow::Result<DispatchState> {
        Ok(DispatchState::Stopped)
    }

    async fn set(&self, _state: DispatchState) -> anyhow::Result<()> {
        anyhow::bail!("status store is read-only")
    }
}

/// Status store that cannot be reached at all.
#[derive(Default)]
pub struct UnreachableStatusRepository;

#[async_trait]
impl DispatchStatusRepository for UnreachableStatusRepository {
    async fn get(&self) -> anyhow::Result<DispatchState> {
        anyhow::bail!("status store unreachable")
    }

    async fn set(&self, _state: DispatchState) -> anyhow::Result<()> {
        anyhow::bail!("status store unreachable")
    }
}

pub fn unsent(id: i64) -> Message {
    Message {
        id,
        content: format!("m{id}"),
        recipient: format!("+9055500000{id:02}"),
        sent: false,
        sent_at: None,
        delivery_id: None,
        created_at: Utc::now(),
    }
}

pub fn sent(id: i64, delivery_id: &str, sent_at: DateTime<Utc>) -> Message {
    Message {
        sent: true,
        sent_at: Some(sent_at),
        delivery_id: Some(delivery_id.to_string()),
        ..unsent(id)
    }
}

pub fn cycle_config(batch_size: u32) -> DispatchCycleConfig {
    DispatchCycleConfig {
        batch_size,
        delivery_timeout: Duration::from_millis(200),
        cache_ttl: Duration::from_secs(60),
    }
}

/// Everything a test needs to drive cycles and inspect the stores.
pub struct Harness {
    pub messages: Arc<FlakyMessageRepository>,
    pub cache: Arc<FlakyDeliveryCacheRepository>,
    pub webhook: Arc<ScriptedWebhook>,
    pub handler: Arc<MessageDispatchHandler>,
}

impl Harness {
    pub fn new(seed: Vec<Message>, config: DispatchCycleConfig) -> Self {
        let messages = FlakyMessageRepository::new(InMemoryMessageRepository::with_messages(seed));
        let cache = FlakyDeliveryCacheRepository::new();
        let webhook = ScriptedWebhook::new();
        let handler = Arc::new(MessageDispatchHandler::new(
            messages.clone(),
            cache.clone(),
            webhook.clone(),
            config,
        ));
        Self {
            messages,
            cache,
            webhook,
            handler,
        }
    }

    pub fn dispatcher(&self, status: Arc<dyn DispatchStatusRepository>) -> Dispatcher {
        Dispatcher::new(
            status,
            self.messages.clone(),
            self.cache.clone(),
            self.handler.clone(),
            Duration::from_secs(3600),
        )
    }

    pub fn dispatcher_with_memory_status(&self) -> Dispatcher {
        self.dispatcher(Arc::new(InMemoryDispatchStatusRepository::new()))
    }

    pub async fn unsent_ids(&self) -> HashSet<i64> {
        self.messages
            .all()
            .await
            .into_iter()
            .filter(|m| !m.sent)
            .map(|m| m.id)
            .collect()
    }
}
