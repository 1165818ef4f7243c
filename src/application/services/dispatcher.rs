use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    application::handlers::message_dispatcher::MessageDispatchHandler,
    domain::{
        errors::DispatcherError,
        models::{DispatchAction, DispatchState, Message, SentMessagesPage},
        repositories::{DeliveryCacheRepository, DispatchStatusRepository, MessageRepository},
    },
};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Page and limit after falling back to the defaults for invalid input.
pub fn normalize_page(page: Option<i64>, limit: Option<i64>) -> (u32, u32) {
    let page = page
        .filter(|page| *page >= 1)
        .and_then(|page| u32::try_from(page).ok())
        .unwrap_or(DEFAULT_PAGE);
    let limit = limit
        .filter(|limit| (1..=i64::from(MAX_PAGE_LIMIT)).contains(limit))
        .map(|limit| limit as u32)
        .unwrap_or(DEFAULT_PAGE_LIMIT);
    (page, limit)
}

struct DispatchWorker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl DispatchWorker {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }
}

/// Owns the start/stop state machine and the background polling loop.
///
/// `start` and `stop` are serialized by one lock; `status` and the read-only
/// queries never take it. The status store is the durable record of the
/// state, the local worker only mirrors it for this process.
pub struct Dispatcher {
    status_repo: Arc<dyn DispatchStatusRepository>,
    messages: Arc<dyn MessageRepository>,
    cache: Arc<dyn DeliveryCacheRepository>,
    handler: Arc<MessageDispatchHandler>,
    interval: Duration,
    worker: Mutex<Option<DispatchWorker>>,
}

impl Dispatcher {
    pub fn new(
        status_repo: Arc<dyn DispatchStatusRepository>,
        messages: Arc<dyn MessageRepository>,
        cache: Arc<dyn DeliveryCacheRepository>,
        handler: Arc<MessageDispatchHandler>,
        interval: Duration,
    ) -> Self {
        Self {
            status_repo,
            messages,
            cache,
            handler,
            interval,
            worker: Mutex::new(None),
        }
    }

    pub async fn apply(&self, action: DispatchAction) -> Result<(), DispatcherError> {
        match action {
            DispatchAction::Start => self.start().await,
            DispatchAction::Stop => self.stop().await,
        }
    }

    pub async fn start(&self) -> Result<(), DispatcherError> {
        let mut worker = self.worker.lock().await;

        let state = self
            .status_repo
            .get()
            .await
            .map_err(DispatcherError::StatusRead)?;
        if state == DispatchState::Running {
            debug!("dispatcher already running");
            return Ok(());
        }

        self.status_repo
            .set(DispatchState::Running)
            .await
            .map_err(DispatcherError::StatusWrite)?;

        // A loop can outlive its state when another process stopped dispatch.
        if let Some(stale) = worker.take() {
            stale.cancel.cancel();
        }
        *worker = Some(self.spawn_worker());

        info!(interval = ?self.interval, "dispatcher started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), DispatcherError> {
        let mut worker = self.worker.lock().await;

        let state = self
            .status_repo
            .get()
            .await
            .map_err(DispatcherError::StatusRead)?;
        if state == DispatchState::Stopped {
            if let Some(stale) = worker.take() {
                stale.cancel.cancel();
            }
            debug!("dispatcher already stopped");
            return Ok(());
        }

        self.status_repo
            .set(DispatchState::Stopped)
            .await
            .map_err(DispatcherError::StatusWrite)?;

        // In-flight deliveries finish on their own; no new cycle starts.
        if let Some(current) = worker.take() {
            current.cancel.cancel();
        }

        info!("dispatcher stopped");
        Ok(())
    }

    pub async fn status(&self) -> Result<DispatchState, DispatcherError> {
        self.status_repo
            .get()
            .await
            .map_err(DispatcherError::StatusRead)
    }

    /// Relaunches the loop after a restart when the persisted state says
    /// dispatch should be running. The persisted state is left as is.
    pub async fn resume(&self) -> Result<bool, DispatcherError> {
        let mut worker = self.worker.lock().await;

        let state = self
            .status_repo
            .get()
            .await
            .map_err(DispatcherError::StatusRead)?;
        if state != DispatchState::Running {
            return Ok(false);
        }
        if worker.as_ref().is_some_and(DispatchWorker::is_live) {
            return Ok(false);
        }

        *worker = Some(self.spawn_worker());
        info!(interval = ?self.interval, "dispatcher resumed from persisted state");
        Ok(true)
    }

    /// Cancels the local loop on process exit without touching the persisted
    /// state, so a restarted process can resume.
    pub async fn shutdown(&self) {
        if let Some(current) = self.worker.lock().await.take() {
            current.cancel.cancel();
            info!("dispatcher loop cancelled for shutdown");
        }
    }

    /// Whether this process currently owns a live polling loop.
    pub async fn is_polling(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(DispatchWorker::is_live)
    }

    pub async fn list_sent(
        &self,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<SentMessagesPage, DispatcherError> {
        let (page, limit) = normalize_page(page, limit);
        let (messages, total) = self
            .messages
            .list_sent(page, limit)
            .await
            .map_err(DispatcherError::Storage)?;

        Ok(SentMessagesPage {
            messages,
            total,
            page,
            limit,
        })
    }

    pub async fn message(&self, id: i64) -> Result<Option<Message>, DispatcherError> {
        self.messages
            .get(id)
            .await
            .map_err(DispatcherError::Storage)
    }

    pub async fn cached_deliveries(
        &self,
    ) -> Result<HashMap<String, DateTime<Utc>>, DispatcherError> {
        self.cache.list_all().await.map_err(DispatcherError::Storage)
    }

    fn spawn_worker(&self) -> DispatchWorker {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handler = self.handler.clone();
        let period = self.interval;

        let handle = tokio::spawn(async move {
            // The first tick completes immediately.
            let mut ticker = interval(period.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        handler.run_cycle().await;
                    }
                }
            }

            debug!("dispatch loop exited");
        });

        DispatchWorker { cancel, handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_pagination_falls_back_to_defaults() {
        assert_eq!(normalize_page(Some(0), Some(500)), (1, 10));
        assert_eq!(normalize_page(Some(-3), Some(0)), (1, 10));
        assert_eq!(normalize_page(None, None), (1, 10));
    }

    #[test]
    fn valid_pagination_is_kept() {
        assert_eq!(normalize_page(Some(2), Some(5)), (2, 5));
        assert_eq!(normalize_page(Some(1), Some(100)), (1, 100));
        assert_eq!(normalize_page(Some(7), Some(101)), (7, 10));
    }
}
