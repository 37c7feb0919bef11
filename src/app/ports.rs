use crate::error::Result;
use crate::types::{EventMeta, FilterQuery, SearchPage, SearchQuery, StreamEvent};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

// Poll-side ports
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run one search request. A query carrying a `next_page` cursor fetches that page.
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage>;
}

// Stream-side ports
#[async_trait]
pub trait StreamListener: Send + Sync {
    async fn on_event(&self, event: StreamEvent);
}

#[async_trait]
pub trait StreamClient: Send + Sync {
    fn add_listener(&self, listener: Arc<dyn StreamListener>);
    /// Start consuming the unfiltered sample stream.
    async fn sample(&self) -> Result<()>;
    /// Start consuming the stream restricted to `filter`.
    async fn filter(&self, filter: &FilterQuery) -> Result<()>;
    /// Stop the transport. Listeners receive nothing after this returns.
    async fn shutdown(&self);
}

/// Hands out authenticated clients for one API account.
pub trait ApiConnector: Send + Sync {
    fn search_client(&self) -> Arc<dyn SearchClient>;
    fn stream_client(&self) -> Arc<dyn StreamClient>;
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, raw: &str, meta: Option<&EventMeta>) -> Result<()>;
}

// Scheduling substrate
#[async_trait]
pub trait PeriodicTask: Send + Sync {
    async fn run(&self);
}

pub trait TaskScheduler: Send + Sync {
    /// Run `task` after `initial_delay` and then once per `period`.
    /// Invocations never overlap; ticks missed while a run is in flight are skipped.
    fn schedule_at_fixed_rate(
        &self,
        task: Arc<dyn PeriodicTask>,
        initial_delay: Duration,
        period: Duration,
    ) -> ScheduledTask;
}

/// Handle to a scheduled task. Cancelling stops future invocations only;
/// an invocation already running is left to finish. Dropping the handle
/// detaches the task, which then runs until the runtime shuts down.
#[derive(Debug)]
#[must_use = "dropping the handle detaches the task; keep it to cancel later"]
pub struct ScheduledTask {
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn new(stop: watch::Sender<bool>, handle: JoinHandle<()>) -> Self {
        Self { stop, handle: Some(handle) }
    }

    pub fn cancel(&self) {
        self.stop.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.stop.borrow()
    }

    /// Cancel and wait for the in-flight invocation, if any, to finish.
    pub async fn cancel_and_join(mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
