use crate::app::ports::{
    ApiConnector, EventSink, ScheduledTask, SearchClient, StreamClient, TaskScheduler,
};
use crate::config::{IngestMode, SourceConfig};
use crate::constants::MANDATORY_PARAM_SIZE;
use crate::error::{IngestError, Result};
use crate::ingestion::{PauseGate, PollConsumer, StreamConsumer};
use crate::types::{FilterQuery, SearchQuery};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// The strategy a configured source ended up running.
pub enum ActiveSource {
    Live(Arc<StreamConsumer>),
    Historical(Arc<PollConsumer>),
}

/// Entry point for the host: wires sources to a strategy and owns the pause gate
/// they all share.
///
/// One engine per configured source is the normal setup. Several sources on one
/// engine share pause/resume but keep separate cursors.
pub struct IngestEngine {
    gate: Arc<PauseGate>,
    scheduled: Mutex<Vec<ScheduledTask>>,
    streams: Mutex<Vec<Arc<dyn StreamClient>>>,
}

impl Default for IngestEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestEngine {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(PauseGate::new()),
            scheduled: Mutex::new(Vec::new()),
            streams: Mutex::new(Vec::new()),
        }
    }

    pub fn gate(&self) -> Arc<PauseGate> {
        self.gate.clone()
    }

    /// Live ingestion. With only the mandatory parameters there is nothing to
    /// filter on, so the sample stream is used.
    pub async fn start_live(
        &self,
        stream: Arc<dyn StreamClient>,
        sink: Arc<dyn EventSink>,
        filter: &FilterQuery,
        param_size: usize,
    ) -> Result<Arc<StreamConsumer>> {
        self.ensure_open()?;
        let consumer = Arc::new(StreamConsumer::new(self.gate.clone(), sink));
        let sample = param_size == MANDATORY_PARAM_SIZE;
        consumer.start(stream.as_ref(), filter, sample).await?;
        self.streams
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(stream);
        Ok(consumer)
    }

    /// Historical ingestion: poll `query` now and then every `interval`.
    pub fn start_historical(
        &self,
        client: Arc<dyn SearchClient>,
        sink: Arc<dyn EventSink>,
        query: SearchQuery,
        scheduler: &dyn TaskScheduler,
        interval: Duration,
    ) -> Result<Arc<PollConsumer>> {
        self.ensure_open()?;
        let poller = Arc::new(PollConsumer::new(client, sink, self.gate.clone(), query));
        let task = poller.schedule(scheduler, interval);
        self.scheduled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(task);
        Ok(poller)
    }

    /// Start whichever strategy `source` asks for.
    pub async fn start(
        &self,
        source: &SourceConfig,
        connector: &dyn ApiConnector,
        sink: Arc<dyn EventSink>,
        scheduler: &dyn TaskScheduler,
    ) -> Result<ActiveSource> {
        info!("starting {} ingestion", source.mode.as_str());
        match source.mode {
            IngestMode::Live => {
                let consumer = self
                    .start_live(
                        connector.stream_client(),
                        sink,
                        &source.filter_query(),
                        source.param_size(),
                    )
                    .await?;
                Ok(ActiveSource::Live(consumer))
            }
            IngestMode::Historical => {
                let poller = self.start_historical(
                    connector.search_client(),
                    sink,
                    source.search_query()?,
                    scheduler,
                    source.polling_interval(),
                )?;
                Ok(ActiveSource::Historical(poller))
            }
        }
    }

    // Sources started on a closed gate would never deliver.
    fn ensure_open(&self) -> Result<()> {
        if self.gate.is_closed() {
            return Err(IngestError::Config("ingestion engine has been shut down".into()));
        }
        Ok(())
    }

    pub fn pause(&self) {
        self.gate.pause();
    }

    pub fn resume(&self) {
        self.gate.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// Close the gate, stop every scheduled poller and every stream.
    /// Waits for in-flight poll invocations to wind down. The engine cannot be
    /// started again afterwards.
    pub async fn shutdown(&self) {
        self.gate.close();

        let tasks: Vec<ScheduledTask> = std::mem::take(
            &mut *self.scheduled.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for task in tasks {
            task.cancel_and_join().await;
        }

        let streams: Vec<Arc<dyn StreamClient>> = std::mem::take(
            &mut *self.streams.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for stream in streams {
            stream.shutdown().await;
        }
        info!("ingestion engine shut down");
    }
}
