use crate::app::ports::{EventSink, StreamClient, StreamListener};
use crate::error::Result;
use crate::ingestion::{deliver_through_gate, GateOutcome, PauseGate};
use crate::metrics::StreamMetrics;
use crate::types::{FilterQuery, Origin, StallWarning, StreamEvent, Tweet};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Push-mode consumer. The stream transport owns pacing and reconnects;
/// this only gates and forwards statuses and logs the notices.
pub struct StreamConsumer {
    gate: Arc<PauseGate>,
    sink: Arc<dyn EventSink>,
}

impl StreamConsumer {
    pub fn new(gate: Arc<PauseGate>, sink: Arc<dyn EventSink>) -> Self {
        Self { gate, sink }
    }

    /// Register as a listener and open the sample stream (`sample`) or the filter stream.
    pub async fn start(
        self: &Arc<Self>,
        stream: &dyn StreamClient,
        filter: &FilterQuery,
        sample: bool,
    ) -> Result<()> {
        stream.add_listener(self.clone());

        let subscribed = if sample {
            info!("subscribing to the sample stream");
            stream.sample().await
        } else {
            info!("subscribing to the filter stream with {:?}", filter.to_form_params());
            stream.filter(filter).await
        };
        if let Err(e) = &subscribed {
            error!("stream subscription failed: {}", e);
        }
        subscribed
    }

    pub async fn handle(&self, event: StreamEvent) {
        match event {
            StreamEvent::Status(tweet) => self.on_status(tweet).await,
            StreamEvent::Deletion { status_id, user_id } => self.on_deletion(status_id, user_id),
            StreamEvent::TrackLimitation { limited } => self.on_track_limitation(limited),
            StreamEvent::ScrubGeo { user_id, up_to_status_id } => {
                self.on_scrub_geo(user_id, up_to_status_id)
            }
            StreamEvent::StallWarning(warning) => self.on_stall_warning(&warning),
            StreamEvent::Exception(message) => self.on_exception(&message),
        }
    }

    async fn on_status(&self, tweet: Tweet) {
        if deliver_through_gate(&self.gate, self.sink.as_ref(), &tweet, Origin::Stream).await
            == GateOutcome::Interrupted
        {
            warn!("dropping status {}: ingestion shut down while paused", tweet.id);
            StreamMetrics::record_dropped();
        }
    }

    fn on_deletion(&self, status_id: u64, user_id: u64) {
        debug!("Got a status deletion notice id:{} user:{}", status_id, user_id);
        StreamMetrics::record_notice("deletion");
    }

    fn on_track_limitation(&self, limited: u64) {
        debug!("Got track limitation notice: {}", limited);
        StreamMetrics::record_notice("track_limitation");
    }

    fn on_scrub_geo(&self, user_id: u64, up_to_status_id: u64) {
        debug!("Got scrub_geo event userId:{} upToStatusId:{}", user_id, up_to_status_id);
        StreamMetrics::record_notice("scrub_geo");
    }

    fn on_stall_warning(&self, warning: &StallWarning) {
        debug!(
            "Got stall warning {}: {} ({}% full)",
            warning.code, warning.message, warning.percent_full
        );
        StreamMetrics::record_notice("stall_warning");
    }

    fn on_exception(&self, message: &str) {
        error!("stream transport reported an error: {}", message);
        StreamMetrics::record_exception();
    }
}

#[async_trait]
impl StreamListener for StreamConsumer {
    async fn on_event(&self, event: StreamEvent) {
        self.handle(event).await;
    }
}
