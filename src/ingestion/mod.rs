//! The consumption engine: live streaming and historical polling, both feeding
//! the sink through one shared [`PauseGate`].

pub mod facade;
pub mod pause_gate;
pub mod poll_consumer;
pub mod rate_limiter;
pub mod stream_consumer;

pub use facade::{ActiveSource, IngestEngine};
pub use pause_gate::{GateOutcome, GateState, PauseGate};
pub use poll_consumer::{CycleOutcome, CycleReport, PollConsumer};
pub use rate_limiter::RateLimiter;
pub use stream_consumer::StreamConsumer;

use crate::app::ports::EventSink;
use crate::metrics::DeliveryMetrics;
use crate::types::{EventMeta, Origin, Tweet};
use tracing::error;

/// Wait at the gate, then hand one item to the sink.
///
/// A sink failure is logged and counted; the item counts as consumed.
/// `Interrupted` means the gate closed and nothing was delivered.
pub(crate) async fn deliver_through_gate(
    gate: &PauseGate,
    sink: &dyn EventSink,
    tweet: &Tweet,
    origin: Origin,
) -> GateOutcome {
    if gate.await_if_paused().await == GateOutcome::Interrupted {
        return GateOutcome::Interrupted;
    }

    let meta = EventMeta { origin, item_id: tweet.id };
    match sink.deliver(&tweet.raw, Some(&meta)).await {
        Ok(()) => DeliveryMetrics::record_delivered(origin, tweet.raw.len()),
        Err(e) => {
            error!("sink rejected {} item {}: {}", origin.as_str(), tweet.id, e);
            DeliveryMetrics::record_sink_error(origin);
        }
    }
    GateOutcome::Proceed
}
