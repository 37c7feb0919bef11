//! Metrics for the ingestion engine
//!
//! Each ingestion phase (polling, streaming, delivery) owns a small struct of
//! recording helpers in its own submodule, so metric names stay in one place.

pub mod delivery;
pub mod poll;
pub mod registry;
pub mod stream;

pub use delivery::DeliveryMetrics;
pub use poll::PollMetrics;
pub use stream::StreamMetrics;

use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

/// Install the Prometheus recorder with an HTTP listener on `addr`.
///
/// Idempotent. Without a call to this, the `metrics` macros are no-ops.
pub fn init_metrics(addr: SocketAddr) {
    INIT.call_once(|| {
        let builder =
            metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
        match builder.install() {
            Ok(()) => {
                info!("Prometheus exporter listening at http://{}/metrics", addr);
                registry::register_all_metrics();
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
            }
        }
    });
}

/// Implemented by each phase's metrics struct.
pub trait PhaseMetrics {
    /// Pre-register every metric so it shows up before first use.
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
}

/// Names follow tweet_ingest_{phase}_{metric}[_total].
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("tweet_ingest_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("tweet_ingest_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
