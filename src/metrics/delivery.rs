//! Delivery Phase Metrics
//!
//! What reached the sink, split by the strategy that produced it.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};
use crate::types::Origin;

pub struct DeliveryMetrics;

impl DeliveryMetrics {
    pub fn record_delivered(origin: Origin, payload_bytes: usize) {
        ::metrics::counter!(
            phase_metric!(counter, "delivery", "events"),
            "origin" => origin.as_str()
        )
        .increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "delivery", "payload_bytes"))
            .record(payload_bytes as f64);
    }

    pub fn record_sink_error(origin: Origin) {
        ::metrics::counter!(
            phase_metric!(counter, "delivery", "sink_errors"),
            "origin" => origin.as_str()
        )
        .increment(1);
    }
}

impl PhaseMetrics for DeliveryMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "delivery", "events"), "origin" => "stream");
        let _ = counter!(phase_metric!(counter, "delivery", "events"), "origin" => "poll");
        let _ = counter!(phase_metric!(counter, "delivery", "sink_errors"), "origin" => "stream");
        let _ = counter!(phase_metric!(counter, "delivery", "sink_errors"), "origin" => "poll");
        let _ = histogram!(phase_metric!(histogram, "delivery", "payload_bytes"));
    }

    fn phase_name() -> &'static str {
        "delivery"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "delivery", "events"),
                metric_type: MetricType::Counter,
                help: "Raw payloads handed to the sink",
            },
            MetricDoc {
                name: phase_metric!(counter, "delivery", "sink_errors"),
                metric_type: MetricType::Counter,
                help: "Payloads the sink rejected",
            },
            MetricDoc {
                name: phase_metric!(histogram, "delivery", "payload_bytes"),
                metric_type: MetricType::Histogram,
                help: "Size of delivered payloads",
            },
        ]
    }
}
