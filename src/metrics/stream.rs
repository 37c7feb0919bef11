//! Stream Phase Metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct StreamMetrics;

impl StreamMetrics {
    /// Deletion, track-limitation, scrub-geo and stall notices.
    pub fn record_notice(kind: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "stream", "notices"), "kind" => kind)
            .increment(1);
    }

    pub fn record_exception() {
        ::metrics::counter!(phase_metric!(counter, "stream", "exceptions")).increment(1);
    }

    pub fn record_reconnect() {
        ::metrics::counter!(phase_metric!(counter, "stream", "reconnects")).increment(1);
    }

    /// A status lost because the gate was closed while it waited.
    pub fn record_dropped() {
        ::metrics::counter!(phase_metric!(counter, "stream", "dropped")).increment(1);
    }
}

impl PhaseMetrics for StreamMetrics {
    fn register_metrics() {
        use metrics::counter;

        for kind in ["deletion", "track_limitation", "scrub_geo", "stall_warning"] {
            let _ = counter!(phase_metric!(counter, "stream", "notices"), "kind" => kind);
        }
        let _ = counter!(phase_metric!(counter, "stream", "exceptions"));
        let _ = counter!(phase_metric!(counter, "stream", "reconnects"));
        let _ = counter!(phase_metric!(counter, "stream", "dropped"));
    }

    fn phase_name() -> &'static str {
        "stream"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "stream", "notices"),
                metric_type: MetricType::Counter,
                help: "Informational stream notices received",
            },
            MetricDoc {
                name: phase_metric!(counter, "stream", "exceptions"),
                metric_type: MetricType::Counter,
                help: "Transport errors reported by the stream client",
            },
            MetricDoc {
                name: phase_metric!(counter, "stream", "reconnects"),
                metric_type: MetricType::Counter,
                help: "Stream reconnect attempts",
            },
            MetricDoc {
                name: phase_metric!(counter, "stream", "dropped"),
                metric_type: MetricType::Counter,
                help: "Statuses dropped on shutdown while waiting at the pause gate",
            },
        ]
    }
}
