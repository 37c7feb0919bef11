//! Poll Phase Metrics
//!
//! Search requests, pagination depth and rate-limit back-off.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct PollMetrics;

impl PollMetrics {
    pub fn record_fetch_success(duration_secs: f64, items: usize) {
        ::metrics::counter!(phase_metric!(counter, "poll", "fetches")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "poll", "fetch_duration_seconds"))
            .record(duration_secs);
        ::metrics::histogram!(phase_metric!(histogram, "poll", "items_per_page"))
            .record(items as f64);
    }

    pub fn record_fetch_error() {
        ::metrics::counter!(phase_metric!(counter, "poll", "fetch_errors")).increment(1);
    }

    pub fn record_cycle(pages: usize) {
        ::metrics::counter!(phase_metric!(counter, "poll", "cycles")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "poll", "pages_per_cycle"))
            .record(pages as f64);
    }

    pub fn record_rate_limit_wait(wait_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "poll", "rate_limit_waits")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "poll", "rate_limit_wait_seconds"))
            .record(wait_secs);
    }
}

impl PhaseMetrics for PollMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "poll", "fetches"));
        let _ = counter!(phase_metric!(counter, "poll", "fetch_errors"));
        let _ = counter!(phase_metric!(counter, "poll", "cycles"));
        let _ = counter!(phase_metric!(counter, "poll", "rate_limit_waits"));
        let _ = histogram!(phase_metric!(histogram, "poll", "fetch_duration_seconds"));
        let _ = histogram!(phase_metric!(histogram, "poll", "items_per_page"));
        let _ = histogram!(phase_metric!(histogram, "poll", "pages_per_cycle"));
        let _ = histogram!(phase_metric!(histogram, "poll", "rate_limit_wait_seconds"));
    }

    fn phase_name() -> &'static str {
        "poll"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "poll", "fetches"),
                metric_type: MetricType::Counter,
                help: "Successful search requests",
            },
            MetricDoc {
                name: phase_metric!(counter, "poll", "fetch_errors"),
                metric_type: MetricType::Counter,
                help: "Search requests that failed and ended their cycle",
            },
            MetricDoc {
                name: phase_metric!(counter, "poll", "cycles"),
                metric_type: MetricType::Counter,
                help: "Scheduled poll invocations",
            },
            MetricDoc {
                name: phase_metric!(counter, "poll", "rate_limit_waits"),
                metric_type: MetricType::Counter,
                help: "Times the poller waited for an exhausted quota window",
            },
            MetricDoc {
                name: phase_metric!(histogram, "poll", "fetch_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Latency of a single search request",
            },
            MetricDoc {
                name: phase_metric!(histogram, "poll", "items_per_page"),
                metric_type: MetricType::Histogram,
                help: "Items returned per search page",
            },
            MetricDoc {
                name: phase_metric!(histogram, "poll", "pages_per_cycle"),
                metric_type: MetricType::Histogram,
                help: "Pages drained within one invocation",
            },
            MetricDoc {
                name: phase_metric!(histogram, "poll", "rate_limit_wait_seconds"),
                metric_type: MetricType::Histogram,
                help: "Length of each rate-limit wait",
            },
        ]
    }
}
