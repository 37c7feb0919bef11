//! Registers every phase's metrics and flags name collisions between phases.

use crate::metrics::{MetricDoc, PhaseMetrics};
use std::collections::HashMap;
use tracing::{info, warn};

pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<super::poll::PollMetrics>(&mut all_metrics);
    register_phase_metrics::<super::stream::StreamMetrics>(&mut all_metrics);
    register_phase_metrics::<super::delivery::DeliveryMetrics>(&mut all_metrics);

    info!("Registered {} total metrics across all phases", all_metrics.len());
}

fn register_phase_metrics<T: PhaseMetrics>(
    all_metrics: &mut HashMap<&'static str, (&'static str, MetricDoc)>,
) {
    T::register_metrics();
    let phase_name = T::phase_name();

    for doc in T::metrics_documentation() {
        if let Some((owner, _)) = all_metrics.get(doc.name) {
            warn!(
                "Metric name conflict detected: '{}' is defined in both '{}' and '{}'",
                doc.name, owner, phase_name
            );
        } else {
            all_metrics.insert(doc.name, (phase_name, doc));
        }
    }
}
