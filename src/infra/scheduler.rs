use crate::app::ports::{PeriodicTask, ScheduledTask, TaskScheduler};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Fixed-rate scheduling on the tokio runtime, one task per schedule.
#[derive(Debug, Clone, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl TaskScheduler for TokioScheduler {
    fn schedule_at_fixed_rate(
        &self,
        task: Arc<dyn PeriodicTask>,
        initial_delay: Duration,
        period: Duration,
    ) -> ScheduledTask {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        // tokio panics on a zero period
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + initial_delay, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // A dropped handle detaches the task; only an explicit cancel stops it.
                tokio::select! {
                    biased;
                    Ok(_) = stop_rx.wait_for(|stopped| *stopped) => break,
                    _ = ticker.tick() => {}
                }
                task.run().await;
            }
            debug!("scheduled task stopped");
        });

        ScheduledTask::new(stop_tx, handle)
    }
}
