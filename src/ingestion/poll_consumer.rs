//! Historical ingestion through repeated search requests.
//!
//! Each scheduled invocation runs one poll cycle:
//!
//! ```text
//! FETCH -> deliver items -> HAS_NEXT_PAGE -> FETCH ...
//!                        -> NO_NEXT_PAGE  -> DONE   (since_id = latest seen, max_id cleared)
//! ```
//!
//! The rate-limit back-off sits between every fetch and whatever follows it.
//! A failed fetch ends the cycle with the cursor left where it was, so the next
//! invocation retries the same window.

use crate::app::ports::{EventSink, PeriodicTask, ScheduledTask, SearchClient, TaskScheduler};
use crate::ingestion::{deliver_through_gate, GateOutcome, PauseGate, RateLimiter};
use crate::metrics::PollMetrics;
use crate::types::{Origin, SearchQuery};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleOutcome {
    #[default]
    Completed,
    /// A search request failed; the rest of the cycle was skipped.
    Failed,
    /// The pause gate closed mid-cycle.
    Interrupted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub pages: usize,
    pub delivered: usize,
    pub outcome: CycleOutcome,
}

#[derive(Debug)]
struct PollState {
    query: SearchQuery,
    latest_seen_id: Option<u64>,
}

pub struct PollConsumer {
    client: Arc<dyn SearchClient>,
    sink: Arc<dyn EventSink>,
    gate: Arc<PauseGate>,
    limiter: RateLimiter,
    state: Mutex<PollState>,
}

impl PollConsumer {
    pub fn new(
        client: Arc<dyn SearchClient>,
        sink: Arc<dyn EventSink>,
        gate: Arc<PauseGate>,
        query: SearchQuery,
    ) -> Self {
        let latest_seen_id = query.since_id;
        Self {
            client,
            sink,
            gate,
            limiter: RateLimiter::new(),
            state: Mutex::new(PollState { query, latest_seen_id }),
        }
    }

    /// Fire once now, then every `interval`.
    pub fn schedule(
        self: &Arc<Self>,
        scheduler: &dyn TaskScheduler,
        interval: Duration,
    ) -> ScheduledTask {
        info!("scheduling search poller every {}s", interval.as_secs());
        scheduler.schedule_at_fixed_rate(self.clone(), Duration::ZERO, interval)
    }

    /// The query the next invocation will start from.
    pub fn query(&self) -> SearchQuery {
        self.lock_state().query.clone()
    }

    pub fn latest_seen_id(&self) -> Option<u64> {
        self.lock_state().latest_seen_id
    }

    fn lock_state(&self) -> MutexGuard<'_, PollState> {
        // State is only ever replaced whole, so a poisoned lock still holds a consistent value.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the newest id of this cycle. Never moves backwards, so a cycle that
    /// resumes from an older page cannot drag `since_id` back.
    fn record_latest(&self, id: u64) {
        let mut state = self.lock_state();
        if state.latest_seen_id.map_or(true, |current| id > current) {
            state.latest_seen_id = Some(id);
        }
    }

    fn store_query(&self, query: SearchQuery) {
        self.lock_state().query = query;
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let query = self.query();
        let span = info_span!("poll_cycle", q = %query.q, since_id = ?query.since_id);
        self.drain_pages(query).instrument(span).await
    }

    async fn drain_pages(&self, mut query: SearchQuery) -> CycleReport {
        let mut report = CycleReport::default();
        let mut latest_recorded = false;

        loop {
            let t0 = Instant::now();
            let page = match self.client.search(&query).await {
                Ok(page) => page,
                Err(e) => {
                    error!("Failed to search tweets: {}", e);
                    PollMetrics::record_fetch_error();
                    report.outcome = CycleOutcome::Failed;
                    break;
                }
            };
            report.pages += 1;
            PollMetrics::record_fetch_success(t0.elapsed().as_secs_f64(), page.items.len());
            debug!(
                "page {} returned {} items, next page: {}",
                report.pages,
                page.items.len(),
                page.next_page.is_some()
            );

            // High-water mark goes in before any delivery can be held up by a pause.
            if !latest_recorded {
                if let Some(first) = page.items.first() {
                    self.record_latest(first.id);
                    latest_recorded = true;
                }
            }

            for tweet in &page.items {
                let outcome =
                    deliver_through_gate(&self.gate, self.sink.as_ref(), tweet, Origin::Poll).await;
                match outcome {
                    GateOutcome::Proceed => report.delivered += 1,
                    GateOutcome::Interrupted => {
                        report.outcome = CycleOutcome::Interrupted;
                        return self.finish(report);
                    }
                }
            }

            let has_next = match page.next_page {
                Some(cursor) => {
                    query.follow_page(cursor);
                    true
                }
                None => {
                    query.reset_after(self.latest_seen_id());
                    false
                }
            };
            self.store_query(query.clone());

            tokio::select! {
                biased;
                _ = self.limiter.check_and_wait(&page.rate_limit) => {}
                _ = self.gate.closed() => {
                    report.outcome = CycleOutcome::Interrupted;
                    break;
                }
            }

            if !has_next {
                break;
            }
        }

        self.finish(report)
    }

    fn finish(&self, report: CycleReport) -> CycleReport {
        PollMetrics::record_cycle(report.pages);
        info!(
            "poll cycle finished: {:?}, {} pages, {} delivered",
            report.outcome, report.pages, report.delivered
        );
        report
    }
}

#[async_trait]
impl PeriodicTask for PollConsumer {
    async fn run(&self) {
        self.run_cycle().await;
    }
}
