#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tweet_ingest::app::ports::{ApiConnector, EventSink, SearchClient, StreamClient, StreamListener};
use tweet_ingest::error::{IngestError, Result};
use tweet_ingest::types::{
    EventMeta, FilterQuery, PageCursor, RateLimitStatus, SearchPage, SearchQuery, StreamEvent,
    Tweet,
};

pub fn tweet(id: u64) -> Tweet {
    Tweet::new(id, format!(r#"{{"id":{},"text":"tweet {}"}}"#, id, id))
}

pub fn page(ids: &[u64], next: Option<&str>) -> SearchPage {
    SearchPage {
        items: ids.iter().copied().map(tweet).collect(),
        next_page: next.map(|c| PageCursor(c.to_string())),
        rate_limit: RateLimitStatus::new(100, 900),
    }
}

/// Plays back scripted responses; an exhausted script answers with an empty last page.
#[derive(Default)]
pub struct ScriptedSearch {
    responses: Mutex<VecDeque<Result<SearchPage>>>,
    pub calls: Mutex<Vec<(SearchQuery, Instant)>>,
}

impl ScriptedSearch {
    pub fn new(responses: Vec<Result<SearchPage>>) -> Arc<Self> {
        Arc::new(Self { responses: Mutex::new(responses.into()), calls: Mutex::new(Vec::new()) })
    }

    pub fn push(&self, response: Result<SearchPage>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.calls.lock().unwrap().iter().map(|(q, _)| q.clone()).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchClient for ScriptedSearch {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage> {
        self.calls.lock().unwrap().push((query.clone(), Instant::now()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(page(&[], None)))
    }
}

pub fn api_error() -> IngestError {
    IngestError::Api { status: 503, message: "over capacity".to_string() }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Subscription {
    Sample,
    Filter(FilterQuery),
}

/// Stream transport driven by the test through `emit`.
#[derive(Default)]
pub struct FakeStream {
    listeners: Mutex<Vec<Arc<dyn StreamListener>>>,
    pub subscriptions: Mutex<Vec<Subscription>>,
    pub shut_down: Mutex<bool>,
}

impl FakeStream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn emit(&self, event: StreamEvent) {
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener.on_event(event.clone()).await;
        }
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shut_down.lock().unwrap()
    }
}

#[async_trait]
impl StreamClient for FakeStream {
    fn add_listener(&self, listener: Arc<dyn StreamListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    async fn sample(&self) -> Result<()> {
        self.subscriptions.lock().unwrap().push(Subscription::Sample);
        Ok(())
    }

    async fn filter(&self, filter: &FilterQuery) -> Result<()> {
        self.subscriptions.lock().unwrap().push(Subscription::Filter(filter.clone()));
        Ok(())
    }

    async fn shutdown(&self) {
        *self.shut_down.lock().unwrap() = true;
    }
}

pub struct FakeConnector {
    pub search: Arc<ScriptedSearch>,
    pub stream: Arc<FakeStream>,
}

impl ApiConnector for FakeConnector {
    fn search_client(&self) -> Arc<dyn SearchClient> {
        self.search.clone()
    }

    fn stream_client(&self) -> Arc<dyn StreamClient> {
        self.stream.clone()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<(String, Option<EventMeta>)>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { fail: true, ..Default::default() })
    }

    pub fn ids(&self) -> Vec<u64> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, meta)| meta.map(|m| m.item_id))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn deliver(&self, raw: &str, meta: Option<&EventMeta>) -> Result<()> {
        self.delivered.lock().unwrap().push((raw.to_string(), meta.copied()));
        if self.fail {
            return Err(IngestError::Sink("disk full".to_string()));
        }
        Ok(())
    }
}
