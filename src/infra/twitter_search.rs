use crate::app::ports::SearchClient;
use crate::constants;
use crate::error::Result;
use crate::infra::http_client::{build_client, error_for_status, header_value};
use crate::types::{PageCursor, RateLimitStatus, SearchPage, SearchQuery, Tweet};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    statuses: Vec<Box<RawValue>>,
    search_metadata: Option<SearchMetadata>,
}

#[derive(Debug, Deserialize)]
struct SearchMetadata {
    next_results: Option<String>,
}

/// Client for the standard search endpoint (`search/tweets.json`).
pub struct HttpSearchClient {
    client: reqwest::Client,
    search_url: String,
}

impl HttpSearchClient {
    pub fn new(search_url: impl Into<String>, bearer_token: &str) -> Result<Self> {
        let timeout = Duration::from_secs(constants::HTTP_TIMEOUT_SECS);
        let client = build_client(bearer_token, Some(timeout))?;
        Ok(Self { client, search_url: search_url.into() })
    }

    fn request(&self, query: &SearchQuery) -> reqwest::RequestBuilder {
        match &query.next_page {
            // next_results is a ready-made query string ("?max_id=...&q=...").
            Some(cursor) => self.client.get(format!("{}{}", self.search_url, cursor.as_str())),
            None => self.client.get(&self.search_url).query(&query.to_params()),
        }
    }
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage> {
        let resp = error_for_status(self.request(query).send().await?).await?;
        let rate_limit = parse_rate_limit(resp.headers(), chrono::Utc::now().timestamp());
        let body = resp.bytes().await?;
        let (items, next_page) = parse_search_body(&body)?;
        debug!(
            "search returned {} statuses, {} calls left in window",
            items.len(),
            rate_limit.remaining
        );
        Ok(SearchPage { items, next_page, rate_limit })
    }
}

pub fn parse_search_body(body: &[u8]) -> Result<(Vec<Tweet>, Option<PageCursor>)> {
    let parsed: SearchBody = serde_json::from_slice(body)?;
    let items = parsed
        .statuses
        .iter()
        .filter_map(|status| {
            let tweet = Tweet::from_raw(status.get());
            if tweet.is_none() {
                warn!("skipping search result without an id");
            }
            tweet
        })
        .collect();
    let next_page = parsed
        .search_metadata
        .and_then(|m| m.next_results)
        .filter(|next| !next.trim().is_empty())
        .map(PageCursor);
    Ok((items, next_page))
}

/// Quota from the response headers. The reset header is an epoch timestamp;
/// it is turned into seconds from `now_epoch`. Without headers the quota counts as open.
pub fn parse_rate_limit(headers: &HeaderMap, now_epoch: i64) -> RateLimitStatus {
    let remaining = header_value::<u32>(headers, constants::RATE_LIMIT_REMAINING_HEADER)
        .unwrap_or(u32::MAX);
    let seconds_until_reset = header_value::<i64>(headers, constants::RATE_LIMIT_RESET_HEADER)
        .map(|reset| (reset - now_epoch).max(0) as u64)
        .unwrap_or(0);
    RateLimitStatus { remaining, seconds_until_reset }
}
