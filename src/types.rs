use serde::{Deserialize, Serialize};

/// A single item as received from the API: its id plus the untouched JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tweet {
    pub id: u64,
    pub raw: String,
}

impl Tweet {
    pub fn new(id: u64, raw: impl Into<String>) -> Self {
        Self { id, raw: raw.into() }
    }

    /// Builds a tweet from the JSON text of one status, keeping that text byte for byte.
    /// Returns `None` when the text is not an object with a usable id.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let ids: StatusIds = serde_json::from_str(raw).ok()?;
        let id = ids.id.or_else(|| ids.id_str.and_then(|s| s.parse().ok()))?;
        Some(Self::new(id, raw))
    }

    /// Like [`Tweet::from_raw`] for a status that has already been decoded as `value`.
    pub fn from_json(value: &serde_json::Value, raw: &str) -> Option<Self> {
        let id = value.get("id").and_then(|v| v.as_u64()).or_else(|| {
            value
                .get("id_str")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
        })?;
        Some(Self::new(id, raw))
    }
}

#[derive(Deserialize)]
struct StatusIds {
    id: Option<u64>,
    id_str: Option<String>,
}

/// Opaque pointer to the next page of the current search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor(pub String);

impl PageCursor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Search criteria plus the pagination state that moves between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub lang: Option<String>,
    pub geocode: Option<String>,
    pub result_type: Option<String>,
    pub count: Option<u32>,
    pub until: Option<String>,
    /// Only items newer than this id.
    pub since_id: Option<u64>,
    /// Only items at or older than this id; `None` means no upper bound.
    pub max_id: Option<u64>,
    /// Set while following the pages of a single request.
    pub next_page: Option<PageCursor>,
}

impl SearchQuery {
    pub fn new(q: impl Into<String>) -> Self {
        Self { q: q.into(), ..Default::default() }
    }

    /// Follow the cursor the API returned for the request in flight.
    pub fn follow_page(&mut self, cursor: PageCursor) {
        self.next_page = Some(cursor);
    }

    /// Close the current request: the next one starts after `latest_seen`
    /// with no upper bound. A missing `latest_seen` keeps the existing lower bound.
    pub fn reset_after(&mut self, latest_seen: Option<u64>) {
        if latest_seen.is_some() {
            self.since_id = latest_seen;
        }
        self.max_id = None;
        self.next_page = None;
    }

    /// Query-string parameters for a fresh (non-cursor) request.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", self.q.clone())];
        if let Some(lang) = &self.lang {
            params.push(("lang", lang.clone()));
        }
        if let Some(geocode) = &self.geocode {
            params.push(("geocode", geocode.clone()));
        }
        if let Some(result_type) = &self.result_type {
            params.push(("result_type", result_type.clone()));
        }
        if let Some(count) = self.count {
            params.push(("count", count.to_string()));
        }
        if let Some(until) = &self.until {
            params.push(("until", until.clone()));
        }
        if let Some(since_id) = self.since_id {
            params.push(("since_id", since_id.to_string()));
        }
        if let Some(max_id) = self.max_id {
            params.push(("max_id", max_id.to_string()));
        }
        params
    }
}

/// Criteria for the filtered live stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub track: Vec<String>,
    #[serde(default)]
    pub follow: Vec<u64>,
    /// Bounding boxes, four coordinates each: sw-lon, sw-lat, ne-lon, ne-lat.
    #[serde(default)]
    pub locations: Vec<f64>,
    #[serde(default)]
    pub language: Vec<String>,
    pub filter_level: Option<String>,
}

impl FilterQuery {
    /// True when there is nothing to filter on, i.e. the sample stream is the only option.
    pub fn is_empty(&self) -> bool {
        self.track.is_empty() && self.follow.is_empty() && self.locations.is_empty()
    }

    pub fn to_form_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.track.is_empty() {
            params.push(("track", self.track.join(",")));
        }
        if !self.follow.is_empty() {
            let ids: Vec<String> = self.follow.iter().map(|id| id.to_string()).collect();
            params.push(("follow", ids.join(",")));
        }
        if !self.locations.is_empty() {
            let coords: Vec<String> = self.locations.iter().map(|c| c.to_string()).collect();
            params.push(("locations", coords.join(",")));
        }
        if !self.language.is_empty() {
            params.push(("language", self.language.join(",")));
        }
        if let Some(level) = &self.filter_level {
            params.push(("filter_level", level.clone()));
        }
        params
    }
}

/// Quota metadata attached to a search response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub remaining: u32,
    pub seconds_until_reset: u64,
}

impl RateLimitStatus {
    pub fn new(remaining: u32, seconds_until_reset: u64) -> Self {
        Self { remaining, seconds_until_reset }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Items in the order the API returned them (newest first).
    pub items: Vec<Tweet>,
    pub next_page: Option<PageCursor>,
    pub rate_limit: RateLimitStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StallWarning {
    pub code: String,
    pub message: String,
    pub percent_full: u32,
}

/// Everything the live stream can push at a listener.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Status(Tweet),
    Deletion { status_id: u64, user_id: u64 },
    TrackLimitation { limited: u64 },
    ScrubGeo { user_id: u64, up_to_status_id: u64 },
    StallWarning(StallWarning),
    Exception(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Stream,
    Poll,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Stream => "stream",
            Origin::Poll => "poll",
        }
    }
}

/// Delivery metadata handed to the sink next to the raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventMeta {
    pub origin: Origin,
    pub item_id: u64,
}
