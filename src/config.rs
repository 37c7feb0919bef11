use crate::constants;
use crate::error::{IngestError, Result};
use crate::types::{FilterQuery, SearchQuery};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API credentials.
///
/// Only app-only bearer authentication is supported. That covers the search
/// endpoint; the v1.1 `statuses/sample` and `statuses/filter` endpoints require
/// OAuth 1.0a user context and reject a bearer token, so `mode = "live"` against
/// the public API needs a compatible endpoint or proxy set under `[endpoints]`.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsConfig {
    /// Falls back to `TWITTER_BEARER_TOKEN` when absent.
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    Live,
    Historical,
}

impl IngestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestMode::Live => constants::LIVE_MODE,
            IngestMode::Historical => constants::HISTORICAL_MODE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub mode: IngestMode,
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,

    // Live stream filter
    #[serde(default)]
    pub track: Vec<String>,
    #[serde(default)]
    pub follow: Vec<u64>,
    #[serde(default)]
    pub locations: Vec<f64>,
    #[serde(default)]
    pub language: Vec<String>,
    pub filter_level: Option<String>,

    // Historical search
    pub query: Option<String>,
    pub lang: Option<String>,
    pub geocode: Option<String>,
    pub result_type: Option<String>,
    pub count: Option<u32>,
    pub until: Option<String>,
    pub since_id: Option<u64>,
}

fn default_polling_interval() -> u64 {
    constants::DEFAULT_POLLING_INTERVAL_SECS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Stdout,
    Ndjson,
}

#[derive(Debug, Default, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_sample_url")]
    pub sample_url: String,
    #[serde(default = "default_filter_url")]
    pub filter_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            sample_url: default_sample_url(),
            filter_url: default_filter_url(),
        }
    }
}

fn default_search_url() -> String {
    constants::DEFAULT_SEARCH_URL.to_string()
}

fn default_sample_url() -> String {
    constants::DEFAULT_SAMPLE_URL.to_string()
}

fn default_filter_url() -> String {
    constants::DEFAULT_FILTER_URL.to_string()
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { dir: default_log_dir() }
    }
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_content = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::parse(&config_content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.source.validate()?;
        if config.sink.kind == SinkKind::Ndjson && config.sink.path.is_none() {
            return Err(IngestError::MissingField("sink.path".to_string()));
        }
        Ok(config)
    }

    /// Token from the config file, else from the environment.
    pub fn bearer_token(&self) -> Result<String> {
        let configured = self.credentials.bearer_token.as_ref();
        if let Some(token) = configured.filter(|t| !t.trim().is_empty()) {
            return Ok(token.clone());
        }
        std::env::var(constants::BEARER_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| IngestError::MissingField("credentials.bearer_token".to_string()))
    }
}

impl SourceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.polling_interval_secs == 0 {
            return Err(IngestError::Config("polling_interval_secs must be greater than 0".into()));
        }
        if self.locations.len() % 4 != 0 {
            return Err(IngestError::Config(format!(
                "locations must hold bounding boxes of four coordinates, got {} values",
                self.locations.len()
            )));
        }
        if let Some(count) = self.count {
            if count == 0 || count > constants::MAX_SEARCH_COUNT {
                return Err(IngestError::Config(format!(
                    "count must be between 1 and {}, got {}",
                    constants::MAX_SEARCH_COUNT,
                    count
                )));
            }
        }
        match self.mode {
            IngestMode::Historical => {
                if self.query.as_deref().map_or(true, |q| q.trim().is_empty()) {
                    return Err(IngestError::MissingField("source.query".to_string()));
                }
            }
            IngestMode::Live => {
                let has_modifiers = !self.language.is_empty() || self.filter_level.is_some();
                if has_modifiers && self.filter_query().is_empty() {
                    return Err(IngestError::Config(
                        "language and filter_level need at least one of track, follow or locations"
                            .into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Mandatory parameters plus every stream filter parameter that was supplied.
    pub fn param_size(&self) -> usize {
        let supplied = [
            !self.track.is_empty(),
            !self.follow.is_empty(),
            !self.locations.is_empty(),
            !self.language.is_empty(),
            self.filter_level.is_some(),
        ];
        constants::MANDATORY_PARAM_SIZE + supplied.iter().filter(|s| **s).count()
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    pub fn filter_query(&self) -> FilterQuery {
        FilterQuery {
            track: self.track.clone(),
            follow: self.follow.clone(),
            locations: self.locations.clone(),
            language: self.language.clone(),
            filter_level: self.filter_level.clone(),
        }
    }

    pub fn search_query(&self) -> Result<SearchQuery> {
        let q = self
            .query
            .clone()
            .ok_or_else(|| IngestError::MissingField("source.query".to_string()))?;
        Ok(SearchQuery {
            q,
            lang: self.lang.clone(),
            geocode: self.geocode.clone(),
            result_type: self.result_type.clone(),
            count: self.count,
            until: self.until.clone(),
            since_id: self.since_id,
            max_id: None,
            next_page: None,
        })
    }
}
