// Parameters every source definition carries (`mode` and the credential).
// A source with exactly this many parameters has no filter terms.
pub const MANDATORY_PARAM_SIZE: usize = 2;

pub const LIVE_MODE: &str = "live";
pub const HISTORICAL_MODE: &str = "historical";

pub const DEFAULT_SEARCH_URL: &str = "https://api.twitter.com/1.1/search/tweets.json";
pub const DEFAULT_SAMPLE_URL: &str = "https://stream.twitter.com/1.1/statuses/sample.json";
pub const DEFAULT_FILTER_URL: &str = "https://stream.twitter.com/1.1/statuses/filter.json";

pub const BEARER_TOKEN_ENV: &str = "TWITTER_BEARER_TOKEN";

pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 600;
pub const MAX_SEARCH_COUNT: u32 = 100;

pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-rate-limit-remaining";
pub const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

// Stream reconnect back-off after transport errors: doubled per failure, capped.
pub const STREAM_RECONNECT_INITIAL_SECS: u64 = 5;
pub const STREAM_RECONNECT_MAX_SECS: u64 = 320;

pub const HTTP_TIMEOUT_SECS: u64 = 30;
pub const USER_AGENT: &str = "tweet_ingest/0.1";
