pub mod http_client;
pub mod scheduler;
pub mod sinks;
pub mod twitter_api;
pub mod twitter_search;
pub mod twitter_stream;

pub use scheduler::TokioScheduler;
pub use sinks::{ChannelSink, NdjsonFileSink, StdoutSink};
pub use twitter_api::TwitterApi;
pub use twitter_search::HttpSearchClient;
pub use twitter_stream::HttpStreamClient;
