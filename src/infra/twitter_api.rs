use crate::app::ports::{ApiConnector, SearchClient, StreamClient};
use crate::config::EndpointsConfig;
use crate::error::Result;
use crate::infra::twitter_search::HttpSearchClient;
use crate::infra::twitter_stream::HttpStreamClient;
use std::sync::Arc;

/// Authenticated search and stream clients for one account.
pub struct TwitterApi {
    search: Arc<HttpSearchClient>,
    stream: Arc<HttpStreamClient>,
}

impl TwitterApi {
    pub fn new(endpoints: &EndpointsConfig, bearer_token: &str) -> Result<Self> {
        Ok(Self {
            search: Arc::new(HttpSearchClient::new(endpoints.search_url.clone(), bearer_token)?),
            stream: Arc::new(HttpStreamClient::new(
                endpoints.sample_url.clone(),
                endpoints.filter_url.clone(),
                bearer_token,
            )?),
        })
    }
}

impl ApiConnector for TwitterApi {
    fn search_client(&self) -> Arc<dyn SearchClient> {
        self.search.clone()
    }

    fn stream_client(&self) -> Arc<dyn StreamClient> {
        self.stream.clone()
    }
}
