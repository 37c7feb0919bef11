use crate::constants;
use crate::error::{IngestError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;

/// A reqwest client that sends the bearer token on every request.
///
/// `timeout` bounds the whole request; pass `None` for long-lived stream connections.
pub fn build_client(bearer_token: &str, timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", bearer_token))
        .map_err(|e| {
            IngestError::Config(format!("bearer token is not a valid header value: {}", e))
        })?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    let mut builder = reqwest::Client::builder()
        .user_agent(constants::USER_AGENT)
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(constants::HTTP_TIMEOUT_SECS));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Turn a non-2xx response into an `Api` error carrying the response body.
pub async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(IngestError::Api {
        status: status.as_u16(),
        message: body.chars().take(512).collect(),
    })
}

pub fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}
