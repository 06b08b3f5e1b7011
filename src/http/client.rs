use governor::{
    RateLimiter,
    Quota,
    DefaultDirectRateLimiter,
    Jitter
};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::RemoteConfig;

/// Raw outcome of an HTTP exchange, before any interpretation of the body
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Rate-limited JSON client for the remote video service
#[derive(Debug, Clone)]
pub struct RateLimitedHttpClient {
    http: Client,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    base_url: String,
}

impl RateLimitedHttpClient {
    /// Create a new rate-limited HTTP client
    pub fn new(remote: &RemoteConfig) -> Result<Self, reqwest::Error> {
        let per_second = NonZeroU32::new(remote.rate_limit.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(remote.rate_limit.burst_capacity).unwrap_or(per_second);
        let quota = Quota::per_second(per_second).allow_burst(burst);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        let http = Client::builder()
            .timeout(remote.timeout())
            .build()?;

        Ok(Self {
            http,
            rate_limiter,
            base_url: remote.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST a JSON body to `path` under the base URL, optionally with a bearer identity.
    ///
    /// Any HTTP status is returned as a reply; only transport-level failures
    /// (connect, timeout, reading the body) are errors.
    pub async fn post_json<B>(&self, path: &str, body: &B, bearer: Option<&str>) -> Result<HttpReply, reqwest::Error>
    where
        B: Serialize + ?Sized,
    {
        // Wait for rate limit permission
        self.rate_limiter.until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50))).await;

        let url = self.url_for(path);
        debug!(url = %url, "Sending remote service request");

        let mut request = self.http.post(&url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(url = %url, status = %status, "Remote service responded");
        Ok(HttpReply { status, body })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
