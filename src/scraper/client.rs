//! Shared HTTP client with rate limiting

use crate::config::PipelineConfig;
use crate::error::FetchError;
use reqwest::header::{ACCEPT, REFERER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// HTTP fetcher used by every source.
///
/// Each request carries the configured deadline. Requests are spaced at
/// least `request_interval_ms` apart. Failures are classified so that only
/// network-level problems come back as [`FetchError::Transient`].
pub struct HttpFetcher {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Mutex<Instant>,
}

impl HttpFetcher {
    pub fn new(config: &PipelineConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;

        let min_interval = Duration::from_millis(config.request_interval_ms);
        Ok(Self {
            client,
            min_interval,
            last_request: Mutex::new(
                Instant::now()
                    .checked_sub(min_interval)
                    .unwrap_or_else(Instant::now),
            ),
        })
    }

    /// Wait for rate limit
    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();

        if elapsed < self.min_interval {
            tokio::time::sleep(self.min_interval - elapsed).await;
        }

        *last = Instant::now();
    }

    async fn get(
        &self,
        url: &str,
        accept: &str,
        referer: Option<&str>,
    ) -> Result<String, FetchError> {
        self.wait_for_rate_limit().await;
        tracing::info!("GET {}", url);

        let mut request = self.client.get(url).header(ACCEPT, accept);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, url));
        }

        Ok(response.text().await?)
    }

    /// GET an HTML page
    pub async fn get_html(&self, url: &str) -> Result<String, FetchError> {
        self.get(url, "text/html", None).await
    }

    /// GET and decode a JSON document
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<T, FetchError> {
        let body = self.get(url, "application/json", referer).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Server-side and throttling statuses are worth retrying; anything else
/// means the page is not what we expect.
fn classify_status(status: StatusCode, url: &str) -> FetchError {
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        FetchError::Transient(format!("HTTP {} from {}", status, url))
    } else {
        FetchError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        }
    }
}
