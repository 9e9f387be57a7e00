use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::extract;

/// Upper bound for a single backoff wait.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server returned HTTP {0}")]
    Status(StatusCode),
}

impl FetchError {
    /// Worth another attempt: connection trouble, timeouts, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Request(e) => {
                !e.is_builder() && (e.is_timeout() || e.is_connect() || e.is_request() || e.is_body())
            }
            FetchError::Status(s) => *s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error(),
        }
    }
}

/// Shared HTTP client for page fetches and spreadsheet calls.
pub fn build_client(settings: &Settings) -> Result<Client> {
    let client = Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout())
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}

/// Fetches a page and returns its extracted main text.
pub struct ContentFetcher {
    client: Client,
    max_retries: u32,
    backoff_base: Duration,
}

impl ContentFetcher {
    pub fn new(client: Client, max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            client,
            max_retries,
            backoff_base,
        }
    }

    pub fn from_settings(client: Client, settings: &Settings) -> Self {
        Self::new(client, settings.max_retries, settings.backoff_base())
    }

    /// Extracted text for `url`, or an empty string when it can't be obtained.
    pub async fn fetch_text(&self, url: &str) -> String {
        match self.fetch_with_retry(url).await {
            Ok(Some(text)) => text,
            Ok(None) => String::new(),
            Err(e) => {
                warn!("Error fetching content from {}: {}", url, e);
                String::new()
            }
        }
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<Option<String>, FetchError> {
        for attempt in 0..self.max_retries {
            match self.fetch_once(url).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() => {
                    warn!(
                        "Request error fetching content from {} (attempt {}/{}): {}",
                        url,
                        attempt + 1,
                        self.max_retries,
                        e
                    );
                    if attempt + 1 == self.max_retries {
                        return Err(e);
                    }
                    let backoff = self.backoff_delay(attempt);
                    debug!("Backing off {:.1}s before retrying {}", backoff.as_secs_f64(), url);
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Wait after failed attempt `attempt` (0-based): `base * 2^attempt`, capped.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.backoff_base.checked_mul(factor))
            .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
    }

    async fn fetch_once(&self, url: &str) -> Result<Option<String>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(FetchError::Status(status));
        }
        if !status.is_success() {
            warn!("No content downloaded from {} (HTTP {})", url, status.as_u16());
            return Ok(None);
        }

        let body = response.text().await?;
        let text = extract::main_text(&body);
        if text.is_none() {
            debug!("No readable text extracted from {}", url);
        }
        Ok(text)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(base: Duration) -> ContentFetcher {
        ContentFetcher::new(Client::new(), 3, base)
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let f = fetcher(Duration::from_secs(1));
        let waits: Vec<Duration> = (0..3).map(|a| f.backoff_delay(a)).collect();
        assert_eq!(
            waits,
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[test]
    fn backoff_is_capped_instead_of_overflowing() {
        assert_eq!(fetcher(Duration::from_secs(1)).backoff_delay(40), MAX_BACKOFF);
        assert_eq!(fetcher(Duration::from_millis(u64::MAX)).backoff_delay(1), MAX_BACKOFF);
        assert_eq!(fetcher(Duration::from_secs(200)).backoff_delay(1), MAX_BACKOFF);
    }

    #[test]
    fn status_classification() {
        assert!(FetchError::Status(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(FetchError::Status(StatusCode::BAD_GATEWAY).is_transient());
        assert!(!FetchError::Status(StatusCode::NOT_FOUND).is_transient());
    }
}
