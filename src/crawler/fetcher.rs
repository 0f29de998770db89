//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the fixed header bundle
//! - Global rate limiting through [`RateLimiter`]
//! - Retry with linear backoff
//! - Failure classification

use crate::config::{Config, UserAgentConfig};
use crate::crawler::rate_limiter::RateLimiter;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{Client, Response};
use std::time::Duration;
use thiserror::Error;

/// Why a single attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    /// Transport-level failure (DNS, connect, reset, timeout, body read)
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// The server answered with an empty body
    #[error("empty response received")]
    EmptyBody,
}

/// A fetch that failed on every attempt
#[derive(Debug, Clone, Error)]
#[error("All {attempts} attempts to fetch {url} failed. Last error: {last}")]
pub struct FetchError {
    /// The URL that could not be fetched
    pub url: String,

    /// How many attempts were made
    pub attempts: u32,

    /// Classification of the final attempt's failure
    #[source]
    pub last: FetchFailure,
}

/// A downloaded binary resource
#[derive(Debug, Clone)]
pub struct FetchedFile {
    /// Raw response body
    pub bytes: Vec<u8>,

    /// Media type from the `Content-Type` header, parameters stripped
    pub mime_type: Option<String>,
}

/// Builds an HTTP client with the crawler's fixed header bundle
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use forum_scraper::config::UserAgentConfig;
/// use forum_scraper::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "ForumScraper".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    Client::builder()
        .user_agent(config.header_value())
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages one at a time with rate limiting and bounded retries
pub struct Fetcher {
    client: Client,
    rate_limiter: RateLimiter,
    max_retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    /// Creates a fetcher
    ///
    /// `max_retries` is the total number of attempts per request and is
    /// clamped to at least one.
    pub fn new(
        client: Client,
        rate_limiter: RateLimiter,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            client,
            rate_limiter,
            max_retries: max_retries.max(1),
            retry_delay,
        }
    }

    /// Creates a fetcher from the crawler configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent)?;
        let rate_limiter =
            RateLimiter::new(Duration::from_millis(config.crawler.delay_between_requests));

        Ok(Self::new(
            client,
            rate_limiter,
            config.crawler.max_retries,
            Duration::from_millis(config.crawler.retry_delay),
        ))
    }

    /// Fetches a page and returns its body as text
    ///
    /// The body is decoded with the charset named in the response's
    /// `Content-Type` (UTF-8 when absent), so Latin-1 forums come through
    /// intact.
    ///
    /// # Retry Logic
    ///
    /// | Condition | Classification |
    /// |-----------|----------------|
    /// | Non-2xx status | `Http { status }` |
    /// | Zero-length body | `EmptyBody` |
    /// | Transport error | `Network` |
    ///
    /// Every classification is retried. Attempt `n` that fails waits
    /// `n * retry_delay` before attempt `n + 1`; after `max_retries` failed
    /// attempts the last classification is returned inside a [`FetchError`].
    pub async fn fetch(&mut self, url: &str) -> Result<String, FetchError> {
        self.fetch_with_retry(url).await
    }

    /// Fetches a binary resource with the same retry envelope as [`Fetcher::fetch`]
    ///
    /// The payload is kept as raw bytes.
    pub async fn fetch_file(&mut self, url: &str) -> Result<FetchedFile, FetchError> {
        self.fetch_with_retry(url).await
    }

    /// Total attempts made per request
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    async fn fetch_with_retry<B: ResponseBody>(&mut self, url: &str) -> Result<B, FetchError> {
        let mut last = FetchFailure::Network("no attempt made".to_string());

        for attempt in 1..=self.max_retries {
            self.rate_limiter.wait().await;
            tracing::info!(
                "Fetching: {} (Attempt {}/{})",
                url,
                attempt,
                self.max_retries
            );

            match self.attempt::<B>(url).await {
                Ok(body) => return Ok(body),
                Err(failure) => {
                    tracing::warn!("Attempt {} for {} failed: {}", attempt, url, failure);
                    last = failure;
                }
            }

            if attempt < self.max_retries {
                let backoff = self.retry_delay * attempt;
                tracing::warn!("Waiting {:?} before retry...", backoff);
                tokio::time::sleep(backoff).await;
            }
        }

        Err(FetchError {
            url: url.to_string(),
            attempts: self.max_retries,
            last,
        })
    }

    async fn attempt<B: ResponseBody>(&self, url: &str) -> Result<B, FetchFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchFailure::Network(describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Http {
                status: status.as_u16(),
            });
        }

        let body = B::read(response).await?;
        if body.is_empty() {
            return Err(FetchFailure::EmptyBody);
        }

        Ok(body)
    }
}

/// How a successful response body is read
trait ResponseBody: Sized {
    async fn read(response: Response) -> Result<Self, FetchFailure>;

    fn is_empty(&self) -> bool;
}

impl ResponseBody for String {
    async fn read(response: Response) -> Result<Self, FetchFailure> {
        response
            .text()
            .await
            .map_err(|e| FetchFailure::Network(describe_transport_error(&e)))
    }

    fn is_empty(&self) -> bool {
        str::is_empty(self)
    }
}

impl ResponseBody for FetchedFile {
    async fn read(response: Response) -> Result<Self, FetchFailure> {
        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchFailure::Network(describe_transport_error(&e)))?;

        Ok(FetchedFile {
            bytes: bytes.to_vec(),
            mime_type,
        })
    }

    fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Short description of a transport error for logs
fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}
