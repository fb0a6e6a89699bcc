//! HTTP client with rate limiting and retry logic for the AllAnime API
//!
//! Provides a rate-limited HTTP client that respects server limits
//! and implements exponential backoff for transient errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::{AnimineError, Result};
use crate::url::{self, API_BASE, PROVIDER_BASE, REFERER, USER_AGENT};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum requests per second (default: 2.0)
    pub requests_per_second: f64,
    /// Request timeout in seconds (default: 15)
    pub timeout_secs: u64,
    /// Maximum retry attempts for transient errors (default: 3)
    pub max_retries: u32,
    /// GraphQL API origin (default: api.allanime.day)
    pub api_base: String,
    /// Embed provider origin (default: allanime.day)
    pub provider_base: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            timeout_secs: 15,
            max_retries: 3,
            api_base: API_BASE.to_string(),
            provider_base: PROVIDER_BASE.to_string(),
        }
    }
}

/// Rate limiter to control request frequency
///
/// Ensures requests are spaced at least `min_interval` apart.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified requests per second
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = Duration::from_secs_f64(1.0 / requests_per_second);
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(Instant::now() - min_interval)),
        }
    }

    /// Acquire permission to make a request
    ///
    /// If called before the minimum interval has passed since the last request,
    /// this method will sleep until the interval has elapsed.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();

        if elapsed < self.min_interval {
            let wait_time = self.min_interval - elapsed;
            sleep(wait_time).await;
        }

        *last = Instant::now();
    }

    /// Get the minimum interval between requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// HTTP client wrapper with rate limiting and retry logic
///
/// Handles all HTTP communication with the AllAnime API and the embed
/// providers, including:
/// - Rate limiting to avoid overwhelming the server
/// - Automatic retries with exponential backoff for transient errors
/// - Proper headers (User-Agent, Referer)
pub struct AllAnimeClient {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    max_retries: u32,
    api_base: String,
    provider_base: String,
}

impl AllAnimeClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::REFERER,
                    reqwest::header::HeaderValue::from_static(REFERER),
                );
                headers
            })
            .build()
            .map_err(AnimineError::HttpError)?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(config.requests_per_second),
            max_retries: config.max_retries,
            api_base: config.api_base,
            provider_base: config.provider_base,
        })
    }

    /// Execute a GraphQL query against the AllAnime API
    ///
    /// # Arguments
    /// * `query` - GraphQL document text
    /// * `variables` - Variables object, serialized into the request URL
    ///
    /// # Returns
    /// The parsed JSON response body
    ///
    /// # Errors
    /// - `HttpError` - Network or HTTP errors
    /// - `RateLimited` - Server returned 429 after all retries exhausted
    /// - `ApiError` - Response body was not valid JSON
    pub async fn graphql(
        &self,
        query: &str,
        variables: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let url = url::build_api_url(&self.api_base, query, variables);
        let body = self.fetch_with_retry(&url).await?;
        serde_json::from_str(&body)
            .map_err(|e| AnimineError::ApiError(format!("invalid JSON body: {}", e)))
    }

    /// Fetch an embed provider endpoint by its decoded source path
    ///
    /// # Arguments
    /// * `path` - Decoded path (e.g. "/apivtwo/clock.json?id=abc")
    ///
    /// # Returns
    /// The raw response body; link extraction happens in the parsers.
    pub async fn fetch_provider(&self, path: &str) -> Result<String> {
        let url = url::build_provider_url(&self.provider_base, path);
        self.fetch_with_retry(&url).await
    }

    /// Internal method to fetch with retry logic
    async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        let mut last_error: Option<AnimineError> = None;
        let mut attempt = 0;

        while attempt <= self.max_retries {
            // Wait for rate limiter
            self.rate_limiter.acquire().await;

            match self.do_fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    if Self::is_retryable(&e) && attempt < self.max_retries {
                        // Exponential backoff: 1s, 2s, 4s
                        let backoff = Duration::from_secs(1 << attempt);
                        tracing::debug!(url, attempt, "retrying after {:?}: {}", backoff, e);
                        sleep(backoff).await;
                        last_error = Some(e);
                        attempt += 1;
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or(AnimineError::RateLimited))
    }

    /// Perform a single fetch attempt
    async fn do_fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AnimineError::HttpError)?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AnimineError::RateLimited);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AnimineError::NotFound(url.to_string()));
        }

        if status.is_server_error() {
            return Err(AnimineError::HttpError(
                response.error_for_status().unwrap_err(),
            ));
        }

        response.text().await.map_err(AnimineError::HttpError)
    }

    /// Check if an error is retryable
    fn is_retryable(error: &AnimineError) -> bool {
        match error {
            AnimineError::RateLimited => true,
            AnimineError::HttpError(e) => {
                // Retry on timeout, connection errors, or 5xx status codes
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Get a reference to the rate limiter (for testing)
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}
