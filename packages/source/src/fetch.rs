//! Reads source bytes from a local file or a remote URL.
//!
//! Remote requests use a blocking client with a bounded per-request
//! timeout. Transient failures (timeouts, connection errors, HTTP 429 and
//! 5xx) are retried once after a short backoff. Anything still failing is
//! reported as [`SourceError::Unavailable`] so the caller never hangs.
//!
//! # Usage
//!
//! ```ignore
//! let fetcher = Fetcher::new(Duration::from_secs(30))?;
//! let bytes = fetcher.fetch(&source.location)?;
//! ```

use std::time::Duration;

use seoul_transit_source_models::SourceLocation;

use crate::SourceError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// A once-per-session refresh does not need more than one retry.
const MAX_RETRIES: u32 = 1;

/// Base backoff before a retry. Doubles per attempt.
const BASE_BACKOFF: Duration = Duration::from_secs(2);

/// Reads source bytes from disk or HTTP.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::blocking::Client,
    max_retries: u32,
    backoff: Duration,
}

impl Fetcher {
    /// Builds a fetcher whose HTTP requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] if the HTTP client cannot be
    /// constructed (e.g., TLS backend initialization failure).
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| SourceError::unavailable("http client", e))?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
            backoff: BASE_BACKOFF,
        })
    }

    /// Overrides the retry backoff. Used by tests to avoid sleeping.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Reads the full content of `location`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] if the file cannot be read or
    /// the request fails after all retries.
    pub fn fetch(&self, location: &SourceLocation) -> Result<Vec<u8>, SourceError> {
        match location {
            SourceLocation::Path { path } => {
                log::debug!("Reading {}", path.display());
                std::fs::read(path).map_err(|e| SourceError::unavailable(path.display(), e))
            }
            SourceLocation::Url { url } => self.fetch_url(url),
        }
    }

    fn fetch_url(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let mut last_reason = String::from("request failed after all retries");

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff * (1 << (attempt - 1));
                log::warn!("  retry {attempt}/{} in {delay:?}...", self.max_retries);
                std::thread::sleep(delay);
            }

            log::info!("Fetching {url}");
            match self.client.get(url).send() {
                Err(e) => {
                    if is_transient(&e) && attempt < self.max_retries {
                        log::warn!("  transient error: {e}");
                        last_reason = e.to_string();
                        continue;
                    }
                    return Err(SourceError::unavailable(url, e));
                }
                Ok(response) => {
                    let status = response.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                        || status.is_server_error()
                    {
                        last_reason = format!("HTTP {status}");
                        if attempt < self.max_retries {
                            log::warn!("  HTTP {status}");
                            continue;
                        }
                        return Err(SourceError::unavailable(
                            url,
                            format!("HTTP {status} after {} retries", self.max_retries),
                        ));
                    }

                    // 4xx is permanent
                    if status.is_client_error() {
                        return Err(SourceError::unavailable(url, format!("HTTP {status}")));
                    }

                    let bytes = response
                        .bytes()
                        .map_err(|e| SourceError::unavailable(url, e))?;
                    log::debug!("Downloaded {} bytes from {url}", bytes.len());
                    return Ok(bytes.to_vec());
                }
            }
        }

        Err(SourceError::unavailable(url, last_reason))
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
