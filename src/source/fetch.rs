//! Blocking HTTP fetcher with a bounded, immediate retry.

use reqwest::blocking::Client;
use tracing::{info, warn};

use super::Fetch;
use crate::config::FetchSettings;
use crate::error::FetchError;

/// Fetches feed bodies over HTTP(S).
///
/// Every request carries a browser-like `User-Agent` and the configured
/// timeout.  Timeouts, connection failures and non-2xx responses are retried
/// straight away until `max_retries` attempts have been made in total.
pub struct HttpFetcher {
    client: Client,
    max_attempts: u32,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.as_str())
            .danger_accept_invalid_certs(settings.insecure_tls)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            max_attempts: settings.max_retries.max(1),
        })
    }

    /// One GET, no retry.  The body is returned untouched.
    fn attempt(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let request_error = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().map_err(request_error)?;
        Ok(body.to_vec())
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 1;
        loop {
            info!(%url, attempt, of = self.max_attempts, "fetching feed");
            match self.attempt(url) {
                Ok(body) => {
                    info!(%url, bytes = body.len(), "fetched feed");
                    return Ok(body);
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!(%url, attempt, error = %e, "fetch failed, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    return Err(FetchError::Exhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
