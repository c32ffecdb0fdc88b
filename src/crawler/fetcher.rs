//! Listing page fetcher
//!
//! This module handles every HTTP request the harvester makes:
//! - Building page URLs from the configured base URL
//! - Bounded retries with per-failure waits
//! - Exponential backoff and identity rotation when rate limited
//! - Error classification
//! - Observing shutdown between attempts

use crate::config::FetchConfig;
use crate::crawler::session::{create_session, Session};
use crate::crawler::shutdown::ShutdownSignal;
use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

/// One listing page to retrieve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    url: Url,
}

impl PageRequest {
    /// Builds the request for `page` under `base_url`
    pub fn new(base_url: &Url, page: u32) -> Self {
        Self {
            page,
            url: build_url(base_url, page),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Builds the URL of a listing page: `{base_url}?page={page}`
///
/// Existing query parameters of the base URL are kept, and `page` is
/// appended after them.
///
/// # Example
///
/// ```
/// use sinta_harvest::crawler::build_url;
/// use url::Url;
///
/// let base = Url::parse("https://sinta.kemdikbud.go.id/google").unwrap();
/// assert_eq!(
///     build_url(&base, 6673).as_str(),
///     "https://sinta.kemdikbud.go.id/google?page=6673"
/// );
/// ```
pub fn build_url(base_url: &Url, page: u32) -> Url {
    let mut url = base_url.clone();
    url.query_pairs_mut().append_pair("page", &page.to_string());
    url
}

/// Why a single attempt did not produce a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// HTTP 429
    RateLimited,

    /// HTTP 403
    Forbidden,

    /// Any other non-200 status
    HttpStatus(u16),

    /// Timeout, connection failure, or unreadable body
    Transport(String),
}

impl FetchFailure {
    /// Returns true if the failure means the current identity is being throttled
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Forbidden)
    }

    /// HTTP status code, when the server answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RateLimited => Some(429),
            Self::Forbidden => Some(403),
            Self::HttpStatus(code) => Some(*code),
            Self::Transport(_) => None,
        }
    }
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limited (HTTP 429)"),
            Self::Forbidden => write!(f, "forbidden (HTTP 403)"),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
            Self::Transport(error) => write!(f, "transport error: {}", error),
        }
    }
}

/// Final outcome of fetching one page
#[derive(Debug)]
pub enum FetchOutcome {
    /// The page was retrieved with HTTP 200
    Success {
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Every attempt failed; holds the last failure
    Failed(FetchFailure),

    /// Shutdown was requested before the page could be retrieved
    Cancelled,
}

/// Result of a fetch operation, with the retry history
#[derive(Debug)]
pub struct FetchResult {
    /// Requested page number
    pub page: u32,

    /// Number of HTTP attempts made
    pub attempts: u32,

    /// Waits performed between attempts, in order
    pub waits: Vec<Duration>,

    /// Number of times a fresh identity was adopted
    pub identity_rotations: u32,

    /// What finally happened
    pub outcome: FetchOutcome,
}

impl FetchResult {
    /// Returns true if the page was retrieved
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Success { .. })
    }
}

/// Retrieves listing pages with bounded retries
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 200 | Success, stop |
/// | HTTP 429 / 403 | Wait `base * 2^attempt + jitter`, new identity, retry |
/// | Other status | Wait fixed retry delay, retry |
/// | Timeout / connection error | Wait fixed retry delay, retry |
/// | Shutdown requested | Stop immediately → Cancelled |
///
/// No wait follows the final attempt.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    base_url: Url,
    config: FetchConfig,
    shutdown: ShutdownSignal,
}

impl PageFetcher {
    /// Creates a fetcher for pages under `base_url`
    pub fn new(base_url: Url, config: FetchConfig, shutdown: ShutdownSignal) -> Self {
        Self {
            base_url,
            config,
            shutdown,
        }
    }

    /// Builds the request for `page`
    pub fn request(&self, page: u32) -> PageRequest {
        PageRequest::new(&self.base_url, page)
    }

    /// Fetches one page, retrying transient failures
    ///
    /// `session` is replaced with a fresh identity after each rate-limit
    /// response, so the caller keeps using the rotated session afterwards.
    ///
    /// # Arguments
    ///
    /// * `session` - The session to send requests with
    /// * `page` - The page number to fetch
    ///
    /// # Returns
    ///
    /// A FetchResult with the outcome and the retry history
    pub async fn fetch_page(&self, session: &mut Session, page: u32) -> FetchResult {
        let request = self.request(page);
        let mut result = FetchResult {
            page,
            attempts: 0,
            waits: Vec::new(),
            identity_rotations: 0,
            outcome: FetchOutcome::Cancelled,
        };
        let mut last_failure = None;

        for attempt in 0..self.config.max_retries {
            if attempt > 0 && self.shutdown.is_triggered() {
                tracing::info!("Shutdown requested, abandoning page {}", page);
                return result;
            }

            result.attempts += 1;
            tracing::debug!(
                "Fetching page {} (attempt {}/{}): {}",
                page,
                attempt + 1,
                self.config.max_retries,
                request.url()
            );

            let failure = match self.attempt(session, &request).await {
                Ok((status_code, body)) => {
                    result.outcome = FetchOutcome::Success { status_code, body };
                    return result;
                }
                Err(failure) => failure,
            };

            tracing::warn!(
                "Page {} attempt {}/{} failed: {}",
                page,
                attempt + 1,
                self.config.max_retries,
                failure
            );

            if attempt + 1 < self.config.max_retries {
                let wait = self.delay_for(&failure, attempt);
                tracing::info!("Waiting {:.1}s before retrying page {}", wait.as_secs_f64(), page);
                result.waits.push(wait);

                if self.shutdown.sleep(wait).await {
                    tracing::info!("Shutdown requested, abandoning page {}", page);
                    return result;
                }

                if failure.is_rate_limit() {
                    match create_session(&self.config) {
                        Ok(fresh) => {
                            *session = fresh;
                            result.identity_rotations += 1;
                            tracing::debug!("Rotated identity to {}", session.user_agent());
                        }
                        Err(e) => {
                            tracing::warn!("Failed to rotate identity, keeping current: {}", e);
                        }
                    }
                }
            }

            last_failure = Some(failure);
        }

        let failure = last_failure
            .unwrap_or_else(|| FetchFailure::Transport("no attempt was made".to_string()));
        tracing::warn!(
            "Giving up on page {} after {} attempts: {}",
            page,
            result.attempts,
            failure
        );
        result.outcome = FetchOutcome::Failed(failure);
        result
    }

    /// Sends a single GET and classifies the response
    async fn attempt(
        &self,
        session: &Session,
        request: &PageRequest,
    ) -> Result<(u16, String), FetchFailure> {
        let response = session
            .client()
            .get(request.url().clone())
            .send()
            .await
            .map_err(classify_transport_error)?;

        match response.status() {
            StatusCode::OK => response
                .text()
                .await
                .map(|body| (StatusCode::OK.as_u16(), body))
                .map_err(classify_transport_error),
            StatusCode::TOO_MANY_REQUESTS => Err(FetchFailure::RateLimited),
            StatusCode::FORBIDDEN => Err(FetchFailure::Forbidden),
            status => Err(FetchFailure::HttpStatus(status.as_u16())),
        }
    }

    /// Wait before the attempt following `attempt` (zero-based)
    fn delay_for(&self, failure: &FetchFailure, attempt: u32) -> Duration {
        if failure.is_rate_limit() {
            let jitter = rand::thread_rng()
                .gen_range(self.config.jitter_min_ms..=self.config.jitter_max_ms);
            Duration::from_millis(backoff_millis(self.config.backoff_base_ms, attempt) + jitter)
        } else {
            self.config.retry_delay()
        }
    }
}

/// Exponential part of the rate-limit backoff: `base * 2^attempt`
fn backoff_millis(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt))
}

/// Maps a reqwest error to a transport failure
fn classify_transport_error(error: reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        FetchFailure::Transport("request timeout".to_string())
    } else if error.is_connect() {
        FetchFailure::Transport(format!("connection failed: {}", error))
    } else {
        FetchFailure::Transport(error.to_string())
    }
}
