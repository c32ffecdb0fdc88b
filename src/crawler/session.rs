//! HTTP session construction
//!
//! A session is a `reqwest::Client` carrying one browser identity. Sessions
//! are cheap to build, and the fetcher builds a fresh one whenever the
//! listing starts rate limiting or refusing the current identity.

use crate::config::FetchConfig;
use rand::seq::SliceRandom;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION,
    UPGRADE_INSECURE_REQUESTS,
};
use reqwest::Client;

/// Desktop browser identities a session may present
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.67",
];

/// A request context with a fixed identity
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    user_agent: &'static str,
}

impl Session {
    /// The HTTP client bound to this identity
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The User-Agent this session presents
    pub fn user_agent(&self) -> &str {
        self.user_agent
    }
}

/// Builds a session with a randomly chosen browser identity
///
/// Besides the User-Agent, the client sends the headers a browser sends for
/// a top-level navigation. Accept-Encoding is filled in by reqwest from the
/// enabled gzip and brotli features so bodies are decoded transparently.
///
/// # Arguments
///
/// * `config` - Fetcher settings supplying the timeouts
///
/// # Returns
///
/// * `Ok(Session)` - Successfully built session
/// * `Err(reqwest::Error)` - Failed to build the HTTP client
///
/// # Example
///
/// ```no_run
/// use sinta_harvest::config::FetchConfig;
/// use sinta_harvest::crawler::create_session;
///
/// let session = create_session(&FetchConfig::default()).unwrap();
/// println!("Browsing as {}", session.user_agent());
/// ```
pub fn create_session(config: &FetchConfig) -> Result<Session, reqwest::Error> {
    let user_agent = USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0]);

    let client = Client::builder()
        .user_agent(user_agent)
        .default_headers(browser_headers())
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()?;

    tracing::debug!("Created session with identity: {}", user_agent);

    Ok(Session { client, user_agent })
}

/// Headers sent alongside every request of a session
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}
