//! HTTP session construction and proxy indirection.
//!
//! This module centralizes networking defaults for catalog requests so every
//! category fetch shares the same timeout, header set, compression, and
//! connection pool. One session per pipeline run is sufficient.

use std::time::Duration;

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER,
};
use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Proxy endpoint used when a credential is configured. The original URL is
/// carried as a query parameter and the proxy fetches it on our behalf.
const PROXY_ENDPOINT: &str = "http://api.scraperapi.com/";

/// Browser User-Agent sent on every request.
///
/// The upstream serves an HTML CAPTCHA page to clients it suspects are bots,
/// so requests identify as a current desktop Chrome.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// HTTP session for catalog requests.
///
/// Create one per pipeline run and reuse it across categories to benefit
/// from connection pooling.
///
/// # Example
///
/// ```no_run
/// use pricewatch_core::fetch::HttpSession;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), reqwest::Error> {
/// let session = HttpSession::new(None, Duration::from_secs(20))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    proxy_key: Option<String>,
}

impl HttpSession {
    /// Creates a session with browser-identity headers and the given timeout.
    ///
    /// If `proxy_key` is present, every outgoing URL is rewritten through
    /// the proxy endpoint (see [`HttpSession::target_url`]). The credential
    /// is read once here; the session is immutable afterwards.
    ///
    /// # Errors
    ///
    /// Returns a [`reqwest::Error`] if client construction fails.
    pub fn new(proxy_key: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(Self { client, proxy_key })
    }

    /// Returns the URL to actually dispatch for `url`.
    ///
    /// With a proxy credential the request goes to
    /// `http://api.scraperapi.com/?api_key=<key>&url=<original>`; without
    /// one the original URL is used unmodified.
    #[must_use]
    pub fn target_url(&self, url: &str) -> String {
        let Some(key) = &self.proxy_key else {
            return url.to_string();
        };

        match Url::parse(PROXY_ENDPOINT) {
            Ok(mut proxied) => {
                proxied
                    .query_pairs_mut()
                    .append_pair("api_key", key)
                    .append_pair("url", url);
                proxied.to_string()
            }
            // PROXY_ENDPOINT is a valid constant; this arm is unreachable in
            // practice but keeps the method panic-free.
            Err(_) => url.to_string(),
        }
    }

    /// Issues a GET for `target`, attaching Referer/Origin derived from the
    /// page the listing would have been browsed from.
    ///
    /// # Errors
    ///
    /// Returns a [`reqwest::Error`] on transport-level faults (DNS,
    /// connection reset, timeout). HTTP error statuses are NOT errors here;
    /// callers classify the response.
    pub async fn get(&self, target: &str) -> Result<Response, reqwest::Error> {
        debug!(url = %target, "GET");
        let mut request = self.client.get(target);

        if let Some(origin) = site_origin(target) {
            if let Ok(value) = HeaderValue::from_str(&origin) {
                request = request.header(ORIGIN, value);
            }
            if let Ok(value) = HeaderValue::from_str(&format!("{origin}/")) {
                request = request.header(REFERER, value);
            }
        }

        request.send().await
    }

    /// Whether this session routes requests through the proxy endpoint.
    #[must_use]
    pub fn uses_proxy(&self) -> bool {
        self.proxy_key.is_some()
    }
}

/// Fixed header set mimicking a real browser, minus the per-request
/// Referer/Origin pair which depends on the target site.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("es-AR,es;q=0.9,en;q=0.8"),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua"),
        HeaderValue::from_static(
            "\"Google Chrome\";v=\"131\", \"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\"",
        ),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-mobile"),
        HeaderValue::from_static("?0"),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-platform"),
        HeaderValue::from_static("\"Windows\""),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("empty"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("cors"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-origin"),
    );
    headers
}

/// Scheme+host origin of `url`, e.g. `https://www.carrefour.com.ar`.
fn site_origin(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(format!("{}://{}", parsed.scheme(), host))
}
