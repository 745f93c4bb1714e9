//! HTTP client construction
//!
//! Every request carries a fixed header set resembling a desktop Chrome
//! browser, with the configured crawler identity appended to the user agent.

use crate::config::{TimeoutConfig, UserAgentConfig};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;

/// Browser signature the crawler identity is appended to
pub const BROWSER_SIGNATURE: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

const FIXED_HEADERS: &[(&str, &str)] = &[
    (
        "sec-ch-ua",
        r#""Not A(Brand";v="8", "Chromium";v="132", "Google Chrome";v="132""#,
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", r#""Linux""#),
    ("upgrade-insecure-requests", "1"),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("sec-fetch-site", "none"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-user", "?1"),
    ("sec-fetch-dest", "document"),
    ("accept-language", "ja,en;q=0.9"),
];

/// Formats the full user agent string for a crawler identity
///
/// # Example
///
/// ```
/// use sumi_harvest::fetch::user_agent;
///
/// let ua = user_agent("TestBot/1.0");
/// assert!(ua.starts_with("Mozilla/5.0"));
/// assert!(ua.ends_with(" TestBot/1.0"));
/// ```
pub fn user_agent(crawler_identity: &str) -> String {
    format!("{} {}", BROWSER_SIGNATURE, crawler_identity.trim())
}

/// Builds an HTTP client with the browser header set and timeouts
///
/// `accept-encoding` is left to the client so that compressed responses
/// are transparently decoded. HTTP/2 is used whenever the server
/// negotiates it.
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::{TimeoutConfig, UserAgentConfig};
/// use sumi_harvest::fetch::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_identity: "SumiHarvest/1.0".to_string(),
/// };
///
/// let client = build_http_client(&config, &TimeoutConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeouts: &TimeoutConfig,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    for &(name, value) in FIXED_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }

    Client::builder()
        .user_agent(user_agent(&config.crawler_identity))
        .default_headers(headers)
        .timeout(Duration::from_secs(timeouts.read_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .redirect(Policy::none()) // Every hop must pass the robots check
        .gzip(true)
        .brotli(true)
        .build()
}
