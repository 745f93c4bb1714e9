//! Policy-checked, retrying request dispatcher
//!
//! Every request goes through the same sequence:
//!
//! 1. Resolve the host's robots policy (fetched once per host) and refuse
//!    the request if the path is disallowed
//! 2. Send the request; if the connection was dropped mid-request, rebuild
//!    the HTTP client and send it once more
//! 3. Map the status: success yields the body, 404 yields
//!    [`FetchOutcome::Absent`] in tolerant mode, anything else is an error
//!
//! The whole sequence is retried under the dispatcher's [`RetryPolicy`].

use crate::config::{Config, TimeoutConfig, UserAgentConfig};
use crate::fetch::client::{build_http_client, user_agent};
use crate::fetch::retry::RetryPolicy;
use crate::robots::{host_key, parse_robots_txt, PolicyCache, PolicyEntry};
use crate::{HarvestError, Result};
use reqwest::{Client, Method, StatusCode};
use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

/// How a non-success status is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tolerance {
    /// Every non-success status is an error
    Strict,
    /// HTTP 404 yields [`FetchOutcome::Absent`]; other failures are errors
    NotFoundAsAbsent,
}

/// A fully read successful response
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub body: Vec<u8>,
}

impl FetchedBody {
    /// Decodes the body as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Result of a fetch that did not fail
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Found(FetchedBody),
    /// The resource does not exist (only in tolerant mode)
    Absent,
}

impl FetchOutcome {
    /// Returns the body, or `None` if the resource was absent
    pub fn found(self) -> Option<FetchedBody> {
        match self {
            FetchOutcome::Found(body) => Some(body),
            FetchOutcome::Absent => None,
        }
    }
}

/// Issues robots-checked, retried HTTP requests
///
/// The dispatcher owns its HTTP client and its [`PolicyCache`]. It is shared
/// between tasks behind an `Arc`.
pub struct Dispatcher {
    client: RwLock<Client>,
    user_agent_config: UserAgentConfig,
    timeouts: TimeoutConfig,
    user_agent: String,
    policies: PolicyCache,
    retry: RetryPolicy,
}

impl Dispatcher {
    /// Creates a dispatcher from the crawler configuration
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_parts(
            config.user_agent.clone(),
            config.timeouts.clone(),
            RetryPolicy::from(&config.retry),
        )
    }

    /// Creates a dispatcher from its individual settings
    pub fn with_parts(
        user_agent_config: UserAgentConfig,
        timeouts: TimeoutConfig,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = build_http_client(&user_agent_config, &timeouts)?;
        let user_agent = user_agent(&user_agent_config.crawler_identity);

        Ok(Self {
            client: RwLock::new(client),
            user_agent_config,
            timeouts,
            user_agent,
            policies: PolicyCache::new(),
            retry,
        })
    }

    /// The full user agent string sent with every request
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// The per-host robots policy cache
    pub fn policies(&self) -> &PolicyCache {
        &self.policies
    }

    /// Exempts `host` from robots.txt; its robots.txt is never fetched
    ///
    /// `host` is matched the way [`host_key`] formats it, i.e. with a port
    /// only when the port is not the scheme's default.
    pub fn whitelist(&self, host: &str) {
        tracing::debug!("Whitelisting host: {}", host);
        self.policies.whitelist(host);
    }

    /// Returns the robots policy for `url`'s host, fetching robots.txt on
    /// the first request to that host
    ///
    /// robots.txt is fetched directly, without a policy check or retries.
    pub async fn resolve_policy(&self, url: &Url) -> Result<Arc<PolicyEntry>> {
        let host = host_key(url).ok_or_else(|| HarvestError::InvalidUrl(url.to_string()))?;

        if let Some(entry) = self.policies.get(&host) {
            tracing::trace!("Using cached robots.txt for host: {}", host);
            return Ok(entry);
        }

        let robots_url = Url::parse(&format!("{}://{}/robots.txt", url.scheme(), host))?;
        tracing::debug!("Fetching robots.txt: {}", robots_url);

        let response = self.request_raw(Method::GET, &robots_url).await?;
        let body = check_status(&robots_url, response, Tolerance::Strict)?
            .found()
            .ok_or_else(|| HarvestError::HttpStatus {
                url: robots_url.to_string(),
                status: StatusCode::NOT_FOUND.as_u16(),
            })?;

        let entry = parse_robots_txt(&body.text());
        tracing::debug!(
            "Parsed robots.txt for {}: {} agent group(s), sitemap: {:?}",
            host,
            entry.rules.groups().len(),
            entry.sitemap
        );

        Ok(self.policies.insert(&host, entry))
    }

    /// Fails with [`HarvestError::PolicyViolation`] if robots.txt disallows
    /// `url`'s path for this crawler
    pub async fn robots_check(&self, url: &Url) -> Result<()> {
        let policy = self.resolve_policy(url).await?;

        if !policy.rules.is_allowed(url.path(), &self.user_agent) {
            tracing::info!("URL {} disallowed by robots.txt", url);
            return Err(HarvestError::PolicyViolation {
                url: url.to_string(),
            });
        }

        Ok(())
    }

    /// Sends a policy-checked request under the retry policy
    ///
    /// A robots.txt denial is returned immediately without touching the
    /// network or consuming an attempt. When all attempts fail, the last
    /// attempt's error is returned as is.
    pub async fn request(
        &self,
        method: Method,
        url: &Url,
        tolerance: Tolerance,
    ) -> Result<FetchOutcome> {
        let label = format!("{} {}", method, url);

        self.retry
            .run(&label, |_| self.request_once(method.clone(), url, tolerance))
            .await
    }

    /// GET `url` with the given tolerance
    pub async fn fetch(&self, url: &Url, tolerance: Tolerance) -> Result<FetchOutcome> {
        self.request(Method::GET, url, tolerance).await
    }

    /// GET `url` and return its body, failing on any non-success status
    pub async fn fetch_body(&self, url: &Url) -> Result<FetchedBody> {
        self.fetch(url, Tolerance::Strict)
            .await?
            .found()
            .ok_or_else(|| HarvestError::HttpStatus {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND.as_u16(),
            })
    }

    /// GET `url` and return its body as text
    pub async fn text(&self, url: &Url) -> Result<String> {
        Ok(self.fetch_body(url).await?.text())
    }

    /// GET `url` and return its raw body
    pub async fn bytes(&self, url: &Url) -> Result<Vec<u8>> {
        Ok(self.fetch_body(url).await?.body)
    }

    /// GET `url`, returning `None` if the server answers 404
    pub async fn optional_bytes(&self, url: &Url) -> Result<Option<Vec<u8>>> {
        Ok(self
            .fetch(url, Tolerance::NotFoundAsAbsent)
            .await?
            .found()
            .map(|body| body.body))
    }

    /// One attempt: policy check, send (with one reconnect), status mapping
    async fn request_once(
        &self,
        method: Method,
        url: &Url,
        tolerance: Tolerance,
    ) -> Result<FetchOutcome> {
        self.robots_check(url).await?;

        let response = match self.request_raw(method.clone(), url).await {
            Err(HarvestError::TransportReset { .. }) => {
                tracing::warn!(
                    "Connection dropped during {} {}, reopening connection",
                    method,
                    url
                );
                self.reopen()?;
                self.request_raw(method, url).await?
            }
            other => other?,
        };

        check_status(url, response, tolerance)
    }

    /// Sends a request and reads the whole body, without policy checks,
    /// retries or status mapping
    async fn request_raw(&self, method: Method, url: &Url) -> Result<RawResponse> {
        let client = self.client();

        let response = client
            .request(method, url.clone())
            .send()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(url, e))?
            .to_vec();

        Ok(RawResponse {
            status,
            body: FetchedBody { body },
        })
    }

    /// Discards the HTTP client with its connection pool and builds a new one
    fn reopen(&self) -> Result<()> {
        let client = build_http_client(&self.user_agent_config, &self.timeouts)?;
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = client;
        Ok(())
    }

    fn client(&self) -> Client {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

struct RawResponse {
    status: StatusCode,
    body: FetchedBody,
}

fn check_status(url: &Url, response: RawResponse, tolerance: Tolerance) -> Result<FetchOutcome> {
    if response.status.is_success() {
        return Ok(FetchOutcome::Found(response.body));
    }

    if response.status == StatusCode::NOT_FOUND && tolerance == Tolerance::NotFoundAsAbsent {
        tracing::debug!("{} not found, treating as absent", url);
        return Ok(FetchOutcome::Absent);
    }

    Err(HarvestError::HttpStatus {
        url: url.to_string(),
        status: response.status.as_u16(),
    })
}

fn classify_transport_error(url: &Url, error: reqwest::Error) -> HarvestError {
    if is_transport_reset(&error) {
        HarvestError::TransportReset {
            url: url.to_string(),
            source: error,
        }
    } else {
        HarvestError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

/// Returns true if the error means an established connection was dropped
/// by the peer, as opposed to a timeout or a refused connection
pub(crate) fn is_transport_reset(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return false;
    }

    let mut source = std::error::Error::source(error);
    while let Some(err) = source {
        if let Some(hyper_error) = err.downcast_ref::<hyper::Error>() {
            if hyper_error.is_incomplete_message() || hyper_error.is_closed() {
                return true;
            }
        }
        if let Some(io_error) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io_error.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = err.source();
    }

    false
}
