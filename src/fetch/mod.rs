//! Fetch module: everything that touches the network
//!
//! This module contains:
//! - HTTP client construction with the browser header set
//! - The retry policy and generic retry helper
//! - The policy-checked, retrying request dispatcher
//! - Sitemap discovery and parsing

mod client;
mod dispatcher;
mod retry;
mod sitemap;

pub use client::{build_http_client, user_agent, BROWSER_SIGNATURE};
pub use dispatcher::{Dispatcher, FetchOutcome, FetchedBody, Tolerance};
pub use retry::{RetryPolicy, Retryable};
pub use sitemap::{expand_sitemap_index, get_sitemap, parse_sitemap, sitemap_url};
