//! Per-host robots policy cache
//!
//! Entries are computed at most once per host and never expire within a run.

use crate::robots::PolicyEntry;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

/// Memoized robots policies keyed by host
///
/// The cache is owned by a [`Dispatcher`](crate::fetch::Dispatcher), so two
/// dispatchers never share state.
#[derive(Debug, Default)]
pub struct PolicyCache {
    entries: RwLock<HashMap<String, Arc<PolicyEntry>>>,
}

impl PolicyCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached policy for `host`, if any
    pub fn get(&self, host: &str) -> Option<Arc<PolicyEntry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .cloned()
    }

    /// Stores the policy for `host`
    ///
    /// If another task populated the host first, its entry is kept and
    /// returned; both fetched the same robots.txt so either is correct.
    pub fn insert(&self, host: &str, entry: PolicyEntry) -> Arc<PolicyEntry> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(entry))
            .clone()
    }

    /// Marks `host` as unrestricted so its robots.txt is never fetched
    ///
    /// Overrides anything previously cached for the host.
    pub fn whitelist(&self, host: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(host.to_string(), Arc::new(PolicyEntry::unrestricted()));
    }

    /// Number of cached hosts
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns the cache key for a URL: its host, plus the port when it is not
/// the scheme's default
///
/// Returns `None` for URLs without a host.
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
