//! Robots.txt handling module
//!
//! This module provides parsing of robots.txt into agent-grouped rules and a
//! per-host cache of the resulting policies. Fetching is done by the
//! [`Dispatcher`](crate::fetch::Dispatcher), which owns the cache.

mod cache;
mod parser;

pub use cache::{host_key, PolicyCache};
pub use parser::{parse_robots_txt, AgentGroup, Directive, PolicyEntry, Rule, RuleSet};
