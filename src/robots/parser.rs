//! Robots.txt parser implementation
//!
//! Supports the subset of robots.txt the harvester needs: `User-agent`,
//! `Allow`, `Disallow` and `Sitemap` lines, matched by plain path prefix.
//! Wildcards, `$` anchors and `Crawl-delay` are not interpreted.

/// Whether a rule permits or forbids a path prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Allow,
    Disallow,
}

/// A single `Allow`/`Disallow` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub directive: Directive,
    pub path: String,
}

/// The rules declared under one `User-agent` token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentGroup {
    /// `*` or a literal substring matched against the caller's user agent
    pub agent: String,
    pub rules: Vec<Rule>,
}

/// Parsed robots.txt directives grouped by agent token, in document order
///
/// A `RuleSet` is never mutated after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    groups: Vec<AgentGroup>,
}

impl RuleSet {
    /// Creates a rule set with no groups, which allows everything
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the agent groups in the order they first appeared
    pub fn groups(&self) -> &[AgentGroup] {
        &self.groups
    }

    /// Returns true if no agent group was declared
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Checks whether `path` may be fetched by `user_agent`
    ///
    /// Every group whose token is `*` or a substring of `user_agent` is
    /// consulted in stored order, and within a group every rule in document
    /// order. The last rule whose path is a prefix of `path` decides; there is
    /// no preference for the most specific agent or the longest match. With no
    /// matching rule the path is allowed.
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_harvest::robots::parse_robots_txt;
    ///
    /// let policy = parse_robots_txt("User-agent: *\nDisallow: /private\nAllow: /private/ok");
    /// assert!(policy.rules.is_allowed("/private/ok/page", "TestBot"));
    /// assert!(!policy.rules.is_allowed("/private/secret", "TestBot"));
    /// ```
    pub fn is_allowed(&self, path: &str, user_agent: &str) -> bool {
        let mut allowed = true;

        for group in &self.groups {
            if group.agent != "*" && !user_agent.contains(group.agent.as_str()) {
                continue;
            }

            for rule in &group.rules {
                if path.starts_with(rule.path.as_str()) {
                    allowed = rule.directive == Directive::Allow;
                }
            }
        }

        allowed
    }

    /// Opens a group for `agent`, replacing the rules of an earlier group
    /// with the same token while keeping that group's position
    fn open_group(&mut self, agent: &str) -> usize {
        if let Some(index) = self.groups.iter().position(|g| g.agent == agent) {
            self.groups[index].rules.clear();
            return index;
        }

        self.groups.push(AgentGroup {
            agent: agent.to_string(),
            rules: Vec::new(),
        });
        self.groups.len() - 1
    }
}

/// A host's crawl policy: its rules and the sitemap it declares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyEntry {
    pub rules: RuleSet,
    /// The last `Sitemap:` URL that appeared inside an agent group
    pub sitemap: Option<String>,
}

impl PolicyEntry {
    /// The policy of a whitelisted host: no rules and no sitemap
    pub fn unrestricted() -> Self {
        Self::default()
    }
}

/// Parses raw robots.txt text
///
/// Lines are trimmed; blank lines and `#` comments are skipped. Field names
/// are matched case-insensitively. `Allow`, `Disallow` and `Sitemap` lines
/// that appear before the first `User-agent` line are ignored, as is any line
/// that is not one of the four recognized fields.
pub fn parse_robots_txt(content: &str) -> PolicyEntry {
    let mut rules = RuleSet::empty();
    let mut current: Option<usize> = None;
    let mut sitemap = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match field.trim().to_ascii_lowercase().as_str() {
            "user-agent" => {
                let index = rules.open_group(value);
                // An empty token opens a group that can never collect rules
                current = (!value.is_empty()).then_some(index);
            }
            "allow" | "disallow" => {
                let Some(index) = current else { continue };
                let directive = if field.trim().eq_ignore_ascii_case("allow") {
                    Directive::Allow
                } else {
                    Directive::Disallow
                };
                rules.groups[index].rules.push(Rule {
                    directive,
                    path: value.to_string(),
                });
            }
            "sitemap" => {
                if current.is_some() {
                    sitemap = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    PolicyEntry { rules, sitemap }
}
