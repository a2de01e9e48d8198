//! Crawler User-Agent blocklist.
//!
//! Built once at startup from the built-in list plus configured entries;
//! read-only afterwards.

use axum::http::{header, HeaderMap};

/// Substrings blocked without any configuration.
pub const DEFAULT_BLOCKED_AGENTS: [&str; 1] = ["netcraft"];

/// Split a delimited agent list.
///
/// Tabs, spaces, pipes, quotes, CR/LF and commas all separate entries;
/// runs of separators collapse and empty entries are dropped.
pub fn parse_agent_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| matches!(c, '\t' | ' ' | '|' | '"' | '\'' | '\r' | '\n' | ','))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case-insensitive substring blocklist for crawler User-Agents.
#[derive(Debug, Clone)]
pub struct UserAgentBlocklist {
    needles: Vec<String>,
}

impl UserAgentBlocklist {
    /// Built-in entries plus every configured (delimited) entry.
    pub fn new<S: AsRef<str>>(configured: &[S]) -> Self {
        let mut needles: Vec<String> = DEFAULT_BLOCKED_AGENTS.iter().map(|s| s.to_string()).collect();
        for raw in configured {
            for agent in parse_agent_list(raw.as_ref()) {
                let agent = agent.to_lowercase();
                if !needles.contains(&agent) {
                    needles.push(agent);
                }
            }
        }
        Self { needles }
    }

    pub fn entries(&self) -> &[String] {
        &self.needles
    }

    /// A missing User-Agent is checked as the literal "null".
    pub fn is_blocked(&self, headers: &HeaderMap) -> bool {
        let agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "null".to_string());
        self.needles.iter().any(|needle| agent.contains(needle.as_str()))
    }
}

impl Default for UserAgentBlocklist {
    fn default() -> Self {
        Self::new::<&str>(&[])
    }
}
