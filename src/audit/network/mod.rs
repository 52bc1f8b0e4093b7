//! Network gate: when a command invokes a network tool, every URL it targets
//! must resolve to a whitelisted domain, or the command is rejected.

use crate::audit::decision::Decision;
use crate::audit::filter::split_tokens;
use crate::config::PolicyConfig;
use anyhow::{Context, Result};
use regex::Regex;
use std::sync::{Arc, LazyLock};

fn url_scan() -> &'static Regex {
    static RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"https?://[^\s'"]+"#).expect("Failed to compile URL scan regex")
    });
    &RE
}

pub struct NetworkGate {
    policy: Arc<PolicyConfig>,
    tool_patterns: Vec<Regex>,
}

impl NetworkGate {
    pub fn new(policy: Arc<PolicyConfig>) -> Result<Self> {
        let tool_patterns = policy
            .blocked_network_tools
            .iter()
            .map(|tool| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(tool.trim()))))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to compile network tool patterns")?;

        Ok(Self {
            policy,
            tool_patterns,
        })
    }

    /// Reject when a network tool is invoked without at least one URL, with an
    /// unparseable URL, or with any URL outside the whitelist. Declines when
    /// no network tool appears, or when every target is whitelisted.
    pub fn check(&self, normalized: &str, raw: &str) -> Option<Decision> {
        if !self.mentions_network_tool(normalized) {
            return None;
        }

        let urls = extract_urls(normalized, raw);
        if urls.is_empty() {
            return Some(Decision::reject(
                "Network command without explicit URL/domain is rejected.",
            ));
        }

        for url in &urls {
            let Some(domain) = extract_domain(url) else {
                return Some(Decision::reject(format!(
                    "Could not parse domain from network target: {}",
                    url
                )));
            };
            if !self.is_whitelisted(&domain) {
                return Some(Decision::reject(format!(
                    "Outbound network domain not whitelisted: {}",
                    domain
                )));
            }
        }

        None
    }

    fn mentions_network_tool(&self, normalized: &str) -> bool {
        self.tool_patterns.iter().any(|re| re.is_match(normalized))
    }

    /// A domain is whitelisted iff it equals an entry or is a subdomain of one
    /// (suffix match at a `.` boundary, so `notexample.com` never matches
    /// `example.com`).
    fn is_whitelisted(&self, domain: &str) -> bool {
        self.policy.whitelisted_domains.iter().any(|allowed| {
            let candidate = allowed.trim().to_lowercase();
            !candidate.is_empty()
                && (domain == candidate || domain.ends_with(&format!(".{}", candidate)))
        })
    }
}

/// Collect URL targets: shell tokens starting with a URL scheme, falling back
/// to a regex scan over the *raw* command for targets hidden by unusual
/// quoting that tokenization misses.
fn extract_urls(normalized: &str, raw: &str) -> Vec<String> {
    let from_tokens: Vec<String> = split_tokens(normalized)
        .into_iter()
        .filter(|t| t.starts_with("http://") || t.starts_with("https://"))
        .collect();

    if !from_tokens.is_empty() {
        return from_tokens;
    }

    url_scan()
        .find_iter(raw)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn extract_domain(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed.host_str().map(str::to_lowercase)
}
