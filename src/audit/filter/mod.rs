//! Deterministic hard-kill filter: ordered rules that reject a normalized
//! command outright, or decline and let the pipeline continue.
//!
//! Rule order is a contract, not an accident — the `reason` on a rejection is
//! observable API and red-team suites assert on specific fragments, so rules
//! fire in the order laid out in `check` even when a later rule would also
//! match.

use crate::audit::decision::Decision;
use crate::audit::network::NetworkGate;
use crate::audit::normalize::normalize;
use crate::config::PolicyConfig;
use anyhow::Result;
use regex::Regex;
use std::sync::{Arc, LazyLock};

fn python_tool() -> &'static Regex {
    static RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^python(\d+(\.\d+)*)?$").expect("Failed to compile python tool regex")
    });
    &RE
}

fn shell_after_separator() -> &'static Regex {
    static RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"[|&;]\s*(bash|sh)\b").expect("Failed to compile shell separator regex")
    });
    &RE
}

/// Split a command into shell words, falling back to whitespace splitting when
/// the input cannot be tokenized (unbalanced quotes and the like). Matching
/// against a crude split is still fail-closed: rejection rules get more
/// chances to fire, never fewer.
pub(crate) fn split_tokens(command: &str) -> Vec<String> {
    shlex::split(command)
        .unwrap_or_else(|| command.split_whitespace().map(String::from).collect())
}

pub struct HardKillFilter {
    policy: Arc<PolicyConfig>,
    network: NetworkGate,
}

impl HardKillFilter {
    pub fn new(policy: Arc<PolicyConfig>) -> Result<Self> {
        let network = NetworkGate::new(policy.clone())?;
        Ok(Self { policy, network })
    }

    /// Run the ordered rule set over a normalized command. `raw` is the
    /// original string, consulted only by the network gate's fallback URL
    /// scan. Returns `Some(rejection)` on the first matching rule, `None`
    /// when every rule declines.
    pub fn check(&self, normalized: &str, raw: &str) -> Option<Decision> {
        if normalized.is_empty() {
            return Some(Decision::reject(
                "Empty command is rejected under fail-closed policy.",
            ));
        }

        if self.policy.lockdown_mode && !is_allowed_in_lockdown(&self.policy, normalized) {
            return Some(Decision::reject(
                "Lockdown mode active: command not in allowed_commands.",
            ));
        }

        let lowered = normalized.to_lowercase();

        for blocked in &self.policy.blocked_strings {
            if lowered.contains(&blocked.to_lowercase()) {
                return Some(Decision::reject(format!(
                    "Blocked token detected: {}",
                    blocked
                )));
            }
        }

        for blocked in &self.policy.blocked_paths {
            if lowered.contains(&blocked.to_lowercase()) {
                return Some(Decision::reject(format!(
                    "Blocked path access detected: {}",
                    blocked
                )));
            }
        }

        if let Some(tool) = self.match_blocked_tool(normalized) {
            return Some(Decision::reject(format!("Blocked tool detected: {}", tool)));
        }

        if contains_base64_shell_exec(&lowered) {
            return Some(Decision::reject(
                "Obfuscated payload execution pattern detected: base64 to shell.",
            ));
        }

        self.network.check(normalized, raw)
    }

    /// Token-granular blocked-tool match: each token's basename (after the
    /// last `/`) is compared case-insensitively against the blocked set, with
    /// `python` also covering versioned interpreters (`python3`,
    /// `python3.11`).
    fn match_blocked_tool(&self, command: &str) -> Option<&str> {
        let tokens = split_tokens(command);
        for token in &tokens {
            let candidate = token.trim().to_lowercase();
            if candidate.is_empty() {
                continue;
            }
            let basename = candidate.rsplit('/').next().unwrap_or(candidate.as_str());

            for blocked in &self.policy.blocked_tools {
                let wanted = blocked.trim().to_lowercase();
                if basename == wanted {
                    return Some(blocked.as_str());
                }
                if wanted == "python" && python_tool().is_match(basename) {
                    return Some(blocked.as_str());
                }
            }
        }
        None
    }
}

/// Base64-decode invocation piped or chained into a shell.
fn contains_base64_shell_exec(lowered: &str) -> bool {
    let decodes = lowered.contains("base64 -d") || lowered.contains("base64 --decode");
    decodes && shell_after_separator().is_match(lowered)
}

/// Lockdown allow-list matching (§ execution_mode).
///
/// Entries containing a space are phrase prefixes; bare entries match the
/// whole command, the command's leading word, or the first token's basename.
/// An empty allow-list admits nothing.
pub fn is_allowed_in_lockdown(policy: &PolicyConfig, normalized: &str) -> bool {
    if policy.allowed_commands.is_empty() {
        return false;
    }

    let command = normalized.to_lowercase();
    let tokens = split_tokens(normalized);
    let first_token = tokens
        .first()
        .map(|t| t.to_lowercase())
        .unwrap_or_default();
    let first_basename = first_token
        .rsplit('/')
        .next()
        .unwrap_or(first_token.as_str())
        .to_string();

    for allowed in &policy.allowed_commands {
        let entry = normalize(allowed).to_lowercase();
        if entry.is_empty() {
            continue;
        }

        if entry.contains(' ') {
            if command == entry || command.starts_with(&entry) {
                return true;
            }
        } else if command == entry
            || command.starts_with(&format!("{} ", entry))
            || first_token == entry
            || first_basename == entry
        {
            return true;
        }
    }

    false
}
