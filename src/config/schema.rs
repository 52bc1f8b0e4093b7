use serde::{Deserialize, Deserializer};

/// Top-level constitution document, as loaded from YAML at boot.
///
/// Every section may be absent; absent sections fall back to the built-in
/// defaults below. Unknown top-level keys are ignored on purpose so that
/// operator documents can carry commentary sections without breaking boot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Constitution {
    #[serde(default)]
    pub hard_kill: HardKillSection,
    #[serde(default)]
    pub network_lock: NetworkLockSection,
    #[serde(default)]
    pub execution_mode: ExecutionModeSection,
}

/// `hard_kill` section: deterministic, non-negotiable rejections.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HardKillSection {
    #[serde(deserialize_with = "string_or_seq")]
    pub blocked_strings: Vec<String>,
    #[serde(deserialize_with = "string_or_seq")]
    pub blocked_paths: Vec<String>,
    #[serde(deserialize_with = "string_or_seq")]
    pub blocked_tools: Vec<String>,
}

impl Default for HardKillSection {
    fn default() -> Self {
        Self {
            blocked_strings: to_strings(&["sudo", "rm -rf", "mkfs"]),
            blocked_paths: to_strings(&["~/.ssh", "~/.env", "/etc/"]),
            blocked_tools: to_strings(&["python", "pip", "npm"]),
        }
    }
}

/// `network_lock` section: outbound network tools and the domain whitelist.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkLockSection {
    #[serde(deserialize_with = "string_or_seq")]
    pub blocked_tools: Vec<String>,
    #[serde(deserialize_with = "string_or_seq")]
    pub whitelisted_domains: Vec<String>,
}

impl Default for NetworkLockSection {
    fn default() -> Self {
        Self {
            blocked_tools: to_strings(&["curl", "wget"]),
            whitelisted_domains: Vec::new(),
        }
    }
}

/// `execution_mode` section: lockdown switch and its allow-list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecutionModeSection {
    pub lockdown_mode: bool,
    #[serde(deserialize_with = "string_or_seq")]
    pub allowed_commands: Vec<String>,
}

/// Frozen, process-scoped view over a constitution.
///
/// Built once per auditor lifetime. Iteration order of `blocked_strings`,
/// `blocked_paths`, and `allowed_commands` is the document order — the first
/// matching entry is the one named in a rejection reason, so order is part of
/// the observable contract.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub blocked_strings: Vec<String>,
    pub blocked_paths: Vec<String>,
    pub blocked_tools: Vec<String>,
    pub blocked_network_tools: Vec<String>,
    pub whitelisted_domains: Vec<String>,
    pub lockdown_mode: bool,
    pub allowed_commands: Vec<String>,
}

impl PolicyConfig {
    pub fn from_constitution(doc: &Constitution) -> Self {
        Self {
            blocked_strings: doc.hard_kill.blocked_strings.clone(),
            blocked_paths: doc.hard_kill.blocked_paths.clone(),
            blocked_tools: doc.hard_kill.blocked_tools.clone(),
            blocked_network_tools: doc.network_lock.blocked_tools.clone(),
            whitelisted_domains: doc.network_lock.whitelisted_domains.clone(),
            lockdown_mode: doc.execution_mode.lockdown_mode,
            allowed_commands: doc.execution_mode.allowed_commands.clone(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::from_constitution(&Constitution::default())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Accept either a scalar string or a sequence of strings; a scalar becomes a
/// one-element sequence.
fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_applies_defaults() {
        let doc: Constitution = serde_yaml_ng::from_str("{}").unwrap();
        let policy = PolicyConfig::from_constitution(&doc);
        assert_eq!(policy.blocked_strings, vec!["sudo", "rm -rf", "mkfs"]);
        assert_eq!(policy.blocked_paths, vec!["~/.ssh", "~/.env", "/etc/"]);
        assert_eq!(policy.blocked_tools, vec!["python", "pip", "npm"]);
        assert_eq!(policy.blocked_network_tools, vec!["curl", "wget"]);
        assert!(policy.whitelisted_domains.is_empty());
        assert!(!policy.lockdown_mode);
        assert!(policy.allowed_commands.is_empty());
    }

    #[test]
    fn scalar_coerces_to_one_element_sequence() {
        let doc: Constitution = serde_yaml_ng::from_str(
            r"
hard_kill:
  blocked_strings: sudo
",
        )
        .unwrap();
        assert_eq!(doc.hard_kill.blocked_strings, vec!["sudo"]);
        // Sibling fields in a present section still default
        assert_eq!(doc.hard_kill.blocked_paths, vec!["~/.ssh", "~/.env", "/etc/"]);
    }

    #[test]
    fn explicit_empty_sequence_overrides_defaults() {
        let doc: Constitution = serde_yaml_ng::from_str(
            r"
hard_kill:
  blocked_strings: []
",
        )
        .unwrap();
        assert!(doc.hard_kill.blocked_strings.is_empty());
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let doc: Constitution = serde_yaml_ng::from_str(
            r"
identity:
  name: sentinel
hard_kill:
  blocked_strings: [sudo, dd]
",
        )
        .unwrap();
        assert_eq!(doc.hard_kill.blocked_strings, vec!["sudo", "dd"]);
    }

    #[test]
    fn lockdown_section_parses() {
        let doc: Constitution = serde_yaml_ng::from_str(
            r"
execution_mode:
  lockdown_mode: true
  allowed_commands:
    - ls
    - git status
",
        )
        .unwrap();
        let policy = PolicyConfig::from_constitution(&doc);
        assert!(policy.lockdown_mode);
        assert_eq!(policy.allowed_commands, vec!["ls", "git status"]);
    }

    #[test]
    fn network_lock_section_parses() {
        let doc: Constitution = serde_yaml_ng::from_str(
            r"
network_lock:
  blocked_tools: [curl, wget, nc]
  whitelisted_domains: api.example.com
",
        )
        .unwrap();
        let policy = PolicyConfig::from_constitution(&doc);
        assert_eq!(policy.blocked_network_tools, vec!["curl", "wget", "nc"]);
        assert_eq!(policy.whitelisted_domains, vec!["api.example.com"]);
    }
}
