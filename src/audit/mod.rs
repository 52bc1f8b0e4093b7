//! The auditing pipeline: normalization, the deterministic hard-kill sweep,
//! the lockdown allow-list, and finally the LLM semantic auditor.

pub mod decision;
pub mod filter;
pub mod network;
pub mod normalize;

pub use decision::Decision;

use crate::config::PolicyConfig;
use crate::llm::LlmAuditor;
use anyhow::Result;
use filter::HardKillFilter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default bound on one LLM auditor consultation.
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// Composes the full pipeline for one policy. Built once at startup and
/// shared read-only across requests; `audit` holds no mutable state.
pub struct CommandAuditor {
    policy: Arc<PolicyConfig>,
    filter: HardKillFilter,
    llm: Option<Arc<dyn LlmAuditor>>,
    llm_timeout: Duration,
}

impl CommandAuditor {
    pub fn new(policy: PolicyConfig, llm: Option<Arc<dyn LlmAuditor>>) -> Result<Self> {
        let policy = Arc::new(policy);
        let filter = HardKillFilter::new(policy.clone())?;
        Ok(Self {
            policy,
            filter,
            llm,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
        })
    }

    /// Override the LLM consultation timeout (operator-configurable).
    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Audit one raw command string.
    ///
    /// Never fails: every fault on this path — missing auditor, timeout,
    /// anything the auditor reports — becomes a rejecting `Decision`. No
    /// branch returns an unchecked `allowed=true`.
    pub async fn audit(&self, raw: &str) -> Decision {
        let normalized = normalize::normalize(raw);

        if let Some(rejection) = self.filter.check(&normalized, raw) {
            debug!("hard-kill rejection: {}", rejection.reason);
            return rejection;
        }

        // Positive allow-list acceptance happens only after the full
        // hard-kill sweep declined — a lockdown allow-list never overrides
        // blocked tokens, paths, tools, or network rules.
        if self.policy.lockdown_mode && filter::is_allowed_in_lockdown(&self.policy, &normalized) {
            return Decision::allow("Command explicitly allowed by policy.", 0);
        }

        let Some(llm) = &self.llm else {
            return Decision::reject_with_risk(
                "LLM auditor unavailable; fail-closed policy applied.",
                9,
            );
        };

        match tokio::time::timeout(self.llm_timeout, llm.audit_command(&normalized)).await {
            Ok(verdict) => verdict.clamped(),
            Err(_) => {
                warn!(
                    "LLM auditor exceeded {}s; rejecting",
                    self.llm_timeout.as_secs()
                );
                Decision::reject("LLM auditor timed out; fail-closed policy applied.")
            }
        }
    }
}
