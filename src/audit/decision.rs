use serde::{Deserialize, Serialize};

/// Hardest possible rejection severity.
pub const MAX_RISK: u8 = 10;

/// Outcome of auditing one command.
///
/// Immutable once constructed. A rejection always carries `risk_score >= 1`;
/// constructors clamp so no caller can mint an out-of-range or contradictory
/// decision. Serializes flat to `{allowed, risk_score, reason}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub risk_score: u8,
    pub reason: String,
}

impl Decision {
    /// Canonical rejection at maximum severity.
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::reject_with_risk(reason, MAX_RISK)
    }

    /// Rejection at a chosen severity; clamps into `[1, 10]`.
    pub fn reject_with_risk(reason: impl Into<String>, risk_score: u8) -> Self {
        Self {
            allowed: false,
            risk_score: risk_score.clamp(1, MAX_RISK),
            reason: non_empty(reason.into()),
        }
    }

    /// Acceptance at a chosen severity; clamps into `[0, 10]`.
    pub fn allow(reason: impl Into<String>, risk_score: u8) -> Self {
        Self {
            allowed: true,
            risk_score: risk_score.min(MAX_RISK),
            reason: non_empty(reason.into()),
        }
    }

    /// Re-apply the constructor invariants to a decision that arrived from an
    /// external judge (the LLM auditor is not trusted to stay in range).
    pub fn clamped(self) -> Self {
        if self.allowed {
            Self::allow(self.reason, self.risk_score)
        } else {
            Self::reject_with_risk(self.reason, self.risk_score)
        }
    }
}

fn non_empty(reason: String) -> String {
    if reason.trim().is_empty() {
        "No reason provided.".to_string()
    } else {
        reason
    }
}
