//! Semantic auditing capability.
//!
//! The pipeline depends on one operation: judge a normalized command and
//! return a `Decision`. `Option<Arc<dyn LlmAuditor>>` covers the two states —
//! absent (every undetermined command is rejected fail-closed) and present.

pub mod anthropic;

pub use anthropic::AnthropicAuditor;

use crate::audit::decision::Decision;
use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait LlmAuditor: Send + Sync {
    /// Judge a normalized command.
    ///
    /// Implementations never fail: transport errors, bad status codes, and
    /// unparseable model output must all surface as reject Decisions. The
    /// orchestrator additionally bounds the call with its own timeout and
    /// clamps the returned risk score.
    async fn audit_command(&self, command: &str) -> Decision;
}

/// Model verdict as requested from the LLM: a bare JSON object.
#[derive(Debug, Deserialize)]
struct Verdict {
    allowed: bool,
    #[serde(default = "default_verdict_risk")]
    risk_score: i64,
    #[serde(default)]
    reason: String,
}

fn default_verdict_risk() -> i64 {
    10
}

/// Parse a model reply into a `Decision`.
///
/// Tolerates Markdown code fences and prose around the object; the first
/// balanced-looking `{...}` span is tried when the trimmed text itself does
/// not parse. Returns `None` when no verdict can be recovered — callers turn
/// that into a rejection.
pub(crate) fn parse_verdict(text: &str) -> Option<Decision> {
    let stripped = strip_code_fences(text);

    let verdict: Verdict = serde_json::from_str(stripped)
        .ok()
        .or_else(|| {
            let start = stripped.find('{')?;
            let end = stripped.rfind('}')?;
            if start > end {
                return None;
            }
            serde_json::from_str(&stripped[start..=end]).ok()
        })?;

    let risk = verdict.risk_score.clamp(0, 10) as u8;
    let reason = if verdict.reason.trim().is_empty() {
        "LLM auditor returned no reason.".to_string()
    } else {
        verdict.reason
    };

    Some(if verdict.allowed {
        Decision::allow(reason, risk)
    } else {
        Decision::reject_with_risk(reason, risk)
    })
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence, then the closing fence.
    let body = rest.split_once('\n').map_or(rest, |(_, b)| b);
    body.strip_suffix("```").unwrap_or(body).trim()
}
