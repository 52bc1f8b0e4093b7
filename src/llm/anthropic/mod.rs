use crate::audit::decision::Decision;
use crate::llm::{LlmAuditor, parse_verdict};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const MAX_TOKENS: u32 = 512;

const SYSTEM_PROMPT: &str = "You are a security auditor for shell commands. \
Judge whether the command below is safe to execute on a developer workstation. \
Destructive operations, privilege escalation, credential or secret access, \
data exfiltration, and obfuscated payloads are unsafe. \
Respond with ONLY a JSON object: \
{\"allowed\": <bool>, \"risk_score\": <0-10>, \"reason\": \"<one sentence>\"}";

/// Semantic auditor backed by the Anthropic Messages API.
///
/// Asks the model for a strict JSON verdict and parses it into a `Decision`.
/// Per the `LlmAuditor` contract, no failure escapes: transport errors,
/// non-2xx statuses, and unparseable replies all become reject Decisions.
pub struct AnthropicAuditor {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl AnthropicAuditor {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: API_URL.to_string(),
            client: Client::builder()
                .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Build from `ANTHROPIC_API_KEY` (and `SENTINEL_MODEL` unless a model
    /// override is given). Returns `None` when no key is configured — the
    /// pipeline then runs fail-closed without a semantic layer.
    pub fn from_env(model_override: Option<String>) -> Option<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())?;
        let model = model_override.or_else(|| {
            std::env::var("SENTINEL_MODEL")
                .ok()
                .filter(|m| !m.is_empty())
        });
        Some(Self::new(api_key, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    #[cfg(test)]
    fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            base_url,
            ..Self::new(api_key, None)
        }
    }

    async fn request_verdict(&self, command: &str) -> Result<Decision> {
        let payload = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": SYSTEM_PROMPT,
            "messages": [{"role": "user", "content": command}],
        });

        let resp = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&payload)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Anthropic API returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            ));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse Anthropic API response body")?;

        let text = body["content"][0]["text"]
            .as_str()
            .context("Anthropic response carried no text content")?;

        parse_verdict(text).ok_or_else(|| anyhow!("model reply was not a JSON verdict"))
    }
}

#[async_trait]
impl LlmAuditor for AnthropicAuditor {
    async fn audit_command(&self, command: &str) -> Decision {
        match self.request_verdict(command).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!("LLM auditor failed: {:#}", e);
                Decision::reject_with_risk(format!("LLM auditor error: {}", e), 9)
            }
        }
    }
}
