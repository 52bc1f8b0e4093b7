//! HTTP façade for the auditing pipeline.
//!
//! Three endpoints: `GET /health` (always open), `POST /audit` (audit then
//! execute when permitted), and `POST /audit-only` (decision without
//! execution). Authentication is a static bearer token in the
//! `X-Sentinel-Token` header, compared in constant time; when no token is
//! configured the gateway is open — local/testing use only.
//!
//! `/audit` never maps executor trouble to an HTTP failure: it always answers
//! 200 with a structured decision, and execution faults ride inside it.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::{CommandAuditor, Decision};
use crate::exec::CommandExecutor;

/// Header carrying the bearer token.
const AUTH_HEADER: &str = "X-Sentinel-Token";

/// Shared, read-only state behind all handlers.
pub struct GatewayState {
    auditor: CommandAuditor,
    executor: CommandExecutor,
    auth_token: Option<String>,
}

impl GatewayState {
    pub fn new(
        auditor: CommandAuditor,
        executor: CommandExecutor,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            auditor,
            executor,
            auth_token,
        }
    }
}

/// Request body for `/audit` and `/audit-only`.
#[derive(Debug, Deserialize)]
pub struct AuditRequest {
    pub command: String,
    #[serde(default)]
    pub workdir: Option<String>,
}

/// Response body for `/audit`: the decision plus execution capture. The
/// execution fields are empty/null when the command was denied.
#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub allowed: bool,
    pub risk_score: u8,
    pub reason: String,
    pub stdout: String,
    pub stderr: String,
    pub returncode: Option<i32>,
}

impl AuditResponse {
    fn denied(decision: Decision) -> Self {
        Self {
            allowed: false,
            risk_score: decision.risk_score,
            reason: decision.reason,
            stdout: String::new(),
            stderr: String::new(),
            returncode: None,
        }
    }
}

/// Build the gateway router. Public so embedders and integration tests can
/// drive it without binding a socket.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/audit", post(audit_handler))
        .route("/audit-only", post(audit_only_handler))
        .with_state(state)
}

/// Bind and serve until ctrl-c. Normal shutdown returns `Ok` (exit code 0).
pub async fn start(host: &str, port: u16, state: Arc<GatewayState>) -> Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind gateway on {}", addr))?;
    info!("sentinel gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("gateway server error")?;
    Ok(())
}

/// GET /health — liveness probe, always unauthenticated.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "sentinel",
        "version": crate::VERSION,
    }))
}

fn authorized(state: &GatewayState, headers: &HeaderMap) -> bool {
    let Some(expected) = &state.auth_token else {
        return true;
    };
    let provided = headers
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"error": "missing or invalid X-Sentinel-Token"})),
    )
        .into_response()
}

fn bad_request(rejection: &JsonRejection) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": rejection.body_text()})),
    )
        .into_response()
}

/// POST /audit — audit the command and, when permitted, execute it.
async fn audit_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    payload: Result<Json<AuditRequest>, JsonRejection>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let Json(body) = match payload {
        Ok(json) => json,
        Err(rejection) => return bad_request(&rejection),
    };

    let audit_id = Uuid::new_v4();
    debug!(%audit_id, command_len = body.command.len(), "audit request");

    let decision = state.auditor.audit(&body.command).await;
    if !decision.allowed {
        info!(%audit_id, risk = decision.risk_score, "denied: {}", decision.reason);
        return (StatusCode::OK, Json(AuditResponse::denied(decision))).into_response();
    }

    let workdir = body.workdir.as_deref().map(Path::new);
    let result = state.executor.run(&body.command, workdir).await;
    info!(%audit_id, returncode = result.returncode, "executed");

    (
        StatusCode::OK,
        Json(AuditResponse {
            allowed: true,
            risk_score: decision.risk_score,
            reason: decision.reason,
            stdout: result.stdout,
            stderr: result.stderr,
            returncode: Some(result.returncode),
        }),
    )
        .into_response()
}

/// POST /audit-only — the decision alone, never executed. The response is
/// exactly `{allowed, risk_score, reason}`.
async fn audit_only_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    payload: Result<Json<AuditRequest>, JsonRejection>,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let Json(body) = match payload {
        Ok(json) => json,
        Err(rejection) => return bad_request(&rejection),
    };

    let decision = state.auditor.audit(&body.command).await;
    if !decision.allowed {
        warn!(risk = decision.risk_score, "audit-only denied: {}", decision.reason);
    }
    (StatusCode::OK, Json(decision)).into_response()
}

#[cfg(test)]
mod tests;
