use super::*;
use crate::config::PolicyConfig;
use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt;

fn state_with(policy: PolicyConfig, auth_token: Option<&str>) -> Arc<GatewayState> {
    let auditor = CommandAuditor::new(policy, None).expect("build auditor");
    Arc::new(GatewayState::new(
        auditor,
        CommandExecutor::default(),
        auth_token.map(ToString::to_string),
    ))
}

/// Lockdown policy whose allow-list admits `echo`, so execution paths can be
/// exercised without an LLM auditor.
fn echo_policy() -> PolicyConfig {
    let mut policy = PolicyConfig::default();
    policy.lockdown_mode = true;
    policy.allowed_commands = vec!["echo".into(), "pwd".into()];
    policy
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::http::Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_open_and_shaped() {
    let app = router(state_with(PolicyConfig::default(), Some("tok")));
    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "sentinel");
}

#[tokio::test]
async fn audit_requires_token_when_configured() {
    let app = router(state_with(PolicyConfig::default(), Some("tok")));
    let resp = app
        .oneshot(post_json("/audit", r#"{"command": "ls"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_token_rejected() {
    let app = router(state_with(PolicyConfig::default(), Some("tok")));
    let mut req = post_json("/audit-only", r#"{"command": "ls"}"#);
    req.headers_mut()
        .insert("X-Sentinel-Token", "wrong".parse().unwrap());
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn matching_token_accepted() {
    let app = router(state_with(PolicyConfig::default(), Some("tok")));
    let mut req = post_json("/audit-only", r#"{"command": "sudo ls"}"#);
    req.headers_mut()
        .insert("X-Sentinel-Token", "tok".parse().unwrap());
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn no_token_configured_is_open() {
    let app = router(state_with(PolicyConfig::default(), None));
    let resp = app
        .oneshot(post_json("/audit-only", r#"{"command": "ls"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_json_is_400() {
    let app = router(state_with(PolicyConfig::default(), None));
    let resp = app
        .oneshot(post_json("/audit", "{not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn missing_command_field_is_400() {
    let app = router(state_with(PolicyConfig::default(), None));
    let resp = app
        .oneshot(post_json("/audit", r#"{"workdir": "/tmp"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn denied_command_has_empty_execution_fields() {
    let app = router(state_with(PolicyConfig::default(), None));
    let resp = app
        .oneshot(post_json("/audit", r#"{"command": "sudo rm -rf /"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["allowed"], false);
    assert_eq!(json["risk_score"], 10);
    assert!(
        json["reason"]
            .as_str()
            .unwrap()
            .contains("Blocked token detected: sudo")
    );
    assert_eq!(json["stdout"], "");
    assert_eq!(json["stderr"], "");
    assert!(json["returncode"].is_null());
}

#[tokio::test]
async fn allowed_command_is_executed() {
    let app = router(state_with(echo_policy(), None));
    let resp = app
        .oneshot(post_json("/audit", r#"{"command": "echo gateway-test"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["allowed"], true);
    assert_eq!(json["risk_score"], 0);
    assert_eq!(json["stdout"], "gateway-test\n");
    assert_eq!(json["returncode"], 0);
}

#[tokio::test]
async fn workdir_is_honored() {
    let tmp = tempfile::TempDir::new().expect("create temp dir");
    let canonical = tmp.path().canonicalize().expect("canonicalize");
    let app = router(state_with(echo_policy(), None));
    let body = serde_json::json!({
        "command": "pwd",
        "workdir": tmp.path().to_string_lossy(),
    });
    let resp = app
        .oneshot(post_json("/audit", &body.to_string()))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["allowed"], true);
    assert_eq!(
        json["stdout"].as_str().unwrap().trim(),
        canonical.to_string_lossy()
    );
}

#[tokio::test]
async fn audit_only_never_executes() {
    let app = router(state_with(echo_policy(), None));
    let resp = app
        .oneshot(post_json("/audit-only", r#"{"command": "echo should-not-run"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["allowed"], true);
    // Exactly the decision triple — no execution fields at all.
    assert!(json.get("stdout").is_none());
    assert!(json.get("stderr").is_none());
    assert!(json.get("returncode").is_none());
    assert_eq!(json.as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn empty_command_rejected_with_max_risk() {
    let app = router(state_with(PolicyConfig::default(), None));
    let resp = app
        .oneshot(post_json("/audit", r#"{"command": ""}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["allowed"], false);
    assert_eq!(json["risk_score"], 10);
    assert!(json["reason"].as_str().unwrap().contains("Empty command"));
}

#[tokio::test]
async fn executor_fault_stays_inside_200() {
    let app = router(state_with(echo_policy(), None));
    let body = serde_json::json!({
        "command": "echo hi",
        "workdir": "/nonexistent/workdir",
    });
    let resp = app
        .oneshot(post_json("/audit", &body.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["allowed"], true);
    assert_eq!(json["returncode"], -1);
    assert!(
        json["stderr"]
            .as_str()
            .unwrap()
            .contains("failed to spawn")
    );
}
