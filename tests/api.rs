//! HTTP API tests against the router, without a listening socket

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use claude_report::ai::{AiAnalyzer, AiTaskQueue};
use claude_report::api::{create_router, AppState};
use claude_report::Config;
use serde_json::{json, Value};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

fn setup() -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let projects = dir.path().join("projects");
    fs::create_dir_all(projects.join("alpha")).unwrap();
    fs::write(
        projects.join("alpha/s1.jsonl"),
        concat!(
            r#"{"role":"user","content":"fix the login error","timestamp":"2024-03-01T10:00:00Z"}"#,
            "\n",
            r#"{"role":"assistant","content":"patched ```rust\nfn login() {}\n```","timestamp":"2024-03-01T10:02:00Z"}"#,
        ),
    )
    .unwrap();

    let mut config = Config::default();
    config.paths.projects_dir = Some(projects);
    config.paths.reports_dir = dir.path().join("reports");

    let ai = AiAnalyzer::new(None, Duration::from_secs(1), AiTaskQueue::new(1));
    let state = AppState::new(config, dir.path().join("config.toml"), ai, None);
    (dir, create_router(state))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_and_api_info() {
    let (_dir, app) = setup();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, Method::GET, "/api", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "claude-report");
    assert!(body["endpoints"].as_array().unwrap().len() > 10);
}

#[tokio::test]
async fn results_missing_and_rejected_names() {
    let (_dir, app) = setup();
    let (status, _) = send(&app, Method::GET, "/api/results", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, "/api/results/latest", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(&app, Method::GET, "/api/results/a..b.json", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn analyze_then_read_results() {
    let (dir, app) = setup();
    let path = dir.path().join("projects").display().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/analyze",
        Some(json!({ "path": path, "format": "json" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["report"]["summary"]["totalMessages"], 2);
    assert_eq!(body["files"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, "/api/results", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    let filename = body["reports"][0]["filename"].as_str().unwrap().to_string();
    assert_eq!(body["reports"][0]["totalSessions"], 1);

    let (status, body) = send(&app, Method::GET, "/api/results/latest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], filename.as_str());

    let (status, body) =
        send(&app, Method::GET, &format!("/api/results/{}", filename), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["filesAnalyzed"], 1);
}

#[tokio::test]
async fn analyze_rejects_bad_input() {
    let (dir, app) = setup();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/analyze",
        Some(json!({ "path": dir.path().join("nowhere").display().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/analyze",
        Some(json!({ "path": dir.path().display().to_string(), "format": "docx" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn projects_and_sessions() {
    let (_dir, app) = setup();
    let (status, body) = send(&app, Method::GET, "/api/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"][0]["id"], "alpha");
    assert_eq!(body["projects"][0]["sessionCount"], 1);

    let (status, body) = send(&app, Method::GET, "/api/projects/alpha/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSessions"], 1);
    assert_eq!(body["analyzedSessions"], 0);
    assert_eq!(body["dateStats"][0]["date"], "2024-03-01");
    assert_eq!(body["sessions"][0]["messageCount"], 2);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/projects/alpha/sessions/date/2024-03-01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSessions"], 1);

    let (status, _) = send(&app, Method::GET, "/api/projects/missing/sessions", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn analyze_date_marks_sessions_analyzed() {
    let (_dir, app) = setup();
    let (status, _) = send(&app, Method::GET, "/api/projects/alpha/analysis", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/projects/alpha/analyze-date/2024-03-01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalSessions"], 1);
    assert_eq!(body["analyzedCount"], 1);
    assert_eq!(body["results"][0]["sessionId"], "s1.jsonl");

    let (_, body) = send(&app, Method::GET, "/api/projects/alpha/sessions", None).await;
    assert_eq!(body["analyzedSessions"], 1);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/projects/alpha/analysis?sessionId=s1.jsonl",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], "s1.jsonl");
    assert_eq!(body["result"]["summary"]["totalMessages"], 2);

    let (status, body) = send(&app, Method::POST, "/api/projects/alpha/analyze", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["summary"]["totalSessions"], 1);

    let (status, body) = send(&app, Method::GET, "/api/projects/alpha/analysis", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["filesAnalyzed"], 1);
    assert!(body["aiAnalysis"].is_null());
}

#[tokio::test]
async fn ai_analysis_falls_back_and_is_cached() {
    let (_dir, app) = setup();
    let uri = "/api/projects/alpha/sessions/s1.jsonl/ai-analyze";

    let (status, body) = send(&app, Method::POST, uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["aiAnalysis"]["model"], "fallback-statistics");
    assert_eq!(body["sessionId"], "s1.jsonl");
    assert!(body.get("cached").is_none());

    let (_, body) = send(&app, Method::POST, uri, None).await;
    assert_eq!(body["cached"], true);

    let (_, body) = send(&app, Method::POST, &format!("{}?force=true", uri), None).await;
    assert!(body.get("cached").is_none());

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/projects/alpha/ai-analysis?sessionId=s1.jsonl",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["aiAnalysis"]["analysis"]["complexity"], "low");

    let (status, _) = send(&app, Method::GET, "/api/projects/alpha/ai-analysis", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::POST, "/api/projects/alpha/ai-analyze", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("sessionId").is_none());
    assert_eq!(body["aiAnalysis"]["analysis"]["topics"][0], "fix");
}

#[tokio::test]
async fn encoded_traversal_ids_are_rejected() {
    let (_dir, app) = setup();
    for uri in [
        "/api/projects/%2E%2E/ai-analysis",
        "/api/projects/%2E%2E/analysis",
        "/api/projects/%2E%2E/ai-analyze",
        "/api/projects/alpha/ai-analysis?sessionId=..%2F..%2Fs1.jsonl",
        "/api/projects/alpha/analysis?sessionId=%2Fetc%2Fx.jsonl",
    ] {
        let method = if uri.ends_with("ai-analyze") {
            Method::POST
        } else {
            Method::GET
        };
        let (status, body) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].is_string());
    }

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/projects/alpha/sessions/%2E%2E%2Fx.jsonl/ai-analyze",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/api/projects/missing/ai-analysis", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn settings_round_trip() {
    let (dir, app) = setup();
    let (status, body) = send(&app, Method::GET, "/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pathExists"], true);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/settings",
        Some(json!({ "projectsDir": dir.path().join("nowhere").display().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["path"].is_string());

    let other = dir.path().join("other");
    fs::create_dir_all(other.join("beta")).unwrap();
    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/settings",
        Some(json!({ "projectsDir": other.display().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(dir.path().join("config.toml").exists());

    let (_, body) = send(&app, Method::GET, "/api/projects", None).await;
    assert_eq!(body["projects"][0]["id"], "beta");

    let (status, body) = send(&app, Method::GET, "/api/settings/suggested-paths", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["suggestedPaths"].is_array());
}

#[tokio::test]
async fn pdf_export_without_browser() {
    let (dir, app) = setup();
    let path = dir.path().join("projects").display().to_string();
    let (_, body) = send(
        &app,
        Method::POST,
        "/api/analyze",
        Some(json!({ "path": path, "format": "json" })),
    )
    .await;
    let report = body["report"].clone();

    let (status, _) = send(&app, Method::POST, "/api/export/pdf", Some(report)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
