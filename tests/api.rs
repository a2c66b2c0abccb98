use axum::http::StatusCode;
use axum::body::Body;
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;
use serde_json::{json, Value};
use std::sync::Arc;
use zeron::api::{build_router, AppState};
use zeron::config::ZeronConfig;
use zeron::db::Database;
use zeron::discovery::StaticResolver;
use zeron::http::StubFetcher;
use zeron::models::{Plan, Scan, ScanStatus, Severity, VulnCategory, Vulnerability};

fn test_config() -> ZeronConfig {
    let mut config = ZeronConfig::default();
    config.discovery.enable_subdomains = false;
    config.discovery.enable_wayback = false;
    config.discovery.fuzz_delay_ms = 0;
    config
}

fn create_test_state() -> AppState {
    state_with(test_config())
}

fn state_with(config: ZeronConfig) -> AppState {
    let db = Database::in_memory().unwrap();
    AppState::new(db, config, Arc::new(StubFetcher::new()), Arc::new(StaticResolver::new()))
}

fn app(state: &AppState) -> axum::Router {
    build_router(state.clone())
}

fn make_request(method: &str, uri: &str, body: Option<Value>) -> axum::http::Request<Body> {
    let builder = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    match body {
        Some(b) => builder.body(Body::from(serde_json::to_string(&b).unwrap())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn response_json(response: axum::http::Response<Body>) -> Value {
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        panic!("Empty response body. Status: {}, Headers: {:?}", parts.status, parts.headers);
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("JSON parse error: {}. Body: {:?}", e, String::from_utf8_lossy(&bytes)))
}

async fn response_text(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn vulnerability(category: VulnCategory, severity: Severity, parameter: &str) -> Vulnerability {
    Vulnerability {
        id: Vulnerability::generate_id(),
        category,
        severity,
        score: 85,
        endpoint: "https://shop.test/list.php?id=1".into(),
        method: "GET".into(),
        parameter: parameter.into(),
        description: format!("{} via {}", category.as_str(), parameter),
        payload: "' OR '1'='1".into(),
        confidence: 90,
        evidence: vec!["You have an error in your SQL syntax".into()],
        response_status: Some(500),
        response_snippet: None,
        poc: None,
        discovered_at: Utc::now(),
        occurrences: 1,
        endpoints: vec![],
    }
}

/// A finished scan stored directly, bypassing the pipeline.
fn seed_completed_scan(state: &AppState) -> String {
    let mut scan = Scan::new("shop.test", Plan::Pro, Plan::Pro.default_limits(), vec![]);
    scan.status = ScanStatus::Completed;
    scan.progress = 100;
    scan.started_at = Some(Utc::now());
    scan.completed_at = Some(Utc::now());
    scan.vulnerabilities = vec![
        vulnerability(VulnCategory::Sqli, Severity::Critical, "id"),
        vulnerability(VulnCategory::Xss, Severity::High, "q"),
    ];
    state.db.upsert_scan(&scan).unwrap();
    scan.id
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = create_test_state();
    let req = make_request("GET", "/api/health", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "zeron");
    assert_eq!(body["active_scans"], 0);
}

#[tokio::test]
async fn test_list_plans() {
    let state = create_test_state();
    let response = app(&state).oneshot(make_request("GET", "/api/plans", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let names: Vec<&str> = body["plans"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["basic", "pro", "enterprise"]);
}

#[tokio::test]
async fn test_create_and_get_scan() {
    let state = create_test_state();
    let req = make_request(
        "POST",
        "/api/scans",
        Some(json!({"domain": "HTTPS://Shop.Test/", "plan": "pro", "scope": "*.shop.test\n-admin.shop.test"})),
    );
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    let scan_id = body["scan_id"].as_str().unwrap().to_string();
    assert!(!scan_id.is_empty());
    assert_eq!(body["domain"], "shop.test");
    assert_eq!(body["plan"], "pro");
    assert_eq!(body["status"], "pending");

    let req = make_request("GET", &format!("/api/scans/{}", scan_id), None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["id"], scan_id.as_str());
    assert_eq!(body["scope"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_created_scan_runs_to_completion() {
    let state = create_test_state();
    let req = make_request("POST", "/api/scans", Some(json!({"domain": "quiet.test"})));
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let scan_id = response_json(response).await["scan_id"].as_str().unwrap().to_string();

    let mut status = Value::Null;
    for _ in 0..400 {
        let req = make_request("GET", &format!("/api/scans/{}/status", scan_id), None);
        let body = response_json(app(&state).oneshot(req).await.unwrap()).await;
        status = body["status"].clone();
        if status == "completed" || status == "failed" {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    assert_eq!(status, "completed");

    for _ in 0..40 {
        if state.active_scans.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    assert!(state.active_scans.is_empty());
    let stored = state.db.get_scan(&scan_id).unwrap().expect("persisted scan");
    assert_eq!(stored.status, ScanStatus::Completed);
}

#[tokio::test]
async fn test_create_scan_rejects_bad_domain() {
    let state = create_test_state();
    let req = make_request("POST", "/api/scans", Some(json!({"domain": "   "})));
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_create_scan_rejects_bad_scope() {
    let state = create_test_state();
    let req = make_request(
        "POST",
        "/api/scans",
        Some(json!({"domain": "shop.test", "scope": ["not a token!"]})),
    );
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(state.active_scans.is_empty());
}

#[tokio::test]
async fn test_create_scan_rejects_unknown_plan() {
    let state = create_test_state();
    let req = make_request("POST", "/api/scans", Some(json!({"domain": "shop.test", "plan": "platinum"})));
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_scan_at_capacity() {
    let mut config = test_config();
    config.server.max_concurrent_scans = 0;
    let state = state_with(config);
    let req = make_request("POST", "/api/scans", Some(json!({"domain": "shop.test"})));
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(state.db.list_scans(10, 0).unwrap().is_empty());
}

#[tokio::test]
async fn test_list_scans() {
    let state = create_test_state();
    seed_completed_scan(&state);
    seed_completed_scan(&state);

    let response = app(&state).oneshot(make_request("GET", "/api/scans?limit=1", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["scans"][0]["domain"], "shop.test");
    assert_eq!(body["scans"][0]["findings"], 2);
}

#[tokio::test]
async fn test_get_nonexistent_scan() {
    let state = create_test_state();
    let response = app(&state).oneshot(make_request("GET", "/api/scans/nope", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_of_stored_scan() {
    let state = create_test_state();
    let scan_id = seed_completed_scan(&state);

    let req = make_request("GET", &format!("/api/scans/{}/status", scan_id), None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["progress"], 100);
    assert_eq!(body["findings_count"]["total"], 2);
    assert_eq!(body["findings_count"]["critical"], 1);
    assert_eq!(body["phases"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_results_of_stored_scan() {
    let state = create_test_state();
    let scan_id = seed_completed_scan(&state);

    let req = make_request("GET", &format!("/api/scans/{}/results", scan_id), None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["vulnerabilities"].as_array().unwrap().len(), 2);
    assert_eq!(body["statistics"]["total"], 2);
}

#[tokio::test]
async fn test_delete_scan() {
    let state = create_test_state();
    let scan_id = seed_completed_scan(&state);

    let uri = format!("/api/scans/{}", scan_id);
    let response = app(&state).oneshot(make_request("DELETE", &uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["deleted"], true);

    let response = app(&state).oneshot(make_request("DELETE", &uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stop_inactive_scan() {
    let state = create_test_state();
    let scan_id = seed_completed_scan(&state);
    let req = make_request("POST", &format!("/api/scans/{}/stop", scan_id), None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_events_for_finished_scan_conflict() {
    let state = create_test_state();
    let scan_id = seed_completed_scan(&state);
    let req = make_request("GET", &format!("/api/scans/{}/events", scan_id), None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_markdown_report() {
    let state = create_test_state();
    let scan_id = seed_completed_scan(&state);

    let req = make_request("GET", &format!("/api/scans/{}/report?format=markdown", scan_id), None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"].to_str().unwrap().starts_with("text/markdown"));
    let text = response_text(response).await;
    assert!(text.contains("# Security Assessment Report: shop.test"));
    assert!(text.contains("## Executive Summary"));
}

#[tokio::test]
async fn test_json_report_by_default() {
    let state = create_test_state();
    let scan_id = seed_completed_scan(&state);

    let req = make_request("GET", &format!("/api/scans/{}/report", scan_id), None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["metadata"]["domain"], "shop.test");
    assert_eq!(body["statistics"]["total"], 2);
}

#[tokio::test]
async fn test_export_platforms() {
    let state = create_test_state();
    let scan_id = seed_completed_scan(&state);

    let req = make_request("GET", &format!("/api/scans/{}/export/hackerone?program=acme", scan_id), None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["program_id"], "acme");
    assert_eq!(body["vulnerability_information"].as_array().unwrap().len(), 2);

    let req = make_request("GET", &format!("/api/scans/{}/export/yeswehack", scan_id), None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_token_required() {
    let state = create_test_state().with_api_token(Some("s3cret".into()));

    let response = app(&state).oneshot(make_request("GET", "/api/scans", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response_json(response).await["error"], "Missing Authorization header");

    let req = axum::http::Request::builder()
        .uri("/api/scans")
        .header("Authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let req = axum::http::Request::builder()
        .uri("/api/scans")
        .header("Authorization", "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Health stays public
    let response = app(&state).oneshot(make_request("GET", "/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
