//! Integration tests for the namescreen HTTP service

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use namescreen_server::{create_router, AppState, ServerConfig};
use namescreen_telemetry::request_log::read_records;
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::ServiceExt;

const SANCTIONS_HEADER: &str = "sid\tname\ttranslit_name\taliases\tstatus";

fn write_sanctions(dir: &Path, rows: &[&str]) -> PathBuf {
    let path = dir.join("sanctions.tsv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{}", SANCTIONS_HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    path
}

fn app_state(config: ServerConfig, config_path: Option<PathBuf>) -> AppState {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    AppState::from_config(config, config_path, handle).unwrap()
}

fn base_config(dir: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.sanctions_path = Some(write_sanctions(
        dir,
        &["ua-7\tКоваленко Олег Петрович\tKovalenko Oleh\t\tactive"],
    ));
    config
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn detect(comment: &str) -> Request<Body> {
    Request::post("/detect-name")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "comment": comment }).to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_detect_name_full_triple() {
    let dir = TempDir::new().unwrap();
    let app = create_router(app_state(base_config(dir.path()), None));

    let (status, body) = call(&app, detect("Заробітна плата-Булатов Руслан Олександрович")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_name"], true);
    assert_eq!(body["category"], "full_triple");
    assert_eq!(body["detected_name"], "Булатов Руслан Олександрович");
    assert_eq!(body["tier_used"], "fast_ner");
    assert_eq!(body["sanctions_check"]["checked"], true);
    assert_eq!(body["sanctions_check"]["found"], false);
}

#[tokio::test]
async fn test_detect_name_sanctions_match() {
    let dir = TempDir::new().unwrap();
    let app = create_router(app_state(base_config(dir.path()), None));

    let (status, body) = call(&app, detect("Зарплата - Коваленко Олег Петрович")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sanctions_check"]["found"], true);
    assert_eq!(body["sanctions_check"]["matched_record_id"], "ua-7");
}

#[tokio::test]
async fn test_detect_name_without_name() {
    let dir = TempDir::new().unwrap();
    let app = create_router(app_state(base_config(dir.path()), None));

    let (status, body) = call(&app, detect("Зарплата за грудень")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_name"], false);
    assert_eq!(body["category"], "none");
    assert_eq!(body["confidence"], 1.0);
    assert_eq!(body["tier_used"], "quick_filter");
    assert!(body.get("sanctions_check").is_none());
}

#[tokio::test]
async fn test_invalid_body_is_rejected() {
    let app = create_router(app_state(ServerConfig::default(), None));

    let request = Request::post("/detect-name")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"text": "missing comment field"}"#))
        .unwrap();
    let (status, body) = call(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn test_empty_comment_is_answered() {
    let app = create_router(app_state(ServerConfig::default(), None));

    let (status, body) = call(&app, detect("   ")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_name"], false);
    assert_eq!(body["tier_used"], "quick_filter");
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = create_router(app_state(base_config(dir.path()), None));

    let (status, body) = call(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["fast_ner"], "pattern_ner");
    assert_eq!(body["llm_enabled"], false);
    assert_eq!(body["sanctions_loaded"], true);
    assert_eq!(body["sanctions_records"], 1);
}

#[tokio::test]
async fn test_missing_sanctions_file_does_not_block_startup() {
    let dir = TempDir::new().unwrap();
    let mut config = ServerConfig::default();
    config.sanctions_path = Some(dir.path().join("absent.tsv"));
    let app = create_router(app_state(config, None));

    let (_, health) = call(&app, get("/health")).await;
    assert_eq!(health["sanctions_loaded"], false);

    let (status, body) = call(&app, detect("Булатов Руслан Олександрович")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sanctions_check"]["checked"], false);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_router(app_state(ServerConfig::default(), None));

    call(&app, detect("зарплата")).await;
    call(&app, detect("зарплата")).await;
    call(&app, detect("Шевченко Тарас")).await;

    let (status, body) = call(&app, get("/stats")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_requests"], 3);
    assert_eq!(body["tier1_handled"], 1);
    assert_eq!(body["tier2_handled"], 1);
    assert_eq!(body["cache_hits"], 1);
    assert_eq!(body["cache"]["entries"], 2);
    assert_eq!(body["fallback"]["limit"], 2);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = create_router(app_state(ServerConfig::default(), None));

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_sanctions_reload() {
    let dir = TempDir::new().unwrap();
    let config = base_config(dir.path());
    let app = create_router(app_state(config, None));

    let (_, before) = call(&app, detect("Зарплата - Шевченко Тарас Григорович")).await;
    assert_eq!(before["sanctions_check"]["found"], false);

    write_sanctions(
        dir.path(),
        &[
            "ua-7\tКоваленко Олег Петрович\tKovalenko Oleh\t\tactive",
            "ua-8\tШевченко Тарас\tShevchenko Taras\t\tactive",
        ],
    );
    let (status, body) = call(&app, post("/sanctions/reload")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"], 2);

    let (_, after) = call(&app, detect("Аванс - Шевченко Тарас Григорович")).await;
    assert_eq!(after["sanctions_check"]["found"], true);
    assert_eq!(after["sanctions_check"]["matched_record_id"], "ua-8");
}

#[tokio::test]
async fn test_sanctions_reload_without_list() {
    let app = create_router(app_state(ServerConfig::default(), None));

    let (status, _) = call(&app, post("/sanctions/reload")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_config_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "pipeline:\n  confidence_threshold: 0.7\n").unwrap();

    let config = ServerConfig::load(Some(path.as_path())).unwrap();
    let state = app_state(config, Some(path.clone()));
    let app = create_router(state.clone());

    std::fs::write(&path, "pipeline:\n  confidence_threshold: 0.95\n  cache_capacity: 5\n").unwrap();
    let (status, body) = call(&app, post("/config/reload")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pipeline"]["cache_capacity"], 5);
    assert_eq!(state.pipeline.config().confidence_threshold, 0.95);
    assert_eq!(state.pipeline.cache().capacity(), 5);

    std::fs::write(&path, "pipeline:\n  max_concurrent_llm: 0\n").unwrap();
    let (status, _) = call(&app, post("/config/reload")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.pipeline.config().cache_capacity, 5);
}

#[tokio::test]
async fn test_request_log() {
    let dir = TempDir::new().unwrap();
    let mut config = ServerConfig::default();
    config.request_log_dir = Some(dir.path().join("requests"));
    let app = create_router(app_state(config, None));

    call(&app, detect("Шевченко Тарас")).await;
    call(&app, detect("Шевченко Тарас")).await;

    let records = read_records(dir.path().join("requests").join("requests_current.jsonl")).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].comment, "Шевченко Тарас");
    assert!(!records[0].cached);
    assert!(records[1].cached);
    assert_eq!(records[1].result.detected_name.as_deref(), Some("Шевченко Тарас"));
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_router(app_state(ServerConfig::default(), None));

    let response = app.oneshot(get("/v1/chat/completions")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
