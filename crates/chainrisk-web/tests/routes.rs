//! Route tests driving the router in-process.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chainrisk_config::Config;
use chainrisk_web::news::MockNewsSource;
use chainrisk_web::router::build_router;
use chainrisk_web::state::{AppEvent, AppState, SharedState};
use chainrisk_web::store::{HistoryRepository, MemoryHistoryStore};
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tower::ServiceExt;

fn config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = "route-test-secret".to_string();
    config.model.model_path = None;
    config
}

fn app_with(config: Config) -> (Router, SharedState) {
    let state = Arc::new(AppState::with_parts(
        config,
        Arc::new(MockNewsSource),
        Arc::new(MemoryHistoryStore::new()),
    ));
    (build_router(state.clone()), state)
}

fn app() -> (Router, SharedState) {
    app_with(config())
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn authed(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn login_token(app: &Router) -> String {
    let register = json!({"name": "Ada", "email": "ada@example.com", "password": "pw"});
    let (status, _) = send(app, post_json("/api/register", register, None)).await;
    assert_eq!(status, StatusCode::OK);

    let login = json!({"email": "ada@example.com", "password": "pw"});
    let (status, body) = send(app, post_json("/login", login, None)).await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn hello_is_public() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/api/hello")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("ChainRisk"));
}

#[tokio::test]
async fn analyze_requires_token() {
    let (app, _) = app();
    let (status, body) = send(&app, post_json("/api/analyze", json!({"country": "India"}), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Missing authorization header");

    let (status, _) =
        send(&app, post_json("/api/analyze", json!({"country": "India"}), Some("forged.token.value"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_flow_and_authenticated_analyze() {
    let (app, _) = app();
    let token = login_token(&app).await;
    assert!(!token.is_empty());

    let (status, body) = send(&app, post_json("/api/analyze", json!({"country": "India"}), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["country"], "India");
    let score = body["risk_score"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&score));
    assert!(body["top_articles"].as_array().unwrap().len() <= 5);

    let (status, history) = send(&app, get("/api/history/India")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);

    let (status, summary) = send(&app, get("/api/global_summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["highest_risk"]["country"], "India");
    assert_eq!(summary["country_risk_map"]["India"].as_f64(), Some(score));
}

#[tokio::test]
async fn me_returns_profile() {
    let (app, _) = app();
    let token = login_token(&app).await;
    let req = Request::get("/api/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"username": "ada@example.com", "name": "Ada"}));
}

#[tokio::test]
async fn analyze_without_input_is_validation_error() {
    let (app, _) = app();
    let token = login_token(&app).await;
    let (status, body) =
        send(&app, post_json("/api/analyze", json!({"country": "  "}), Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("ValidationError"));
}

#[tokio::test]
async fn bad_credentials_and_duplicate_register() {
    let (app, _) = app();
    login_token(&app).await;

    let wrong = json!({"email": "ada@example.com", "password": "nope"});
    let (status, body) = send(&app, post_json("/api/login", wrong, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "invalid_credentials");

    let again = json!({"name": "Ada", "email": "ADA@example.com", "password": "x"});
    let (status, body) = send(&app, post_json("/api/register", again, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "User already exists");

    let blank = json!({"name": "", "email": "b@example.com", "password": "x"});
    let (status, _) = send(&app, post_json("/api/register", blank, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn predict_accepts_named_features_only() {
    let (app, state) = app();
    let token = login_token(&app).await;

    let array = json!({"features": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]});
    let (status, _) = send(&app, post_json("/api/predict", array, Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let named = json!({"features": {"keyword_score": 40.0}});
    let (status, body) = send(&app, post_json("/api/predict", named, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"risk_score": 20.0, "status": "Low risk"}));

    let (status, _) = send(&app, post_json("/api/predict", json!({}), Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let latest = state.engine.history().latest_per_country().await.unwrap();
    assert_eq!(latest.get("UNKNOWN"), Some(&20.0));
}

#[tokio::test]
async fn history_is_newest_first_and_clamped() {
    let (app, state) = app();
    let now = Utc::now();
    for day in 0..5 {
        state
            .engine
            .history()
            .record("Chile", day as f64 * 10.0, now - Duration::days(4 - day))
            .await
            .unwrap();
    }

    let (_, body) = send(&app, get("/api/history/Chile?days=3")).await;
    let scores: Vec<f64> = body.as_array().unwrap().iter().map(|p| p["risk_score"].as_f64().unwrap()).collect();
    assert_eq!(scores, vec![40.0, 30.0, 20.0]);

    let (_, body) = send(&app, get("/api/history/Chile?days=0")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&app, get("/api/history/Nowhere")).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn global_summary_alias_and_empty_state() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/api/global-summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk_list"], json!([]));
    assert_eq!(body["highest_risk"], Value::Null);
    assert_eq!(body["average_risk"], Value::Null);
}

#[tokio::test]
async fn foreground_training_reports_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("dataset.json");
    let rows: Vec<Value> = (0..20)
        .map(|i| {
            let i = i as f64;
            let kw = (i * 13.0) % 50.0;
            let weather = i % 10.0;
            json!({
                "features": {"keyword_score": kw, "weather_risk": weather, "hist_delay": (i * 3.0) % 7.0},
                "risk_score": 2.0 + 0.5 * kw + 2.0 * weather,
            })
        })
        .collect();
    std::fs::write(&dataset, Value::Array(rows).to_string()).unwrap();

    let mut config = config();
    config.model.dataset_path = dataset.to_string_lossy().into_owned();
    config.model.model_path = Some(dir.path().join("model.json").to_string_lossy().into_owned());
    let (app, state) = app_with(config);
    let token = login_token(&app).await;

    let (status, body) = send(&app, post_json("/api/train?background=false", json!({}), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "trained");
    assert_eq!(body["metrics"]["n_train"], 17);
    assert!(state.engine.has_trained_model().await);
    assert!(dir.path().join("model.json").exists());

    let (_, body) = send(&app, post_json("/api/analyze", json!({"country": "Peru"}), Some(&token))).await;
    assert_eq!(body["status"], "AI Model");
}

#[tokio::test]
async fn training_without_dataset_fails() {
    let mut config = config();
    config.model.dataset_path = "/nonexistent/dataset.json".to_string();
    let (app, _) = app_with(config);
    let token = login_token(&app).await;

    let (status, body) = send(&app, post_json("/api/train?background=false", json!({}), Some(&token))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("Dataset not found"));

    let (status, body) = send(&app, post_json("/api/train", json!({}), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "training_started_background"}));
}

#[tokio::test]
async fn open_api_when_protection_disabled() {
    let mut config = config();
    config.auth.protect_api = false;
    let (app, _) = app_with(config);

    let (status, body) = send(&app, post_json("/api/analyze", json!({"text": "flood at port"}), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["country"], "UNKNOWN");

    let (status, _) = send(&app, post_json("/api/analyze", json!({"text": "x"}), Some("bad"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_query_and_path_values_are_json_errors() {
    let (app, _) = app();
    let token = login_token(&app).await;

    let resp = app.clone().oneshot(get("/api/history/India?days=abc")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    let body: Value = serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert!(body["detail"].as_str().unwrap().starts_with("ValidationError"), "{}", body);

    let (status, body) =
        send(&app, post_json("/api/train?background=maybe", json!({}), Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("ValidationError"));

    let (status, body) = send(&app, authed(Method::PATCH, "/api/inventory/SKU-1?delta=lots", &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn orders_create_list_get_delete() {
    let (app, _) = app();
    let order = json!({"order_id": "O1", "country": "India", "supplier": "Acme", "qty": 12});

    let (status, _) = send(&app, post_json("/api/orders", order.clone(), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login_token(&app).await;
    let (status, body) = send(&app, post_json("/api/orders", order.clone(), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "order_id": "O1"}));

    let (status, body) = send(&app, post_json("/api/orders", order, Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Order ID already exists.");

    let second = json!({"order_id": "O2", "country": "Chile", "supplier": "Acme", "qty": 3, "eta": "2025-01-01"});
    send(&app, post_json("/api/orders", second, Some(&token))).await;

    let (_, body) = send(&app, get("/api/orders?limit=1")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["order_id"], "O2");
    let (_, body) = send(&app, get("/api/orders")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(&app, get("/api/orders/O1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["qty"], 12);
    assert_eq!(body["eta"], Value::Null);
    assert!(body["created_at"].is_string());

    let (status, body) = send(&app, authed(Method::DELETE, "/api/orders/O1", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "deleted"}));

    let (status, body) = send(&app, authed(Method::DELETE, "/api/orders/O1", &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Order not found");
    let (status, _) = send(&app, get("/api/orders/O1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn shipment_status_updates() {
    let (app, _) = app();
    let token = login_token(&app).await;
    let shipment = json!({"shipment_id": "S1", "order_id": "O1", "origin": "Shenzhen", "destination": "Rotterdam"});

    let (status, body) = send(&app, post_json("/api/shipments", shipment, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "shipment_id": "S1"}));

    let (_, body) = send(&app, get("/api/shipments/S1")).await;
    assert_eq!(body["status"], "in_transit");

    let (status, body) = send(&app, authed(Method::PATCH, "/api/shipments/S1?status=delivered", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "updated"}));
    let (_, body) = send(&app, get("/api/shipments/S1")).await;
    assert_eq!(body["status"], "delivered");

    let (status, body) = send(&app, authed(Method::PATCH, "/api/shipments/S9?status=lost", &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Shipment not found");

    let (status, body) = send(&app, authed(Method::PATCH, "/api/shipments/S1", &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("ValidationError"));
}

#[tokio::test]
async fn inventory_quantity_deltas() {
    let (app, _) = app();
    let token = login_token(&app).await;
    let item = json!({"sku": "SKU-1", "location": "WH1", "qty": 10});

    let (status, body) = send(&app, post_json("/api/inventory", item.clone(), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
    let (status, _) = send(&app, post_json("/api/inventory", item, Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, authed(Method::PATCH, "/api/inventory/SKU-1?delta=-3", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, get("/api/inventory/SKU-1")).await;
    assert_eq!(body["qty"], 7);
    assert_eq!(body["location"], "WH1");

    let (status, body) = send(&app, get("/api/inventory/SKU-404")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Inventory item not found");

    let blank = json!({"sku": "", "location": "WH1", "qty": 1});
    let (status, body) = send(&app, post_json("/api/inventory", blank, Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "ValidationError: sku is required");
}

#[tokio::test]
async fn event_feed_frames_are_named_and_numbered() {
    let (app, state) = app();
    let resp = app.clone().oneshot(get("/api/events")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let mut frames = resp.into_body().into_data_stream();

    state.event_tx.send(AppEvent::TrainingStarted).unwrap();
    state
        .event_tx
        .send(AppEvent::RiskRecorded { country: "Chile".into(), risk_score: 12.5 })
        .unwrap();

    let mut text = String::new();
    while !text.contains("risk_recorded") || !text.ends_with("\n\n") {
        let chunk = tokio::time::timeout(std::time::Duration::from_secs(5), frames.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        text.push_str(&String::from_utf8_lossy(&chunk));
    }

    assert!(text.contains("event: training_started\n"), "{}", text);
    assert!(text.contains("id: 1\n"), "{}", text);
    assert!(text.contains("event: risk_recorded\n"), "{}", text);
    assert!(text.contains("id: 2\n"), "{}", text);
    assert!(text.contains(r#"data: {"type":"risk_recorded","country":"Chile","risk_score":12.5}"#), "{}", text);
}
