use std::time::Duration;

use api_observatory::{Observatory, ObservatoryConfig};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// ─── Helpers ─────────────────────────────────────────────────────

async fn get_user(axum::extract::Path(id): axum::extract::Path<String>) -> Json<Value> {
    Json(json!({ "id": id, "name": "Ada" }))
}

async fn echo(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(json!({ "received": body, "id": 7 })))
}

async fn broken() -> (StatusCode, Json<Value>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "boom" })))
}

fn app(config: ObservatoryConfig) -> (Observatory, Router) {
    let obs = Observatory::new(config).unwrap();
    let api = Router::new()
        .route("/api/users/:id", get(get_user))
        .route("/api/echo", post(echo))
        .route("/api/broken", post(broken));
    let app = obs.attach(api);
    (obs, app)
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn get_req(app: &Router, uri: &str) -> Response {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    let body = body.to_string();
    let req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();
    send(app, req).await
}

async fn json_body(res: Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Recording happens on a spawned task; give it a moment to land.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

// ─── Middleware ──────────────────────────────────────────────────

#[tokio::test]
async fn records_under_route_template_with_server_timing() {
    let (obs, app) = app(ObservatoryConfig::new());

    let res = get_req(&app, "/api/users/42").await;
    assert_eq!(res.status(), StatusCode::OK);
    let timing = res.headers().get("server-timing").unwrap().to_str().unwrap();
    assert!(timing.starts_with("total;dur="));

    get_req(&app, "/api/users/43").await;
    settle().await;

    let metrics = obs.metrics().get_metrics();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].method, "GET");
    assert_eq!(metrics[0].pattern, "/api/users/:id");
    assert_eq!(metrics[0].count, 2);
    assert_eq!(metrics[0].error_rate.total, 0.0);
}

#[tokio::test]
async fn dashboard_requests_are_not_tracked() {
    let (obs, app) = app(ObservatoryConfig::new());

    get_req(&app, "/_observatory").await;
    get_req(&app, "/_observatory/metrics").await;
    get_req(&app, "/_observatory/metrics/GET/api/users/:id").await;
    settle().await;

    assert_eq!(obs.metrics().endpoint_count(), 0);
}

#[tokio::test]
async fn error_statuses_feed_error_rate() {
    let (obs, app) = app(ObservatoryConfig::new());

    post_json(&app, "/api/broken", json!({})).await;
    settle().await;

    let m = obs.metrics().get_endpoint_metrics("POST", "/api/broken").unwrap();
    assert_eq!(m.error_rate.server_5xx, 1.0);
    assert_eq!(m.error_rate.total, 1.0);
}

// ─── Dashboard ───────────────────────────────────────────────────

#[tokio::test]
async fn metrics_envelope_lists_endpoints() {
    let (_obs, app) = app(ObservatoryConfig::new());

    get_req(&app, "/api/users/1").await;
    settle().await;

    for uri in ["/_observatory", "/_observatory/metrics"] {
        let res = get_req(&app, uri).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["endpointCount"], 1);
        assert_eq!(body["endpoints"][0]["pattern"], "/api/users/:id");
        assert!(body["endpoints"][0]["latency"]["p50"].is_number());
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }
}

#[tokio::test]
async fn endpoint_lookup_ignores_method_case() {
    let (_obs, app) = app(ObservatoryConfig::new());

    get_req(&app, "/api/users/1").await;
    settle().await;

    let res = get_req(&app, "/_observatory/metrics/get/api/users/:id").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["endpoint"]["method"], "GET");
    assert_eq!(body["endpoint"]["count"], 1);
}

#[tokio::test]
async fn unknown_endpoint_is_404() {
    let (_obs, app) = app(ObservatoryConfig::new());

    let res = get_req(&app, "/_observatory/metrics/GET/nope").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(res).await,
        json!({ "error": "Endpoint not found", "status": 404 })
    );
}

#[tokio::test]
async fn reset_clears_everything() {
    let (obs, app) = app(ObservatoryConfig::new().capture_schemas(true));

    post_json(&app, "/api/echo", json!({ "name": "x" })).await;
    settle().await;
    assert_eq!(obs.metrics().endpoint_count(), 1);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/_observatory/reset")
        .body(Body::empty())
        .unwrap();
    let res = send(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["message"], "All metrics have been reset");

    assert_eq!(obs.metrics().endpoint_count(), 0);
    assert_eq!(obs.schemas().unwrap().endpoint_count(), 0);
}

#[tokio::test]
async fn custom_mount_path() {
    let (obs, app) = app(ObservatoryConfig::new().mount_path("/ops"));

    get_req(&app, "/api/users/1").await;
    let res = get_req(&app, "/ops/metrics").await;
    assert_eq!(res.status(), StatusCode::OK);
    settle().await;

    let patterns: Vec<_> = obs.metrics().get_metrics().into_iter().map(|m| m.pattern).collect();
    assert_eq!(patterns, vec!["/api/users/:id".to_string()]);
}

// ─── Schema capture ──────────────────────────────────────────────

#[tokio::test]
async fn captures_request_and_response_schemas() {
    let (_obs, app) = app(ObservatoryConfig::new().capture_schemas(true));

    let res = post_json(&app, "/api/echo", json!({ "name": "john", "age": 30 })).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    // The handler saw the body the client sent
    assert_eq!(json_body(res).await["received"]["name"], "john");

    post_json(&app, "/api/echo", json!({ "name": "jane" })).await;
    settle().await;

    let res = get_req(&app, "/_observatory/schemas/post/api/echo").await;
    assert_eq!(res.status(), StatusCode::OK);
    let schema = json_body(res).await["endpoint"].clone();

    assert_eq!(schema["method"], "POST");
    assert_eq!(schema["requestSampleCount"], 2);
    assert_eq!(schema["responseSampleCount"], 2);
    assert_eq!(schema["requestBody"]["type"], "object");
    assert_eq!(schema["requestBody"]["properties"]["name"]["type"], "string");
    assert_eq!(schema["requestBody"]["properties"]["age"]["required"], false);
    assert_eq!(schema["responseBody"]["properties"]["id"]["type"], "number");
}

#[tokio::test]
async fn error_responses_skip_response_schema() {
    let (obs, app) = app(ObservatoryConfig::new().capture_schemas(true));

    post_json(&app, "/api/broken", json!({ "name": "x" })).await;
    settle().await;

    let schema = obs
        .schemas()
        .unwrap()
        .get_endpoint_schema("POST", "/api/broken")
        .unwrap();
    assert_eq!(schema.request_sample_count, 1);
    assert!(schema.response_body.is_none());
}

#[tokio::test]
async fn schema_routes_need_capture_enabled() {
    let (_obs, app) = app(ObservatoryConfig::new());

    let res = get_req(&app, "/_observatory/schemas").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_schema_is_404() {
    let (_obs, app) = app(ObservatoryConfig::new().capture_schemas(true));

    let res = get_req(&app, "/_observatory/schemas/GET/api/users/:id").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(res).await["error"], "Endpoint schema not found");
}

// ─── Lifecycle ───────────────────────────────────────────────────

#[tokio::test]
async fn start_and_shutdown_control_eviction() {
    let (obs, _app) = app(ObservatoryConfig::new());

    obs.start();
    assert!(obs.metrics().is_evicting());
    obs.shutdown();
    obs.shutdown();
    tokio::task::yield_now().await;
    assert!(!obs.metrics().is_evicting());
}
