//! Functional tests for the balancer HTTP API

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use instance_balancer::{
    api::create_router,
    config::{InstanceConfig, Settings},
    AppState,
};

async fn backend(name: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "instance": name })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

/// A port nothing listens on
fn refused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn create_test_app(ports: &[u16]) -> (Arc<AppState>, Router) {
    let mut settings = Settings::default();
    settings.dispatch.timeout_ms = 2000;
    settings.instances = ports
        .iter()
        .map(|port| InstanceConfig {
            ip: "127.0.0.1".to_string(),
            port: *port,
        })
        .collect();

    let state = Arc::new(AppState::from_settings(settings).unwrap());
    let app = create_router(state.clone());
    (state, app)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let (status, _, body) = send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap(),
    )
    .await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_form(app: &Router, uri: &str, form: &'static str) -> (StatusCode, axum::http::HeaderMap) {
    let (status, headers, _) = send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap(),
    )
    .await;
    (status, headers)
}

#[tokio::test]
async fn test_health_lists_instances_in_order() {
    let (_state, app) = create_test_app(&[5001, 5002]);

    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {"ip": "127.0.0.1", "port": 5001, "active": true},
            {"ip": "127.0.0.1", "port": 5002, "active": true}
        ])
    );
}

#[tokio::test]
async fn test_process_round_robins_and_relays_body() {
    let a = backend("a").await;
    let b = backend("b").await;
    let (_state, app) = create_test_app(&[a.address().port(), b.address().port()]);

    let mut seen = Vec::new();
    for _ in 0..3 {
        let (status, body) = get_json(&app, "/process").await;
        assert_eq!(status, StatusCode::OK);
        seen.push(body["instance"].as_str().unwrap().to_string());
    }

    assert_eq!(seen, vec!["a", "b", "a"]);
}

#[tokio::test]
async fn test_process_relays_backend_status_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/process"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "detail": "bad batch" })))
        .mount(&server)
        .await;
    let (state, app) = create_test_app(&[server.address().port()]);

    let (status, headers, body) = send(
        &app,
        Request::builder().uri("/process").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    assert_eq!(
        serde_json::from_slice::<Value>(&body).unwrap(),
        json!({ "detail": "bad batch" })
    );
    // an answer, even an error status, keeps the instance healthy
    assert!(state.registry.list()[0].healthy);
}

#[tokio::test]
async fn test_process_without_instances_is_unavailable() {
    let (state, app) = create_test_app(&[]);

    let (status, body) = get_json(&app, "/process").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
    assert_eq!(state.registry.cursor(), 0);
}

#[tokio::test]
async fn test_refused_instance_is_marked_down_and_skipped() {
    let good = backend("good").await;
    let dead = refused_port();
    let (state, app) = create_test_app(&[dead, good.address().port()]);

    let (status, body) = get_json(&app, "/process").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("unreachable"));

    let (_, health) = get_json(&app, "/health").await;
    assert_eq!(health[0]["active"], json!(false));
    assert_eq!(health[1]["active"], json!(true));

    for _ in 0..2 {
        let (status, body) = get_json(&app, "/process").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["instance"], "good");
    }
    assert_eq!(state.registry.healthy_subset().len(), 1);
}

#[tokio::test]
async fn test_add_instance_json() {
    let (_state, app) = create_test_app(&[5001]);

    let (status, body) =
        post_json(&app, "/add_instance", json!({"ip": "127.0.0.1", "port": 5004})).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["index"], json!(1));
    assert!(body["message"].is_string());

    let (_, health) = get_json(&app, "/health").await;
    assert_eq!(health[1], json!({"ip": "127.0.0.1", "port": 5004, "active": true}));
}

#[tokio::test]
async fn test_add_instance_json_rejects_bad_address() {
    let (state, app) = create_test_app(&[5001]);

    let (status, body) =
        post_json(&app, "/add_instance", json!({"ip": "not a host", "port": 5004})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid address"));

    let (status, _) = post_json(&app, "/add_instance", json!({"ip": "127.0.0.1", "port": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn test_add_instance_malformed_json() {
    let (_state, app) = create_test_app(&[]);

    let (status, _, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/add_instance")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_add_instance_form_redirects() {
    let (state, app) = create_test_app(&[]);

    let (status, headers) = post_form(&app, "/add_instance", "ip=127.0.0.1&port=5004").await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/");
    assert_eq!(state.registry.list()[0].address.port(), 5004);
}

#[tokio::test]
async fn test_add_instance_form_with_bad_port_still_redirects() {
    let (state, app) = create_test_app(&[]);

    let (status, _) = post_form(&app, "/add_instance", "ip=127.0.0.1&port=abc").await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn test_remove_instance_json_shifts_positions() {
    let (_state, app) = create_test_app(&[5001, 5002, 5003]);

    let (status, body) = post_json(&app, "/remove_instance", json!({"index": 0})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "instance 127.0.0.1:5001 removed");

    let (_, health) = get_json(&app, "/health").await;
    assert_eq!(health[0]["port"], json!(5002));
    assert_eq!(health[1]["port"], json!(5003));
}

#[tokio::test]
async fn test_remove_instance_json_invalid_index() {
    let (state, app) = create_test_app(&[5001]);

    for payload in [json!({"index": 1}), json!({"index": -1}), json!({})] {
        let (status, body) = post_json(&app, "/remove_instance", payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "invalid index"}));
    }
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn test_remove_instance_form_redirects() {
    let (state, app) = create_test_app(&[5001, 5002]);

    let (status, headers) = post_form(&app, "/remove_instance", "index=1").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/");
    assert_eq!(state.registry.len(), 1);

    let (status, _) = post_form(&app, "/remove_instance", "index=9").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn test_index_page_shows_pool() {
    let (_state, app) = create_test_app(&[5001]);

    let (status, headers, body) = send(
        &app,
        Request::builder().uri("/").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("127.0.0.1:5001"));
    assert!(html.contains(r#"action="/add_instance""#));
}

#[tokio::test]
async fn test_remove_instance_form_without_content_type_redirects() {
    let (state, app) = create_test_app(&[5001, 5002]);

    for content_type in [None, Some("text/plain")] {
        let mut builder = Request::builder().method("POST").uri("/remove_instance");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let (status, headers, _) = send(&app, builder.body(Body::from("index=0")).unwrap()).await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION], "/");
    }
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn test_remove_instance_json_float_index() {
    let (state, app) = create_test_app(&[5001, 5002]);

    let (status, body) = post_json(&app, "/remove_instance", json!({"index": 2.0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "invalid index"}));

    let (status, body) = post_json(&app, "/remove_instance", json!({"index": 0.5})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "invalid index"}));

    let (status, _) = post_json(&app, "/remove_instance", json!({"index": 1.0})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.registry.list()[0].address.port(), 5001);
}
