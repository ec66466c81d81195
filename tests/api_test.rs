use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use cloudrec::config::Config;

/// In-process stand-in for the provider's cloud recording control plane,
/// plus a download endpoint for remote-file descriptors. Returns its origin.
async fn mock_provider() -> String {
    let app = Router::new()
        .route(
            "/v1/apps/{app}/cloud_recording/acquire",
            post(|| async { Json(json!({"resourceId": "res-0001"})) }),
        )
        .route(
            "/v1/apps/{app}/cloud_recording/resourceid/{rid}/mode/{mode}/start",
            post(|| async { Json(json!({"sid": "sid-0001"})) }),
        )
        .route(
            "/v1/apps/{app}/cloud_recording/resourceid/{rid}/sid/{sid}/mode/{mode}/stop",
            post(|| async {
                Json(json!({
                    "resourceId": "res-0001",
                    "sid": "sid-0001",
                    "serverResponse": {"uploadingStatus": "uploading"},
                }))
            }),
        )
        .route(
            "/v1/apps/{app}/cloud_recording/resourceid/{rid}/sid/{sid}/mode/{mode}/query",
            get(|| async { Json(json!({"serverResponse": {"status": 5}})) }),
        )
        .route(
            "/v1/apps/{app}/cloud_recording/resourceid/{rid}/sid/{sid}/mode/{mode}/updateLayout",
            post(|| async { Json(json!({})) }),
        )
        .route("/media/{file}", get(|| async { "fake media bytes" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{}", addr)
}

fn test_config(origin: &str, storage_root: &str, webhook_secret: Option<String>) -> Config {
    let mut cfg = Config::default();
    cfg.http.public_url = "http://127.0.0.1:8080".to_string();
    cfg.provider.api_base = format!("{}/v1", origin);
    cfg.provider.app_id = "test-app".to_string();
    cfg.provider.app_certificate = "test-cert".to_string();
    cfg.provider.customer_id = "customer".to_string();
    cfg.provider.customer_secret = "customer-secret".to_string();
    cfg.storage.root = storage_root.to_string();
    cfg.auth.webhook_secret = webhook_secret;
    cfg
}

async fn test_app(origin: &str, storage: &TempDir, webhook_secret: Option<String>) -> Router {
    let cfg = test_config(origin, storage.path().to_str().unwrap(), webhook_secret);
    cloudrec::app(cloudrec::app_state(cfg).unwrap())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn send_json(app: &Router, method: &str, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send_get(app: &Router, path: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

fn start_body(channel: &str) -> Value {
    json!({
        "channelName": channel,
        "uid": 42,
        "recordingMode": "mix",
        "initiatorRole": "host",
    })
}

fn stop_body(channel: &str) -> Value {
    json!({
        "resourceId": "res-0001",
        "sid": "sid-0001",
        "channelName": channel,
        "uid": 42,
        "initiatorRole": "host",
    })
}

#[tokio::test]
async fn test_end_to_end_start_stop_webhook_poll() {
    let origin = mock_provider().await;
    let storage = TempDir::new().unwrap();
    let app = test_app(&origin, &storage, None).await;

    let (status, body) = send_json(&app, "POST", "/recording/start", start_body("room1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resourceId"], "res-0001");
    assert_eq!(body["sid"], "sid-0001");
    assert_eq!(body["initiatedBy"], "host");

    // Stop right away: no callback arrived yet, so the response degrades to
    // the poll contract instead of blocking on the provider's upload.
    let (status, body) = send_json(&app, "POST", "/recording/stop", stop_body("room1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "stopped");
    assert_eq!(body["uploadingStatus"], "pending");
    assert!(body["files"].is_null());
    let poll_endpoint = body["pollEndpoint"].as_str().unwrap();
    assert!(poll_endpoint.ends_with("/recording/sid-0001"));

    let (status, _) = send_get(&app, "/recording/sid-0001").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send_json(
        &app,
        "POST",
        "/upload-webhook",
        json!({
            "sid": "sid-0001",
            "resourceId": "res-0001",
            "fileList": [{"fileName": "clip.mp4", "url": format!("{}/media/clip.mp4", origin)}],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], 1);

    let (status, body) = send_get(&app, "/recording/sid-0001").await;
    assert_eq!(status, StatusCode::OK);
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["originalName"], "clip.mp4");
    assert!(files[0]["publicUrl"]
        .as_str()
        .unwrap()
        .starts_with("http://127.0.0.1:8080/uploads/"));

    // The download was awaited before the webhook acknowledgement, so the
    // bytes are already on disk.
    let stored_name = files[0]["storedName"].as_str().unwrap();
    let content = std::fs::read(storage.path().join(stored_name)).unwrap();
    assert_eq!(content, b"fake media bytes");
}

#[tokio::test]
async fn test_second_start_for_same_channel_conflicts() {
    let origin = mock_provider().await;
    let storage = TempDir::new().unwrap();
    let app = test_app(&origin, &storage, None).await;

    let (status, _) = send_json(&app, "POST", "/recording/start", start_body("room1")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(&app, "POST", "/recording/start", start_body("room1")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Recording already in progress for this channel");

    // Other channels are unaffected.
    let (status, _) = send_json(&app, "POST", "/recording/start", start_body("room2")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_stop_frees_the_channel_for_a_new_start() {
    let origin = mock_provider().await;
    let storage = TempDir::new().unwrap();
    let app = test_app(&origin, &storage, None).await;

    let (status, _) = send_json(&app, "POST", "/recording/start", start_body("room1")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send_json(&app, "POST", "/recording/stop", stop_body("room1")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_get(&app, "/recording/sessions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (status, _) = send_json(&app, "POST", "/recording/start", start_body("room1")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_non_host_mutations_rejected_without_side_effects() {
    let origin = mock_provider().await;
    let storage = TempDir::new().unwrap();
    let app = test_app(&origin, &storage, None).await;

    let mut body = start_body("room1");
    body["initiatorRole"] = json!("audience");
    let (status, response) = send_json(&app, "POST", "/recording/start", body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(response["message"], "Only HOST can start recording");

    let mut body = stop_body("room1");
    body["initiatorRole"] = json!("audience");
    let (status, _) = send_json(&app, "POST", "/recording/stop", body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, sessions) = send_get(&app, "/recording/sessions").await;
    assert_eq!(sessions["count"], 0);
}

#[tokio::test]
async fn test_stop_without_identifiers_is_a_validation_error() {
    let origin = mock_provider().await;
    let storage = TempDir::new().unwrap();
    let app = test_app(&origin, &storage, None).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/recording/stop",
        json!({"channelName": "room1", "initiatorRole": "host"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], 2);
    assert_eq!(body["errorMessage"], "Invalid parameter");
}

#[tokio::test]
async fn test_query_merges_provider_status_and_local_files() {
    let origin = mock_provider().await;
    let storage = TempDir::new().unwrap();
    let app = test_app(&origin, &storage, None).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/recording/query",
        json!({"resourceId": "res-0001", "sid": "sid-0001"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 5);
    assert!(body["files"].is_null());

    send_json(
        &app,
        "POST",
        "/upload-webhook",
        json!({
            "sid": "sid-0001",
            "fileList": [{"fileName": "clip.mp4", "url": format!("{}/media/clip.mp4", origin)}],
        }),
    )
    .await;

    let (_, body) = send_json(
        &app,
        "POST",
        "/recording/query",
        json!({"resourceId": "res-0001", "sid": "sid-0001"}),
    )
    .await;
    assert_eq!(body["files"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_layout_is_host_only() {
    let origin = mock_provider().await;
    let storage = TempDir::new().unwrap();
    let app = test_app(&origin, &storage, None).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/recording/update-layout",
        json!({
            "resourceId": "res-0001",
            "sid": "sid-0001",
            "layoutConfig": {"layout": 2, "backgroundColor": "#ffffff"},
            "initiatorRole": "host",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Layout updated successfully");

    let (status, _) = send_json(
        &app,
        "POST",
        "/recording/update-layout",
        json!({
            "resourceId": "res-0001",
            "sid": "sid-0001",
            "initiatorRole": "audience",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_webhook_with_zero_files_writes_no_batch() {
    let origin = mock_provider().await;
    let storage = TempDir::new().unwrap();
    let app = test_app(&origin, &storage, None).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/upload-webhook",
        json!({"sid": "sid-meta", "status": "uploaded"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], 0);

    let (status, _) = send_get(&app, "/recording/sid-meta").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_redelivery_replaces_the_previous_batch() {
    let origin = mock_provider().await;
    let storage = TempDir::new().unwrap();
    let app = test_app(&origin, &storage, None).await;

    for name in ["first.mp4", "second.mp4"] {
        let (status, _) = send_json(
            &app,
            "POST",
            "/upload-webhook",
            json!({
                "sid": "sid-0001",
                "fileList": [{"fileName": name, "url": format!("{}/media/{}", origin, name)}],
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send_get(&app, "/recording/sid-0001").await;
    assert_eq!(status, StatusCode::OK);
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["originalName"], "second.mp4");
}

#[tokio::test]
async fn test_multipart_inline_files_are_persisted() {
    let origin = mock_provider().await;
    let storage = TempDir::new().unwrap();
    let app = test_app(&origin, &storage, None).await;

    let body = concat!(
        "--XBOUNDARY\r\n",
        "Content-Disposition: form-data; name=\"file\"; filename=\"audio.ogg\"\r\n",
        "Content-Type: application/octet-stream\r\n",
        "\r\n",
        "OGGDATA\r\n",
        "--XBOUNDARY\r\n",
        "Content-Disposition: form-data; name=\"sid\"\r\n",
        "\r\n",
        "sid-multi\r\n",
        "--XBOUNDARY--\r\n",
    );
    let request = Request::builder()
        .method("POST")
        .uri("/upload-webhook")
        .header(
            header::CONTENT_TYPE,
            "multipart/form-data; boundary=XBOUNDARY",
        )
        .body(Body::from(body))
        .unwrap();
    let (status, response) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["received"], 1);

    let (status, body) = send_get(&app, "/recording/sid-multi").await;
    assert_eq!(status, StatusCode::OK);
    let files = body["files"].as_array().unwrap();
    assert_eq!(files[0]["originalName"], "audio.ogg");

    let stored_name = files[0]["storedName"].as_str().unwrap();
    let content = std::fs::read(storage.path().join(stored_name)).unwrap();
    assert_eq!(content, b"OGGDATA");
}

#[tokio::test]
async fn test_correlation_hints_fall_back_to_headers() {
    let origin = mock_provider().await;
    let storage = TempDir::new().unwrap();
    let app = test_app(&origin, &storage, None).await;

    let body = json!({
        "fileList": [{"fileName": "clip.mp4", "url": format!("{}/media/clip.mp4", origin)}],
    });
    let request = Request::builder()
        .method("POST")
        .uri("/upload-webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-session-id", "sid-header")
        .header("x-resource-id", "res-header")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_get(&app, "/recording/sid-header").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_signature_is_enforced_when_configured() {
    let origin = mock_provider().await;
    let storage = TempDir::new().unwrap();
    let secret = "webhook-secret".to_string();
    let app = test_app(&origin, &storage, Some(secret.clone())).await;

    let body = json!({"sid": "sid-signed", "status": "uploaded"}).to_string();
    let timestamp = "1700000000";
    let signature =
        cloudrec::signature::sign(&secret, "POST", "/upload-webhook", timestamp, body.as_bytes());

    // Unsigned requests never reach the handler.
    let request = Request::builder()
        .method("POST")
        .uri("/upload-webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.clone()))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A tampered body under an unchanged signature is rejected.
    let request = Request::builder()
        .method("POST")
        .uri("/upload-webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-signature", signature.clone())
        .header("x-timestamp", timestamp)
        .body(Body::from(
            json!({"sid": "sid-evil", "status": "uploaded"}).to_string(),
        ))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The same body with a freshly computed signature is accepted.
    let request = Request::builder()
        .method("POST")
        .uri("/upload-webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-signature", signature)
        .header("x-timestamp", timestamp)
        .body(Body::from(body))
        .unwrap();
    let (status, response) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], true);
}

#[tokio::test]
async fn test_client_routes_honor_bearer_tokens() {
    let origin = mock_provider().await;
    let storage = TempDir::new().unwrap();
    let mut cfg = test_config(&origin, storage.path().to_str().unwrap(), None);
    cfg.auth.tokens = vec!["api-token".to_string()];
    let app = cloudrec::app(cloudrec::app_state(cfg).unwrap());

    let request = Request::builder()
        .method("POST")
        .uri("/recording/start")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(start_body("room1").to_string()))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/recording/start")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer api-token")
        .body(Body::from(start_body("room1").to_string()))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    // The provider-facing webhook stays outside the bearer gate.
    let (status, _) = send_json(
        &app,
        "POST",
        "/upload-webhook",
        json!({"sid": "sid-x", "status": "uploaded"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
