//! Integration tests for facereg-api HTTP endpoints
//!
//! The inference service is stubbed with httpmock; the store is in-memory
//! SQLite behind a single connection.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use facereg_api::services::InferenceClient;
use facereg_api::{build_router, cors_layer, AppState};
use httpmock::prelude::*;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: in-memory store with the schema applied
async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");
    facereg_api::db::init_tables(&pool)
        .await
        .expect("Should create tables");
    pool
}

/// Test helper: router wired to an inference service at `inference_url`
async fn test_app(inference_url: &str) -> (Router, SqlitePool) {
    let pool = memory_pool().await;
    let inference = InferenceClient::new(inference_url, None).expect("Should build client");
    let state = AppState::new(pool.clone(), inference, None);
    (build_router(state), pool)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn stored_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM face_registrations")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn mock_encode(server: &MockServer, encoding: Value) {
    server
        .mock_async(move |when, then| {
            when.method(POST).path("/encode");
            then.status(200)
                .json_body(json!({"success": true, "encoding": encoding}));
        })
        .await;
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_alice_example() {
    let server = MockServer::start_async().await;
    let encode = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/encode")
                .json_body(json!({"image": "data:image/jpeg;base64,AAAA"}));
            then.status(200)
                .json_body(json!({"success": true, "encoding": [0.1, 0.2, 0.3]}));
        })
        .await;
    let (app, pool) = test_app(&server.base_url()).await;

    let before = Utc::now() - chrono::Duration::milliseconds(1);
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/face/register",
            json!({"name": "Alice", "image": "data:image/jpeg;base64,AAAA"}),
        ))
        .await
        .unwrap();
    let after = Utc::now();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Face registered successfully");
    assert_eq!(body["registration"]["name"], "Alice");
    assert!(body["registration"].get("encoding").is_none());

    let registered_at: DateTime<Utc> = body["registration"]["registeredAt"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(registered_at >= before && registered_at <= after);

    encode.assert_async().await;
    assert_eq!(stored_count(&pool).await, 1);

    let response = app.oneshot(get_request("/api/face/registered")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let records = extract_json(response.into_body()).await;
    assert_eq!(records[0]["name"], "Alice");
    assert_eq!(records[0]["encoding"], json!([0.1, 0.2, 0.3]));
}

#[tokio::test]
async fn test_register_trims_name() {
    let server = MockServer::start_async().await;
    mock_encode(&server, json!([0.5])).await;
    let (app, _pool) = test_app(&server.base_url()).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/face/register",
            json!({"name": "  Bob  ", "image": "data:image/jpeg;base64,AAAA"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["registration"]["name"], "Bob");
}

#[tokio::test]
async fn test_register_missing_fields_is_400_without_record() {
    let server = MockServer::start_async().await;
    let encode = server
        .mock_async(|when, then| {
            when.method(POST).path("/encode");
            then.status(200).json_body(json!({"success": true, "encoding": [1.0]}));
        })
        .await;
    let (app, pool) = test_app(&server.base_url()).await;

    let bodies = [
        json!({"image": "data:image/jpeg;base64,AAAA"}),
        json!({"name": "", "image": "data:image/jpeg;base64,AAAA"}),
        json!({"name": "   ", "image": "data:image/jpeg;base64,AAAA"}),
        json!({"name": "Alice"}),
        json!({}),
    ];

    for body in bodies {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/face/register", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"], "Name and image are required");
    }

    encode.assert_hits_async(0).await;
    assert_eq!(stored_count(&pool).await, 0);
}

#[tokio::test]
async fn test_register_unparseable_body_is_validation_error() {
    let (app, pool) = test_app("http://127.0.0.1:9").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/face/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Name and image are required");
    assert_eq!(stored_count(&pool).await, 0);
}

#[tokio::test]
async fn test_register_no_face_is_400_without_record() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/encode");
            then.status(400)
                .json_body(json!({"error": "No face detected in the image"}));
        })
        .await;
    let (app, pool) = test_app(&server.base_url()).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/face/register",
            json!({"name": "Alice", "image": "data:image/jpeg;base64,AAAA"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "No face detected in the image");
    assert_eq!(stored_count(&pool).await, 0);
}

#[tokio::test]
async fn test_register_empty_encoding_is_no_face() {
    let server = MockServer::start_async().await;
    mock_encode(&server, json!([])).await;
    let (app, pool) = test_app(&server.base_url()).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/face/register",
            json!({"name": "Alice", "image": "data:image/jpeg;base64,AAAA"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "No face detected in the image");
    assert_eq!(stored_count(&pool).await, 0);
}

#[tokio::test]
async fn test_register_unreachable_inference_is_500_generic() {
    let (app, pool) = test_app("http://127.0.0.1:9").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/face/register",
            json!({"name": "Alice", "image": "data:image/jpeg;base64,AAAA"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Failed to register face");
    assert_eq!(stored_count(&pool).await, 0);
}

#[tokio::test]
async fn test_concurrent_same_name_registrations_both_stored() {
    let server = MockServer::start_async().await;
    mock_encode(&server, json!([0.9, 0.8])).await;
    let (app, pool) = test_app(&server.base_url()).await;

    let register = || {
        app.clone().oneshot(json_request(
            "POST",
            "/api/face/register",
            json!({"name": "Twin", "image": "data:image/jpeg;base64,AAAA"}),
        ))
    };
    let (a, b) = tokio::join!(register(), register());

    assert_eq!(a.unwrap().status(), StatusCode::CREATED);
    assert_eq!(b.unwrap().status(), StatusCode::CREATED);
    assert_eq!(stored_count(&pool).await, 2);

    let response = app.oneshot(get_request("/api/face/registered")).await.unwrap();
    let records = extract_json(response.into_body()).await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_ne!(records[0]["id"], records[1]["id"]);
    assert!(records.iter().all(|r| r["name"] == "Twin"));
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_registered_is_newest_first() {
    let server = MockServer::start_async().await;
    mock_encode(&server, json!([1.0])).await;
    let (app, _pool) = test_app(&server.base_url()).await;

    for name in ["first", "second", "third"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/face/register",
                json!({"name": name, "image": "data:image/jpeg;base64,AAAA"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.oneshot(get_request("/api/face/registered")).await.unwrap();
    let records = extract_json(response.into_body()).await;
    let records = records.as_array().unwrap();

    let names: Vec<&str> = records.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["third", "second", "first"]);

    let stamps: Vec<DateTime<Utc>> = records
        .iter()
        .map(|r| r["registeredAt"].as_str().unwrap().parse().unwrap())
        .collect();
    assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_registered_empty_store() {
    let (app, _pool) = test_app("http://127.0.0.1:9").await;

    let response = app.oneshot(get_request("/api/face/registered")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await, json!([]));
}

#[tokio::test]
async fn test_all_users_export() {
    let server = MockServer::start_async().await;
    mock_encode(&server, json!([0.1, 0.2, 0.3])).await;
    let (app, _pool) = test_app(&server.base_url()).await;

    for name in ["Alice", "Bob"] {
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/face/register",
                json!({"name": name, "image": "data:image/jpeg;base64,AAAA"}),
            ))
            .await
            .unwrap();
    }

    let response = app.oneshot(get_request("/api/face/allUsers")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(
        body["users"],
        json!([
            {"name": "Alice", "encoding": [0.1, 0.2, 0.3]},
            {"name": "Bob", "encoding": [0.1, 0.2, 0.3]}
        ])
    );
}

// =============================================================================
// Recognition
// =============================================================================

#[tokio::test]
async fn test_recognize_relays_body_verbatim() {
    let server = MockServer::start_async().await;
    let faces = json!([
        {"name": "Alice", "confidence": 0.93, "box": {"top": 10, "right": 90, "bottom": 80, "left": 20}},
        {"name": "Unknown", "confidence": 0.0, "facial_area": {"x": 1, "y": 2, "w": 3, "h": 4}}
    ]);
    let upstream = faces.clone();
    server
        .mock_async(move |when, then| {
            when.method(POST).path("/recognize");
            then.status(200).json_body(upstream);
        })
        .await;
    let (app, _pool) = test_app(&server.base_url()).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/recognition/recognize",
            json!({"image": "data:image/jpeg;base64,AAAA"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await, faces);
}

#[tokio::test]
async fn test_recognize_missing_image_is_400() {
    let (app, _pool) = test_app("http://127.0.0.1:9").await;

    let response = app
        .oneshot(json_request("POST", "/api/recognition/recognize", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "No image provided");
}

#[tokio::test]
async fn test_recognize_unreachable_service_is_500_generic() {
    let (app, _pool) = test_app("http://127.0.0.1:9").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/recognition/recognize",
            json!({"image": "data:image/jpeg;base64,AAAA"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!({"error": "Error processing recognition request"}));
}

#[tokio::test]
async fn test_recognize_upstream_error_is_not_forwarded() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/recognize");
            then.status(400).json_body(json!({"error": "model exploded"}));
        })
        .await;
    let (app, _pool) = test_app(&server.base_url()).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/recognition/recognize",
            json!({"image": "data:image/jpeg;base64,AAAA"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Error processing recognition request");
}

#[tokio::test]
async fn test_large_frame_within_body_limit() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/recognize");
            then.status(200).json_body(json!([]));
        })
        .await;
    let (app, _pool) = test_app(&server.base_url()).await;

    // Larger than axum's default 2 MB limit
    let image = format!("data:image/jpeg;base64,{}", "A".repeat(3 * 1024 * 1024));
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/recognition/recognize",
            json!({ "image": image }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Health and CORS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _pool) = test_app("http://127.0.0.1:9").await;

    let response = app.oneshot(get_request("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "facereg-api");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["chat_connected"], false);
}

#[tokio::test]
async fn test_cors_allows_frontend_origin() {
    let (app, _pool) = test_app("http://127.0.0.1:9").await;
    let app = app.layer(cors_layer("http://localhost:3000"));

    let request = Request::builder()
        .uri("/api/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _pool) = test_app("http://127.0.0.1:9").await;

    let response = app.oneshot(get_request("/api/face/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
