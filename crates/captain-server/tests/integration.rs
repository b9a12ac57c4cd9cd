use axum::http::StatusCode;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use captain_core::db::CardDb;
use captain_server::{build_router, AppState};
use http_body_util::BodyExt;
use mockito::Matcher;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn app_with_secret(dir: &TempDir, secret: Option<&str>) -> axum::Router {
    let db = CardDb::open(&dir.path().join("cards.redb")).unwrap();
    let state = AppState::new(db, Duration::from_secs(2), secret.map(str::to_string)).unwrap();
    build_router(state)
}

fn app(dir: &TempDir) -> axum::Router {
    app_with_secret(dir, None)
}

/// Send a request via `oneshot` and return (status, headers, raw body).
async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let mut builder = axum::http::Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            axum::body::Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => axum::body::Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, bytes.to_vec())
}

/// Like `send`, parsing the body as JSON.
async fn call(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let (status, _, bytes) = send(app, method, uri, body).await;
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn program_field(json: &str) -> String {
    STANDARD.encode(json)
}

async fn seed_card_with_robot(app: &axum::Router, card: &str, robot_url: &str) {
    let (s, _) = call(
        app.clone(),
        "PUT",
        &format!("/v1/card/{card}"),
        Some(serde_json::json!({"notes": "", "program": "W10="})),
    )
    .await;
    assert_eq!(s, StatusCode::OK);
    let (s, _) = call(
        app.clone(),
        "PUT",
        "/v1/robot/r1",
        Some(serde_json::json!({"url": robot_url})),
    )
    .await;
    assert_eq!(s, StatusCode::OK);
    let (s, _) = call(app.clone(), "PUT", &format!("/v1/robot/r1/card/{card}"), None).await;
    assert_eq!(s, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_card_is_served_empty() {
    let dir = TempDir::new().unwrap();
    let (status, body) = call(app(&dir), "GET", "/v1/card/A1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"cardId": "A1", "notes": ""}));
}

#[tokio::test]
async fn saved_card_is_returned() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let program = program_field(r#"[{"Action":"Turn","Param":"Right90"}]"#);

    let (status, body) = call(
        app.clone(),
        "PUT",
        "/v1/card/A1",
        Some(serde_json::json!({"notes": "hi", "program": program})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"result": "done"}));

    let (status, body) = call(app, "GET", "/v1/card/A1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"], "hi");
    assert_eq!(body["program"], program);
}

#[tokio::test]
async fn post_also_saves() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let (status, _) = call(
        app.clone(),
        "POST",
        "/v1/card/A1",
        Some(serde_json::json!({"notes": "via post"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(app, "GET", "/v1/card/A1", None).await;
    assert_eq!(body["notes"], "via post");
}

#[tokio::test]
async fn invalid_program_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = call(
        app.clone(),
        "PUT",
        "/v1/card/A1",
        Some(serde_json::json!({"notes": "", "program": "%%%"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("decode"));

    let unknown = program_field(r#"[{"Action":"Teleport"}]"#);
    let (status, _) = call(
        app.clone(),
        "PUT",
        "/v1/card/A1",
        Some(serde_json::json!({"notes": "", "program": unknown})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(app, "GET", "/v1/card/A1", None).await;
    assert!(body.get("program").is_none());
}

#[tokio::test]
async fn responses_are_not_cached() {
    let dir = TempDir::new().unwrap();
    let (_, headers, _) = send(app(&dir), "GET", "/v1/card/A1", None).await;
    assert_eq!(headers.get("cache-control").unwrap(), "no-store");
}

#[tokio::test]
async fn signed_ids_are_required_when_secret_is_set() {
    let dir = TempDir::new().unwrap();
    let app = app_with_secret(&dir, Some("s3cret"));

    let (status, body) = call(app.clone(), "GET", "/v1/card/A1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid card id"));

    let id = captain_core::card_id::generate(b"s3cret").unwrap();
    let (status, body) = call(app, "GET", &format!("/v1/card/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cardId"], id.as_str());
}

// ---------------------------------------------------------------------------
// Robots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn robot_lifecycle() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, _) = call(
        app.clone(),
        "PUT",
        "/v1/robot/r1",
        Some(serde_json::json!({"url": "http://r1.local"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(app.clone(), "GET", "/v1/robot/r1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"name": "r1", "url": "http://r1.local", "cardId": ""}));

    let (status, _) = call(app.clone(), "DELETE", "/v1/robot/r1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(app, "GET", "/v1/robot/r1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn robot_requires_url_and_valid_name() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let (status, _) = call(
        app.clone(),
        "PUT",
        "/v1/robot/r1",
        Some(serde_json::json!({"url": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        app,
        "PUT",
        "/v1/robot/bad.name",
        Some(serde_json::json!({"url": "http://x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn robots_filter_by_association() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    seed_card_with_robot(&app, "A1", "http://r1.local").await;
    call(
        app.clone(),
        "PUT",
        "/v1/robot/r2",
        Some(serde_json::json!({"url": "http://r2.local"})),
    )
    .await;

    let (_, all) = call(app.clone(), "GET", "/v1/robots", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
    let (_, used) = call(app.clone(), "GET", "/v1/robots?filter=used", None).await;
    assert_eq!(used[0]["name"], "r1");
    let (_, free) = call(app.clone(), "GET", "/v1/robots?filter=free", None).await;
    assert_eq!(free[0]["name"], "r2");
    let (status, _) = call(app, "GET", "/v1/robots?filter=busy", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn association_rules() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    call(
        app.clone(),
        "PUT",
        "/v1/robot/r2",
        Some(serde_json::json!({"url": "http://r2.local"})),
    )
    .await;

    let (status, _) = call(app.clone(), "PUT", "/v1/robot/r2/card/A1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "card must exist");

    seed_card_with_robot(&app, "A1", "http://r1.local").await;
    let (status, body) = call(app.clone(), "POST", "/v1/robot/r2/card/A1", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already associated"));

    let (status, _) = call(app.clone(), "DELETE", "/v1/robot/r1/card", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(app.clone(), "PUT", "/v1/robot/r2/card/A1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(app, "DELETE", "/v1/robot/ghost/card", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Robot control
// ---------------------------------------------------------------------------

#[tokio::test]
async fn command_without_robot_is_404() {
    let dir = TempDir::new().unwrap();
    let (status, body) = call(app(&dir), "GET", "/v1/card/A1/run", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("no robot associated"));
}

#[tokio::test]
async fn run_is_forwarded_and_relayed() {
    let mut robot = mockito::Server::new_async().await;
    let mock = robot
        .mock("GET", "/run")
        .with_status(202)
        .with_header("content-type", "text/plain")
        .with_body("running")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    seed_card_with_robot(&app, "A1", &robot.url()).await;

    let (status, headers, body) = send(app, "GET", "/v1/card/A1/run", None).await;
    mock.assert_async().await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(headers.get("content-type").unwrap(), "text/plain");
    assert_eq!(body, b"running");
}

#[tokio::test]
async fn robot_error_status_is_relayed() {
    let mut robot = mockito::Server::new_async().await;
    robot
        .mock("GET", "/stop")
        .with_status(500)
        .with_body("motor fault")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    seed_card_with_robot(&app, "A1", &robot.url()).await;

    let (status, _, body) = send(app, "GET", "/v1/card/A1/stop", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"motor fault");
}

#[tokio::test]
async fn upload_puts_card_json() {
    let mut robot = mockito::Server::new_async().await;
    let mock = robot
        .mock("PUT", "/upload")
        .match_body(Matcher::PartialJson(serde_json::json!({"cardId": "A1", "program": "W10="})))
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    seed_card_with_robot(&app, "A1", &robot.url()).await;

    let (status, _, _) = send(app, "POST", "/v1/card/A1/upload", None).await;
    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ping_by_robot_name() {
    let mut robot = mockito::Server::new_async().await;
    let mock = robot
        .mock("GET", "/ping")
        .with_status(200)
        .with_body("pong")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    call(
        app.clone(),
        "PUT",
        "/v1/robot/r9",
        Some(serde_json::json!({"url": robot.url()})),
    )
    .await;

    let (status, _, body) = send(app, "GET", "/v1/robot/r9/ping", None).await;
    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"pong");
}

#[tokio::test]
async fn unreachable_robot_is_bad_gateway() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    // Port 9 (discard) is closed on test machines.
    seed_card_with_robot(&app, "A1", "http://127.0.0.1:9").await;
    let (status, body) = call(app, "GET", "/v1/card/A1/ping", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("unreachable"));
}
