//! Integration tests for the HTTP backend client.
//!
//! Each test binds an in-process axum server on an ephemeral port that
//! mimics the session backend, including its legacy field names.

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    routing::{get, post},
};
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime, macros::datetime};
use tracker::prelude::*;
use tracker::session;

const T0: OffsetDateTime = datetime!(2024-05-01 07:00:00 UTC);

/// Requests seen by the mock backend: (path, body, authorization header).
#[derive(Debug, Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(String, Value, Option<String>)>>>,
}

impl Captured {
    fn push(&self, path: String, body: Value, headers: &HeaderMap) {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        self.requests.lock().unwrap().push((path, body, auth));
    }

    fn find(&self, suffix: &str) -> Vec<(String, Value, Option<String>)> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(path, _, _)| path.ends_with(suffix))
            .cloned()
            .collect()
    }
}

async fn start_session(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    captured.push("/sessions/start".into(), body, &headers);
    Json(json!({ "sessionId": "sess-42" }))
}

async fn upload_location(
    State(captured): State<Captured>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    captured.push(format!("/sessions/{id}/locations"), body, &headers);
    StatusCode::NO_CONTENT
}

async fn finish_session(
    State(captured): State<Captured>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    captured.push(format!("/sessions/{id}/finish"), body, &headers);
    // Older backend layout: legacy distance key, numeric duration.
    Json(json!({
        "distance_km": 4.2,
        "durationSec": 1500,
        "pace": "5'57\"",
        "avg_heart_rate": "148",
    }))
}

async fn acquire_badges(
    State(captured): State<Captured>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    captured.push(format!("/sessions/{id}/badges"), body, &headers);
    Json(json!({ "success": false, "message": "no new badges" }))
}

async fn upload_course(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    captured.push("/courses".into(), body, &headers);
    Json(json!({ "data": { "courseId": 7 } }))
}

fn mock_backend(captured: Captured) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/sessions/start", post(start_session))
        .route("/sessions/{id}/locations", post(upload_location))
        .route("/sessions/{id}/finish", post(finish_session))
        .route("/sessions/{id}/badges", post(acquire_badges))
        .route("/courses", post(upload_course))
        .with_state(captured)
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_full_run_against_http_backend() {
    let captured = Captured::default();
    let url = serve(mock_backend(captured.clone())).await;
    let backend = HttpBackend::new(url).with_token("token-1");
    let mut run_session = RunningSession::new(&TrackerConfig::default());

    let id = run_session.start(&backend).await.unwrap();
    assert_eq!(id.as_str(), "sess-42");
    assert!(run_session.begin_tracking(T0));
    run_session.on_new_fix(Fix::new(37.5665, 126.978).at(T0));
    run_session.on_new_fix(Fix::new(37.5675, 126.979).at(T0 + Duration::seconds(40)));

    let run = run_session
        .finish(&backend, T0 + Duration::seconds(40))
        .await
        .unwrap()
        .unwrap();

    assert!(run.submitted);
    assert_eq!(run.stats.distance_km, 4.2);
    assert_eq!(run.stats.duration_sec, 1500);
    assert_eq!(run.stats.pace_sec_per_km, 357);
    assert_eq!(run.stats.avg_heart_rate, 148);

    let finishes = captured.find("/sessions/sess-42/finish");
    assert_eq!(finishes.len(), 1);
    let (_, body, auth) = &finishes[0];
    assert_eq!(auth.as_deref(), Some("Bearer token-1"));
    assert_eq!(body["durationSec"], json!(40));
    assert_eq!(body["duration"], json!("00:40"));
    assert!(body["distanceKm"].as_f64().unwrap() > 0.1);
}

#[tokio::test]
async fn test_location_upload_and_badges() {
    let captured = Captured::default();
    let url = serve(mock_backend(captured.clone())).await;
    let backend = HttpBackend::new(url);
    let id = SessionId::new("sess-42");
    let point = LocationPoint::new(37.5665, 126.978, 12.0, T0);

    backend.upload_location(&id, &point).await.unwrap();
    let uploads = captured.find("/locations");
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1["latitude"], json!(37.5665));
    assert_eq!(uploads[0].1["timestamp"], json!("2024-05-01T07:00:00Z"));
    assert!(uploads[0].2.is_none());

    let badges = backend.acquire_badges(&id).await;
    assert!(matches!(badges, Err(ApiError::Rejected(ref m)) if m == "no new badges"));

    // The call-site helper swallows the same failure.
    session::acquire_badges(&backend, &id).await;
    assert_eq!(captured.find("/badges").len(), 2);
}

#[tokio::test]
async fn test_share_course_over_http() {
    let captured = Captured::default();
    let url = serve(mock_backend(captured.clone())).await;
    let backend = HttpBackend::new(url);
    let points = vec![
        LocationPoint::new(37.5665, 126.978, 0.0, T0),
        LocationPoint::new(37.5675, 126.979, 0.0, T0 + Duration::seconds(30)),
    ];

    let course_id = share_course(&backend, "City Hall loop", &points).await.unwrap();
    assert_eq!(course_id, "7");

    let courses = captured.find("/courses");
    let body = &courses[0].1;
    assert_eq!(body["name"], json!("City Hall loop"));
    assert!(body["gpxBase64"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(body["distanceKm"].as_f64().unwrap() > 0.1);
}

#[tokio::test]
async fn test_error_status_keeps_session_idle() {
    let router = Router::new().route(
        "/sessions/start",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let backend = HttpBackend::new(serve(router).await);
    let mut run_session = RunningSession::new(&TrackerConfig::default());

    let err = run_session.start(&backend).await.unwrap_err();
    match err {
        TrackerError::Api(ApiError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(run_session.phase(), &SessionPhase::Idle);
}

#[tokio::test]
async fn test_missing_session_id() {
    let router = Router::new().route(
        "/sessions/start",
        post(|| async { Json(json!({ "status": "created" })) }),
    );
    let backend = HttpBackend::new(serve(router).await);

    assert!(matches!(
        backend.start_session().await,
        Err(ApiError::MissingField("sessionId"))
    ));
}

#[tokio::test]
async fn test_truncated_success_body_is_an_error() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Announces more body than it sends, then hangs up.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let _ = socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"sessionId\"",
            )
            .await;
        let _ = socket.shutdown().await;
    });

    assert!(matches!(
        HttpBackend::new(url).start_session().await,
        Err(ApiError::Request(_))
    ));
}

#[tokio::test]
async fn test_health_check() {
    let url = serve(mock_backend(Captured::default())).await;
    assert!(HttpBackend::new(url).check_health().await.is_ok());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    assert!(matches!(
        HttpBackend::new(closed).check_health().await,
        Err(ApiError::BackendNotReachable(_))
    ));
}
