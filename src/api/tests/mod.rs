use super::*;
use crate::orchestrator::test_helpers::{
    FakeMedia, FakeSwarm, TestRig, create_test_rig, default_rig,
};
use crate::orchestrator::{JobRequest, SourceSpec};
use crate::types::{ChatRef, MessageRef};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;

/// Router over a fresh rig whose output directory already exists
fn test_app() -> (Router, TestRig) {
    let rig = default_rig();
    let config = rig.orchestrator.get_config();
    std::fs::create_dir_all(config.output_dir()).unwrap();
    let app = create_router(Arc::new(rig.orchestrator.clone()), config);
    (app, rig)
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn root_answers_bot_started() {
    let (app, _rig) = test_app();
    let response = get(app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"Bot started");
}

#[tokio::test]
async fn health_reports_ok_until_shutdown() {
    let (app, rig) = test_app();

    let response = get(app.clone(), "/api/v1/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));

    rig.orchestrator.shutdown().await;
    let response = get(app, "/api/v1/health").await;
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "shutting_down");
}

#[tokio::test]
async fn jobs_lists_nothing_when_idle() {
    let (app, _rig) = test_app();
    let response = get(app, "/api/v1/jobs").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn single_job_lookup_by_trigger() {
    let rig = create_test_rig(
        FakeMedia {
            payload: Vec::new(),
            fail: false,
        },
        FakeSwarm::stalling(),
    );
    let config = rig.orchestrator.get_config();
    let app = create_router(Arc::new(rig.orchestrator.clone()), config);

    let response = get(app.clone(), "/api/v1/jobs/10/20").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["error"]["code"], "not_found");

    rig.orchestrator
        .start_job(JobRequest {
            chat: ChatRef(10),
            message: MessageRef(20),
            source: SourceSpec::Torrent {
                magnet: Some("magnet:?xt=urn:btih:stuck".into()),
                torrent_file: None,
            },
        })
        .await
        .unwrap();

    let response = get(app, "/api/v1/jobs/10/20").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["id"], "10:20");

    rig.orchestrator.shutdown().await;
}

#[tokio::test]
async fn output_files_are_served_at_their_link_path() {
    let (app, rig) = test_app();
    let dir = rig.orchestrator.get_config().output_dir().clone();
    std::fs::write(dir.join("9f3ac21b.mp4"), b"flat").unwrap();
    std::fs::create_dir_all(dir.join("Movie [2024]")).unwrap();
    std::fs::write(dir.join("Movie [2024]").join("a b.mp4"), b"nested").unwrap();

    let response = get(app.clone(), "/9f3ac21b.mp4").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"flat");

    // Same encoding the link publisher produces
    let link = crate::link::build_link("", &["Movie [2024]", "a b.mp4"]);
    assert_eq!(link, "/Movie%20%5B2024%5D/a%20b.mp4");
    let response = get(app.clone(), &link).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"nested");

    let response = get(app, "/missing.mp4").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn events_endpoint_streams_sse() {
    let (app, _rig) = test_app();
    let response = get(app, "/api/v1/events").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
}

#[tokio::test]
async fn cors_headers_present_by_default() {
    let (app, _rig) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("Origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn server_stops_on_cancellation() {
    let rig = default_rig();
    let mut config = (*rig.orchestrator.get_config()).clone();
    config.server.bind_address = "127.0.0.1:0".parse().unwrap();

    let shutdown = CancellationToken::new();
    let server = tokio::spawn(start_api_server(
        Arc::new(rig.orchestrator.clone()),
        Arc::new(config),
        shutdown.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}
