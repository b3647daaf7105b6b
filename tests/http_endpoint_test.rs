//! HttpFaviconEndpoint against a local axum server

mod common;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use common::{composite_png, domains, test_config};
use favicon_recon::errors::FetchError;
use favicon_recon::models::Fingerprint;
use favicon_recon::pipeline::FaviconAnalyzer;
use favicon_recon::services::{FaviconEndpoint, HttpFaviconEndpoint};

#[derive(Clone, Default)]
struct ServerState {
    paths: Arc<Mutex<Vec<String>>>,
}

async fn favicon(State(state): State<ServerState>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    state.paths.lock().unwrap().push(path.clone());

    let list = path.trim_start_matches("/favicon/");
    if list.contains("broken") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    if list.contains("text") {
        return (StatusCode::OK, "<html>not an icon</html>").into_response();
    }
    if list.contains("missing") {
        return StatusCode::NOT_FOUND.into_response();
    }

    let names: Vec<&str> = list.split('/').collect();
    ([(header::CONTENT_TYPE, "image/png")], composite_png(&names)).into_response()
}

/// Start a server and return its favicon prefix URL
async fn spawn_server() -> (String, ServerState) {
    let state = ServerState::default();
    let app = Router::new()
        .route("/favicon/{*domains}", get(favicon))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/favicon/"), state)
}

#[tokio::test]
async fn test_batch_url_and_grouping_over_http() {
    let (prefix, state) = spawn_server().await;
    let config = test_config(&prefix, 20);
    let analyzer = FaviconAnalyzer::from_config(&config).unwrap();

    let report = analyzer
        .analyze(domains(&["a.com", "red.com", "c.com"]), CancellationToken::new())
        .await;

    assert_eq!(
        *state.paths.lock().unwrap(),
        vec!["/favicon/a.com/red.com/c.com".to_string()]
    );
    assert_eq!(
        report.group(&Fingerprint::Blank).unwrap(),
        &domains(&["a.com", "c.com"]).into_iter().collect::<BTreeSet<_>>()
    );
    assert_eq!(report.groups.len(), 2);
}

#[tokio::test]
async fn test_server_error_retried_then_failed() {
    let (prefix, state) = spawn_server().await;
    let config = test_config(&prefix, 1);
    let analyzer = FaviconAnalyzer::from_config(&config).unwrap();

    let report = analyzer
        .analyze(domains(&["broken.com", "red.com"]), CancellationToken::new())
        .await;

    assert_eq!(report.failed, domains(&["broken.com"]).into_iter().collect::<BTreeSet<_>>());
    assert_eq!(report.resolved_count(), 2);
    let broken_calls = state
        .paths
        .lock()
        .unwrap()
        .iter()
        .filter(|p| p.contains("broken"))
        .count();
    assert_eq!(broken_calls, config.fetch.max_attempts as usize);
}

#[tokio::test]
async fn test_endpoint_error_kinds() {
    let (prefix, _state) = spawn_server().await;
    let config = test_config(&prefix, 20);
    let endpoint = HttpFaviconEndpoint::new(&config.endpoint).unwrap();

    let status = endpoint
        .fetch_composite(&format!("{prefix}missing.com"))
        .await
        .unwrap_err();
    assert!(matches!(status, FetchError::Status { status: 404, .. }));

    let text = endpoint
        .fetch_composite(&format!("{prefix}text.com"))
        .await
        .unwrap_err();
    assert!(matches!(text, FetchError::MalformedBody { .. }));

    let ok = endpoint
        .fetch_composite(&format!("{prefix}a.com/b.com"))
        .await
        .unwrap();
    assert_eq!(image::load_from_memory(&ok).unwrap().width(), 32);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let (prefix, _state) = spawn_server().await;
    let mut config = test_config(&prefix, 20);
    config.endpoint.max_response_bytes = 16;
    let endpoint = HttpFaviconEndpoint::new(&config.endpoint).unwrap();

    let err = endpoint
        .fetch_composite(&format!("{prefix}a.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::BodyTooLarge { max_size: 16, .. }));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = test_config(&format!("http://{addr}/favicon/"), 20);
    let endpoint = HttpFaviconEndpoint::new(&config.endpoint).unwrap();
    let err = endpoint
        .fetch_composite(&format!("http://{addr}/favicon/a.com"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}
