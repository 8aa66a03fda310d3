//! Registration tests against an in-process fake Kafka Connect worker.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use connect_client::{ConnectClient, ConnectorSettings, Error, Registration};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// What the fake worker has seen, and how it answers `POST /connectors`.
#[derive(Default)]
struct FakeConnect {
    registered: Vec<String>,
    posted: Vec<serde_json::Value>,
    post_status: Option<StatusCode>,
}

type Shared = Arc<Mutex<FakeConnect>>;

async fn list_connectors(State(state): State<Shared>) -> Response {
    let names = state.lock().unwrap().registered.clone();
    (StatusCode::OK, Json(names)).into_response()
}

async fn get_connector(State(state): State<Shared>, Path(name): Path<String>) -> Response {
    if state.lock().unwrap().registered.contains(&name) {
        (StatusCode::OK, Json(serde_json::json!({ "name": name }))).into_response()
    } else {
        (StatusCode::NOT_FOUND, "connector not found").into_response()
    }
}

async fn post_connector(
    State(state): State<Shared>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.posted.push(body.clone());
    let status = state.post_status.unwrap_or(StatusCode::CREATED);
    if status == StatusCode::CREATED {
        if let Some(name) = body.get("name").and_then(|n| n.as_str()) {
            state.registered.push(name.to_string());
        }
    }
    (status, "{}").into_response()
}

async fn start_fake_connect(state: Shared) -> anyhow::Result<(String, tokio::task::JoinHandle<()>)> {
    let app = Router::new()
        .route("/connectors", get(list_connectors).post(post_connector))
        .route("/connectors/:name", get(get_connector))
        .with_state(state);

    // Bind to any available port
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let base_url = format!("http://{addr}");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Ok((base_url, server_handle))
}

#[tokio::test]
async fn test_check_ready_against_live_worker() {
    let state = Shared::default();
    let (base_url, server) = start_fake_connect(Arc::clone(&state)).await.unwrap();

    let client = ConnectClient::new(&base_url).unwrap();
    client.check_ready().await.unwrap();

    server.abort();
}

#[tokio::test]
async fn test_check_ready_fails_when_nothing_listens() {
    // Bind then drop to get a port nobody is listening on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ConnectClient::new(&format!("http://{addr}")).unwrap();
    assert!(matches!(client.check_ready().await, Err(Error::Http(_))));
}

#[tokio::test]
async fn test_register_creates_then_skips() {
    let state = Shared::default();
    let (base_url, server) = start_fake_connect(Arc::clone(&state)).await.unwrap();
    let client = ConnectClient::new(&base_url).unwrap();
    let request = ConnectorSettings::default().to_request();

    assert_eq!(client.register(&request).await.unwrap(), Registration::Created);
    assert_eq!(
        client.register(&request).await.unwrap(),
        Registration::AlreadyExists
    );

    let state = state.lock().unwrap();
    assert_eq!(state.posted.len(), 1);
    assert_eq!(state.posted[0]["name"], "postgres-connector");
    assert_eq!(
        state.posted[0]["config"]["transforms.route.replacement"],
        "cdc.$3"
    );
    assert_eq!(state.registered, vec!["postgres-connector".to_string()]);

    server.abort();
}

#[tokio::test]
async fn test_register_conflict_is_success() {
    let state = Shared::default();
    state.lock().unwrap().post_status = Some(StatusCode::CONFLICT);
    let (base_url, server) = start_fake_connect(Arc::clone(&state)).await.unwrap();
    let client = ConnectClient::new(&base_url).unwrap();

    let outcome = client
        .register(&ConnectorSettings::default().to_request())
        .await
        .unwrap();
    assert_eq!(outcome, Registration::Conflict);

    server.abort();
}

#[tokio::test]
async fn test_register_unexpected_status_is_error() {
    let state = Shared::default();
    state.lock().unwrap().post_status = Some(StatusCode::BAD_REQUEST);
    let (base_url, server) = start_fake_connect(Arc::clone(&state)).await.unwrap();
    let client = ConnectClient::new(&base_url).unwrap();

    match client
        .register(&ConnectorSettings::default().to_request())
        .await
    {
        Err(Error::UnexpectedStatus { status, .. }) => assert_eq!(status, 400),
        other => panic!("expected unexpected-status error, got {other:?}"),
    }

    server.abort();
}
