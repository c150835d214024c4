//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    routing::any,
    Router,
};
use tokio::net::TcpListener;

use gateway::admin::{admin_router, AdminState};
use gateway::handler::Registry;
use gateway::{Gateway, GatewayConfig, GatewayState};

/// One request as the mock upstream saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

pub type Recordings = Arc<Mutex<Vec<Recorded>>>;

/// Start a mock upstream that records every request and answers
/// `201 Created` with body "ok".
pub async fn start_upstream() -> (SocketAddr, Recordings) {
    let recordings: Recordings = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/", any(record))
        .route("/{*path}", any(record))
        .with_state(recordings.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, recordings)
}

async fn record(State(recordings): State<Recordings>, request: Request) -> (StatusCode, &'static str) {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    recordings.lock().unwrap().push(Recorded {
        method: parts.method.to_string(),
        path_and_query: parts
            .uri
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_else(|| parts.uri.path().to_string()),
        headers: parts.headers,
        body: body.to_vec(),
    });
    (StatusCode::CREATED, "ok")
}

/// Start a gateway on an ephemeral port and return its address plus the
/// shared pipeline state for runtime changes.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Arc<GatewayState>) {
    let gateway = Gateway::new(config, Registry::with_builtins()).unwrap();
    let state = gateway.state();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        gateway.run(listener).await.unwrap();
    });
    (addr, state)
}

/// Start a management listener on an ephemeral port.
#[allow(dead_code)]
pub async fn start_admin(state: Arc<GatewayState>, token: &str) -> SocketAddr {
    let app = admin_router(AdminState::new(state, token));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
