//! Shared test doubles: minimal HTTP servers standing in for the FaaS
//! backend, the discovery service, and peer nodes, bound to an
//! OS-assigned local port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A backend double that echoes the request body back, reporting
/// `duration_seconds` via `X-Duration-Seconds`, optionally after
/// sleeping `delay` first.
pub async fn spawn_backend(duration_seconds: &str, delay: Duration) -> String {
    #[derive(Clone)]
    struct BackendState {
        duration: String,
        delay: Duration,
    }

    async fn handle(State(state): State<Arc<BackendState>>, body: axum::body::Bytes) -> impl axum::response::IntoResponse {
        if !state.delay.is_zero() {
            tokio::time::sleep(state.delay).await;
        }
        let mut headers = HeaderMap::new();
        headers.insert("X-Duration-Seconds", state.duration.parse().unwrap());
        (StatusCode::OK, headers, body)
    }

    let state = Arc::new(BackendState {
        duration: duration_seconds.to_string(),
        delay,
    });
    let app = Router::new()
        .route("/function/:name", get(handle).post(handle))
        .with_state(state);
    spawn(app).await
}

/// A discovery double that reports a fixed identity and a fixed list of
/// peer machine IPs.
pub async fn spawn_discovery(machine_id: &str, machine_ip: &str, machines: Vec<String>) -> String {
    #[derive(Clone)]
    struct DiscoveryState {
        machine_id: String,
        machine_ip: String,
        machines: Vec<String>,
    }

    async fn identity(State(state): State<Arc<DiscoveryState>>) -> Json<serde_json::Value> {
        Json(json!({ "machine_id": state.machine_id, "machine_ip": state.machine_ip }))
    }

    async fn machines(State(state): State<Arc<DiscoveryState>>) -> Json<serde_json::Value> {
        let list: Vec<_> = state.machines.iter().map(|ip| json!({ "ip": ip })).collect();
        Json(json!(list))
    }

    let state = Arc::new(DiscoveryState {
        machine_id: machine_id.to_string(),
        machine_ip: machine_ip.to_string(),
        machines,
    });
    let app = Router::new()
        .route("/configuration", get(identity))
        .route("/machines", get(machines))
        .with_state(state);
    spawn(app).await
}

/// A peer double reporting a fixed load and, when forwarded a job,
/// replying with a fixed base64 body and a one-element peers list
/// naming itself.
pub async fn spawn_peer(load: i64, machine_id: &str, machine_ip: &str, reply_body_base64: &str) -> String {
    #[derive(Clone)]
    struct PeerState {
        load: i64,
        machine_id: String,
        machine_ip: String,
        reply_body_base64: String,
    }

    async fn load_handler(State(state): State<Arc<PeerState>>) -> impl axum::response::IntoResponse {
        let mut headers = HeaderMap::new();
        headers.insert("X-P2PFaaS-Load", state.load.to_string().parse().unwrap());
        (headers, state.load.to_string())
    }

    async fn execute(
        State(state): State<Arc<PeerState>>,
        Path(_name): Path<String>,
        Json(_req): Json<p2pfaas_scheduler::types::PeerJobRequest>,
    ) -> Json<p2pfaas_scheduler::types::PeerJobResponse> {
        Json(p2pfaas_scheduler::types::PeerJobResponse {
            body: state.reply_body_base64.clone(),
            status_code: 200,
            peers_list: vec![p2pfaas_scheduler::types::PeerDescriptor {
                machine_id: state.machine_id.clone(),
                machine_ip: state.machine_ip.clone(),
                timings: Default::default(),
            }],
        })
    }

    let state = Arc::new(PeerState {
        load,
        machine_id: machine_id.to_string(),
        machine_ip: machine_ip.to_string(),
        reply_body_base64: reply_body_base64.to_string(),
    });
    let app = Router::new()
        .route("/monitoring/load", get(load_handler))
        .route("/peer/function/:name", post(execute))
        .with_state(state);
    spawn(app).await
}
