//! End-to-end scenarios over the real HTTP router, backed by local test
//! doubles standing in for the FaaS back-end, the discovery service, and
//! peer nodes.

mod common;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use p2pfaas_scheduler::backend::BackendClient;
use p2pfaas_scheduler::discovery::DiscoveryClient;
use p2pfaas_scheduler::memdb::LoadMemory;
use p2pfaas_scheduler::metrics::Metrics;
use p2pfaas_scheduler::peer::PeerClient;
use p2pfaas_scheduler::queue::{BackendExecutor, QueueHandle};
use p2pfaas_scheduler::scheduler::{self, SchedulerHandle};
use p2pfaas_scheduler::state::NodeState;
use p2pfaas_scheduler::types::{NodeIdentity, SchedulerDescriptor};
use p2pfaas_scheduler::{api, config};
use tokio::sync::RwLock;

async fn build_state(
    running_functions_max: u32,
    queue_length_max: u32,
    scheduler_handle: SchedulerHandle,
    faas_host: String,
    discovery_host: String,
) -> Arc<NodeState> {
    let metrics = Arc::new(Metrics::new());
    let load_memory = Arc::new(LoadMemory::new(running_functions_max));
    let queue = QueueHandle::new(running_functions_max as usize, queue_length_max as usize, metrics.clone());
    let backend = Arc::new(BackendClient::new(faas_host));
    let executor = Arc::new(BackendExecutor::new(load_memory.clone(), backend.clone()));
    tokio::spawn(queue.clone().run(executor));

    let mut app_config = config::AppConfig::default();
    app_config.running_functions_max = running_functions_max;
    app_config.queue_length_max = queue_length_max;

    Arc::new(NodeState {
        config: RwLock::new(app_config),
        scheduler: RwLock::new(scheduler_handle),
        load_memory,
        queue,
        backend,
        peer_client: Arc::new(PeerClient::new()),
        discovery: Arc::new(DiscoveryClient::new(discovery_host)),
        metrics,
        identity: NodeIdentity {
            machine_id: "node-a".to_string(),
            machine_ip: "10.0.0.1".to_string(),
        },
        data_dir: std::env::temp_dir(),
        config_read_from_file: AtomicBool::new(false),
    })
}

/// Scenario 1: local only, a free slot is available.
#[tokio::test]
async fn local_execution_reports_execution_time_header() {
    let backend_host = common::spawn_backend("0.010", Duration::ZERO).await;
    let state = build_state(
        2,
        10,
        scheduler::parse_descriptor(&SchedulerDescriptor {
            name: "NoSchedulingScheduler".to_string(),
            parameters: vec!["true".to_string()],
        })
        .unwrap(),
        backend_host,
        "http://127.0.0.1:1".to_string(),
    )
    .await;

    let app = api::router(state);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/function/echo")
                .body(Body::from("hi"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("X-P2PFaaS-Externally-Executed").is_none());
    let execution_time = response
        .headers()
        .get("X-P2PFaaS-Timing-Execution-Time-Seconds")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert_eq!(execution_time, "0.01");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"hi");
}

/// Scenario 3: PowerOfN forwards to a single, less-loaded peer.
#[tokio::test]
async fn power_of_n_forwards_to_the_less_loaded_peer() {
    let backend_host = common::spawn_backend("0.010", Duration::ZERO).await;
    let peer_host = common::spawn_peer(0, "peer-b", "10.0.0.2", &base64_encode("from-peer-b")).await;
    let discovery_host = common::spawn_discovery("node-a", "10.0.0.1", vec![peer_host.clone()]).await;

    let state = build_state(
        2,
        10,
        scheduler::parse_descriptor(&SchedulerDescriptor {
            name: "PowerOfNScheduler".to_string(),
            parameters: vec!["1".to_string(), "1".to_string(), "true".to_string(), "2".to_string()],
        })
        .unwrap(),
        backend_host,
        discovery_host,
    )
    .await;
    // One job already "running" so current_load (1) >= T (1), triggering a probe.
    state.load_memory.mark_running("echo");

    let app = api::router(state);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/function/echo")
                .body(Body::from("hi"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("X-P2PFaaS-Externally-Executed").unwrap(),
        "True"
    );
    assert_eq!(response.headers().get("X-P2PFaaS-Hops").unwrap(), "1");

    // The header list is reversed relative to internal build order, so
    // index 0 is this node (the one answering the client) and the last
    // entry is the peer that actually executed the job.
    let ids_header = response.headers().get("X-P2PFaaS-Peers-List-Id").unwrap().to_str().unwrap();
    let ids: Vec<String> = serde_json::from_str(ids_header).unwrap();
    assert_eq!(ids, vec!["node-a".to_string(), "peer-b".to_string()]);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"from-peer-b");
}

/// Scenario 4: an already-external request at the hop limit executes
/// locally regardless of load.
#[tokio::test]
async fn hop_limit_forces_local_execution() {
    let backend_host = common::spawn_backend("0.010", Duration::ZERO).await;
    let peer_host = common::spawn_peer(0, "peer-b", "10.0.0.2", &base64_encode("from-peer-b")).await;
    let discovery_host = common::spawn_discovery("node-a", "10.0.0.1", vec![peer_host]).await;

    let state = build_state(
        2,
        10,
        scheduler::parse_descriptor(&SchedulerDescriptor {
            name: "PowerOfNScheduler".to_string(),
            parameters: vec!["1".to_string(), "0".to_string(), "true".to_string(), "1".to_string()],
        })
        .unwrap(),
        backend_host,
        discovery_host,
    )
    .await;

    let app = api::router(state);
    let peer_request = p2pfaas_scheduler::types::PeerJobRequest {
        function_name: "echo".to_string(),
        payload: base64_encode("hi"),
        content_type: "application/json".to_string(),
        hops: 1,
        peers_list: Vec::new(),
    };
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/peer/function/echo")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&peer_request).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: p2pfaas_scheduler::types::PeerJobResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed.status_code, 200);
    let decoded = base64_decode(&parsed.body);
    assert_eq!(decoded, b"hi");
}

/// Scenario 6: a master-configured node rejects with JobCannotBeScheduled
/// when it knows no peers.
#[tokio::test]
async fn master_with_empty_peer_list_rejects() {
    let backend_host = common::spawn_backend("0.010", Duration::ZERO).await;
    let discovery_host = common::spawn_discovery("master", "10.0.0.1", vec![]).await;

    let state = build_state(
        2,
        10,
        scheduler::parse_descriptor(&SchedulerDescriptor {
            name: "RoundRobinWithMasterScheduler".to_string(),
            parameters: vec!["true".to_string(), "10.0.0.1".to_string(), "true".to_string()],
        })
        .unwrap(),
        backend_host,
        discovery_host,
    )
    .await;

    let app = api::router(state);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/function/echo")
                .body(Body::from("hi"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["code"], 400);
}

fn base64_encode(s: &str) -> String {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    BASE64.encode(s)
}

fn base64_decode(s: &str) -> Vec<u8> {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    BASE64.decode(s).unwrap()
}
