//! `X-P2PFaaS-*` response header names and the custom-header builder that
//! surfaces scheduling metadata to the client alongside the function's
//! own response body.

use axum::http::HeaderMap;

use crate::scheduler::PowerOfNScheduler;
use crate::types::{JobResult, ServiceRequest};

pub const VERSION: &str = "X-P2PFaaS-Version";
pub const SCHEDULER: &str = "X-P2PFaaS-Scheduler";
pub const TOTAL_TIME: &str = "X-P2PFaaS-Timing-Total-Time-Seconds";
pub const EXECUTION_TIME: &str = "X-P2PFaaS-Timing-Execution-Time-Seconds";
pub const PROBING_TIME: &str = "X-P2PFaaS-Timing-Probing-Time-Seconds";
pub const SCHEDULING_TIME: &str = "X-P2PFaaS-Timing-Scheduling-Time-Seconds";
pub const EXTERNALLY_EXECUTED: &str = "X-P2PFaaS-Externally-Executed";
pub const HOPS: &str = "X-P2PFaaS-Hops";
pub const PEERS_LIST_IP: &str = "X-P2PFaaS-Peers-List-Ip";
pub const PEERS_LIST_ID: &str = "X-P2PFaaS-Peers-List-Id";
pub const PROBE_MESSAGES: &str = "X-P2PFaaS-Timing-Probe-Messages";
pub const TOTAL_TIMINGS_LIST: &str = "X-P2PFaaS-Timing-Total-Seconds-List";
pub const PROBING_TIMINGS_LIST: &str = "X-P2PFaaS-Timing-Probing-Seconds-List";
pub const SCHEDULING_TIMINGS_LIST: &str = "X-P2PFaaS-Timing-Scheduling-Seconds-List";

/// Load reported by a node when probed by a peer scheduler.
pub const LOAD: &str = "X-P2PFaaS-Load";

/// Only copies response headers whose name starts with `X`, matching the
/// original's pass-through of the backend's own custom headers.
pub fn copy_x_headers(headers: &mut HeaderMap, backend_headers: &[(String, String)]) {
    for (name, value) in backend_headers {
        if name.starts_with('X') || name.starts_with('x') {
            if let (Ok(name), Ok(value)) = (
                axum::http::HeaderName::from_bytes(name.as_bytes()),
                axum::http::HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }
    }
}

/// Adds the scheduling metadata headers for a completed job, mirroring
/// the original's `addExecuteFunctionCustomHeaders`.
pub fn add_scheduling_headers(
    headers: &mut HeaderMap,
    _request: &ServiceRequest,
    scheduler_full_name: &str,
    result: &JobResult,
) {
    insert(headers, VERSION, env!("CARGO_PKG_VERSION"));
    insert(headers, SCHEDULER, scheduler_full_name);

    if scheduler_full_name.starts_with(PowerOfNScheduler::NAME) {
        insert(headers, PROBE_MESSAGES, &result.probing_messages.to_string());
    }

    if !result.external_execution {
        let t = &result.timings;
        maybe_insert(headers, TOTAL_TIME, t.total_time);
        maybe_insert(headers, SCHEDULING_TIME, t.scheduling_time);
        maybe_insert(headers, EXECUTION_TIME, t.execution_time);
        maybe_insert(headers, PROBING_TIME, t.probing_time);
        return;
    }

    let peers = &result.external_execution_info.peers_list;
    let hops = peers.len().saturating_sub(1);
    insert(headers, EXTERNALLY_EXECUTED, "True");
    insert(headers, HOPS, &hops.to_string());

    if let Some(first) = peers.first() {
        maybe_insert(headers, EXECUTION_TIME, first.timings.execution_time);
    }

    // Reversed so index 0 is the final executor.
    let ip_list: Vec<&str> = peers.iter().rev().map(|p| p.machine_ip.as_str()).collect();
    let id_list: Vec<&str> = peers.iter().rev().map(|p| p.machine_id.as_str()).collect();
    let total_times: Vec<f64> = peers.iter().rev().map(|p| p.timings.total_time.unwrap_or(0.0)).collect();
    let scheduling_times: Vec<f64> = peers
        .iter()
        .rev()
        .map(|p| p.timings.scheduling_time.unwrap_or(0.0))
        .collect();
    let probing_times: Vec<f64> = peers.iter().rev().map(|p| p.timings.probing_time.unwrap_or(0.0)).collect();

    insert(headers, PEERS_LIST_IP, &serde_json::to_string(&ip_list).unwrap_or_default());
    insert(headers, PEERS_LIST_ID, &serde_json::to_string(&id_list).unwrap_or_default());
    insert(
        headers,
        TOTAL_TIMINGS_LIST,
        &serde_json::to_string(&total_times).unwrap_or_default(),
    );
    insert(
        headers,
        SCHEDULING_TIMINGS_LIST,
        &serde_json::to_string(&scheduling_times).unwrap_or_default(),
    );
    insert(
        headers,
        PROBING_TIMINGS_LIST,
        &serde_json::to_string(&probing_times).unwrap_or_default(),
    );
}

fn maybe_insert(headers: &mut HeaderMap, name: &str, value: Option<f64>) {
    if let Some(value) = value {
        insert(headers, name, &value.to_string());
    }
}

fn insert(headers: &mut HeaderMap, name: &str, value: &str) {
    if let (Ok(name), Ok(value)) = (
        axum::http::HeaderName::from_bytes(name.as_bytes()),
        axum::http::HeaderValue::from_str(value),
    ) {
        headers.insert(name, value);
    }
}
