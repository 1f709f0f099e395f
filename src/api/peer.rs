//! Peer-facing invocation endpoint: another node forwarding a job to us.
//!
//! Unlike the client-facing handler, a scheduling failure here is not an
//! error reply: the chain must still carry a full peer descriptor back to
//! whoever forwarded to us, so the response is always `200` with a
//! `PeerJobResponse` whose embedded `status_code` reflects the outcome.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::state::NodeState;
use crate::types::{PeerJobRequest, PeerJobResponse, ServiceRequest, Timings, TimingsStart};

pub async fn execute(
    State(state): State<Arc<NodeState>>,
    Path(function_name): Path<String>,
    Json(peer_request): Json<PeerJobRequest>,
) -> (StatusCode, Json<PeerJobResponse>) {
    let timings_start = TimingsStart::arrived_now();
    let id = state.next_request_id();

    tracing::debug!(request_id = id, function = %function_name, hops = peer_request.hops, "received peer job");

    let request = ServiceRequest {
        id,
        service_name: function_name,
        // Kept as the raw base64 string bytes; decoding is deferred to
        // whichever executor finally needs the bytes.
        payload: peer_request.payload.clone().into_bytes(),
        content_type: peer_request.content_type.clone(),
        external: true,
        peer_request: Some(peer_request),
    };

    let (status_code, body, mut peers_list, timings) = match state.schedule(request).await {
        Ok(result) => {
            let status_code = result.response.as_ref().map(|r| r.status_code).unwrap_or(200);
            let body = result.response.map(|r| r.body).unwrap_or_default();
            (status_code, body, result.external_execution_info.peers_list, result.timings)
        }
        Err(err) => {
            tracing::warn!(error = %err, "peer job could not be scheduled");
            let mut timings = Timings::default();
            timings_start.compute(&mut timings);
            (500, Vec::new(), Vec::new(), timings)
        }
    };

    peers_list.push(state.peer_descriptor(timings));

    let response = PeerJobResponse {
        body: BASE64.encode(body),
        status_code,
        peers_list,
    };

    let http_status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (http_status, Json(response))
}
