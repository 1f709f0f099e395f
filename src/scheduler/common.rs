//! Shared machinery every policy builds on: local execution via the
//! queue, forwarding to a peer, and the probe-and-pick helper used by
//! the power-of-N family.
//!
//! `least_loaded_of_n_random` has no counterpart in the retrieved
//! original source (the function was referenced but its body was not
//! part of the retrieval pack) and is designed fresh from the
//! specification's prose: probe `f` random peers for load, keep the
//! minimum, and only forward to it if its load is strictly less than the
//! local load — equality falls back to local, per the specification's
//! design notes, to avoid thrashing between two equally loaded nodes.

use std::sync::Arc;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::discovery::DiscoveryClient;
use crate::error::AppError;
use crate::memdb::LoadMemory;
use crate::peer::PeerClient;
use crate::queue::QueueHandle;
use crate::types::{ApiResponse, JobResult, NodeIdentity, PeerJobRequest, ServiceRequest, TimingsStart};

/// The collaborators every scheduling policy needs, bundled so policy
/// structs stay plain data plus parameters.
pub struct SchedulingContext {
    pub load_memory: Arc<LoadMemory>,
    pub queue: Arc<QueueHandle>,
    pub peer_client: Arc<PeerClient>,
    pub discovery: Arc<DiscoveryClient>,
    pub identity: NodeIdentity,
}

pub async fn execute_job_locally(
    ctx: &SchedulingContext,
    mut request: ServiceRequest,
    mut timings_start: TimingsStart,
) -> Result<JobResult, AppError> {
    timings_start.scheduled_at = Some(Instant::now());

    if ctx.load_memory.free_slots() <= 0 {
        tracing::debug!(
            request_id = request.id,
            function = %request.service_name,
            "cannot be scheduled locally: no free execution slots"
        );
        return Err(AppError::JobCannotBeScheduled("no free execution slots".to_string()));
    }

    // A job forwarded here from a peer still carries its payload as the
    // base64 string it arrived as; decode it before handing it to the
    // backend.
    if request.external {
        if let Ok(decoded) = BASE64.decode(&request.payload) {
            request.payload = decoded;
        }
    }

    let rx = ctx.queue.enqueue(request).await?;
    let mut result = rx.await.map_err(|_| AppError::Generic)?;
    timings_start.compute(&mut result.timings);
    result.timings_start = Some(timings_start);
    result.external_execution = false;
    Ok(result)
}

pub async fn execute_job_externally(
    ctx: &SchedulingContext,
    request: &ServiceRequest,
    remote_ip: &str,
    mut timings_start: TimingsStart,
) -> Result<JobResult, AppError> {
    tracing::debug!(
        request_id = request.id,
        function = %request.service_name,
        remote_ip,
        "scheduled to run externally"
    );
    timings_start.scheduled_at = Some(Instant::now());

    let peer_request = prepare_forward_request(request);
    let mut result = JobResult::default();

    match ctx.peer_client.execute_function(remote_ip, &request.service_name, &peer_request).await {
        Ok(peer_response) => {
            result.external_execution_info.peers_list = peer_response.peers_list;
            let body = BASE64
                .decode(&peer_response.body)
                .unwrap_or_else(|_| peer_response.body.clone().into_bytes());
            result.response = Some(ApiResponse {
                status_code: peer_response.status_code,
                headers: Vec::new(),
                body,
            });
        }
        Err(err) => {
            tracing::error!(remote_ip, error = %err, "cannot execute job externally");
            result.response = Some(ApiResponse {
                status_code: 500,
                headers: Vec::new(),
                body: Vec::new(),
            });
        }
    }

    timings_start.compute(&mut result.timings);
    result.timings_start = Some(timings_start);
    result.external_execution = true;
    Ok(result)
}

/// Resets the hop count to 1 when the incoming request was already
/// external (source-observed behavior), rather than preserving and
/// incrementing it. See DESIGN.md for the Open Question this resolves.
pub fn prepare_forward_request(request: &ServiceRequest) -> PeerJobRequest {
    if !request.external {
        PeerJobRequest {
            function_name: request.service_name.clone(),
            payload: BASE64.encode(&request.payload),
            content_type: request.content_type.clone(),
            hops: request.hops() + 1,
            peers_list: Vec::new(),
        }
    } else {
        PeerJobRequest {
            function_name: request.service_name.clone(),
            payload: String::from_utf8_lossy(&request.payload).to_string(),
            content_type: request.content_type.clone(),
            hops: 1,
            peers_list: Vec::new(),
        }
    }
}

/// Probes `f` random peers for their current load and returns the one
/// with the lowest load, provided it is strictly less than
/// `current_load` — equality is not an improvement and falls back to
/// local execution. Returns an error when no peer qualifies, leaving the
/// caller to fall back to local execution.
pub async fn least_loaded_of_n_random(
    ctx: &SchedulingContext,
    f: u32,
    current_load: u32,
) -> Result<String, AppError> {
    if f == 0 {
        return Err(AppError::JobCannotBeScheduled("fan-out is zero".to_string()));
    }

    let candidates = ctx
        .discovery
        .random_machines(f as usize)
        .await
        .map_err(|e| AppError::JobCannotBeScheduled(e.to_string()))?;

    let mut best: Option<(String, i64)> = None;
    for ip in candidates {
        let load = match ctx.peer_client.get_load(&ip).await {
            Ok(load) => load,
            Err(_) => continue,
        };

        if load >= current_load as i64 {
            continue;
        }
        if best.as_ref().map_or(true, |(_, best_load)| load < *best_load) {
            best = Some((ip, load));
        }
    }

    best.map(|(ip, _)| ip)
        .ok_or_else(|| AppError::JobCannotBeScheduled("no peer less loaded than this node".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(external: bool, hops: u32, payload: &[u8]) -> ServiceRequest {
        ServiceRequest {
            id: 1,
            service_name: "echo".to_string(),
            payload: payload.to_vec(),
            content_type: "application/json".to_string(),
            external,
            peer_request: external.then(|| PeerJobRequest {
                function_name: "echo".to_string(),
                payload: String::new(),
                content_type: "application/json".to_string(),
                hops,
                peers_list: Vec::new(),
            }),
        }
    }

    #[test]
    fn forwarding_an_internal_request_increments_hops_and_encodes_payload() {
        let forwarded = prepare_forward_request(&request(false, 0, b"hello"));
        assert_eq!(forwarded.hops, 1);
        assert_eq!(forwarded.payload, BASE64.encode("hello"));
    }

    /// Source-observed behavior: forwarding an already-external request
    /// resets the hop count to 1 rather than incrementing it further.
    /// See DESIGN.md for why this is kept as-is instead of the
    /// arguably-more-correct preserve-and-increment alternative.
    #[test]
    fn forwarding_an_already_external_request_resets_hops_to_one() {
        let forwarded = prepare_forward_request(&request(true, 3, b"hello"));
        assert_eq!(forwarded.hops, 1);
    }

    /// Characterizes the alternative behavior the specification flags as
    /// an open question: preserve-and-increment would instead produce 4
    /// here. This is `#[ignore]`d because it documents a rejected
    /// design, not the implemented one.
    #[test]
    #[ignore = "characterizes the rejected preserve-and-increment alternative"]
    fn forwarding_an_already_external_request_could_instead_preserve_and_increment() {
        let forwarded = prepare_forward_request(&request(true, 3, b"hello"));
        assert_eq!(forwarded.hops, 4);
    }

    #[test]
    fn forwarding_an_already_external_request_passes_payload_through_unchanged() {
        let encoded = BASE64.encode("hello");
        let forwarded = prepare_forward_request(&request(true, 1, encoded.as_bytes()));
        assert_eq!(forwarded.payload, encoded);
    }
}
