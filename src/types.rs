//! Core data model shared across the scheduler, queue and API layers.
//!
//! Payload encoding discipline: on the peer wire payload is always a
//! base64 string, in memory it is raw bytes. Every boundary crossing
//! transforms exactly once (see `scheduler::common`).

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// A request as it enters the decision loop, either from a client or from
/// a peer node.
#[derive(Debug, Clone)]
pub struct ServiceRequest {
    /// Monotone id, development-only; zero in production.
    pub id: u64,
    pub service_name: String,
    pub payload: Vec<u8>,
    pub content_type: String,
    /// True if this request arrived from a peer rather than a client.
    pub external: bool,
    /// Present iff `external`.
    pub peer_request: Option<PeerJobRequest>,
}

impl ServiceRequest {
    pub fn hops(&self) -> u32 {
        self.peer_request.as_ref().map(|p| p.hops).unwrap_or(0)
    }
}

/// Wire request sent to a peer's `/peer/function/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerJobRequest {
    pub function_name: String,
    /// Base64-encoded payload, because this is transported as JSON.
    pub payload: String,
    pub content_type: String,
    pub hops: u32,
    #[serde(default)]
    pub peers_list: Vec<PeerDescriptor>,
}

/// Wire response returned by a peer's `/peer/function/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerJobResponse {
    /// Base64-encoded body.
    pub body: String,
    pub status_code: u16,
    #[serde(default)]
    pub peers_list: Vec<PeerDescriptor>,
}

/// One hop of a forwarding chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeerDescriptor {
    pub machine_id: String,
    pub machine_ip: String,
    pub timings: Timings,
}

/// Best-effort per-hop timing information. Every field is nullable
/// because partial data (e.g. a failed probe) must still produce a
/// usable descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timings {
    pub total_time: Option<f64>,
    pub scheduling_time: Option<f64>,
    pub probing_time: Option<f64>,
    pub execution_time: Option<f64>,
}

/// Wall-clock markers taken during scheduling, used to derive `Timings`
/// once the job result is known. Not sent over the wire.
#[derive(Debug, Clone, Default)]
pub struct TimingsStart {
    pub arrived_at: Option<Instant>,
    pub scheduled_at: Option<Instant>,
    pub started_probing_at: Option<Instant>,
    pub ended_probing_at: Option<Instant>,
}

impl TimingsStart {
    pub fn arrived_now() -> Self {
        Self {
            arrived_at: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Fills in whichever `Timings` fields are derivable from the
    /// recorded markers and not already populated by the caller (e.g.
    /// `execution_time`, which comes from the back-end's authoritative
    /// duration header).
    pub fn compute(&self, timings: &mut Timings) {
        let now = Instant::now();

        if timings.total_time.is_none() {
            if let Some(arrived) = self.arrived_at {
                timings.total_time = Some(now.duration_since(arrived).as_secs_f64());
            }
        }
        if timings.scheduling_time.is_none() {
            if let (Some(arrived), Some(scheduled)) = (self.arrived_at, self.scheduled_at) {
                timings.scheduling_time = Some(scheduled.duration_since(arrived).as_secs_f64());
            }
        }
        if timings.probing_time.is_none() {
            if let (Some(start), Some(end)) = (self.started_probing_at, self.ended_probing_at) {
                timings.probing_time = Some(end.duration_since(start).as_secs_f64());
            }
        }
    }
}

/// Response produced by the back-end (or a peer, wrapped) for a single
/// executed job.
#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// The orchestrator's uniform outcome for a scheduled request.
#[derive(Debug, Clone, Default)]
pub struct JobResult {
    pub response: Option<ApiResponse>,
    pub timings: Timings,
    pub timings_start: Option<TimingsStart>,
    pub external_execution: bool,
    pub external_execution_info: ExternalExecutionInfo,
    /// Only meaningful for PowerOfN: number of peers probed for load.
    pub probing_messages: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ExternalExecutionInfo {
    pub peers_list: Vec<PeerDescriptor>,
}

/// A name plus positional parameter strings that fully specify a policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerDescriptor {
    pub name: String,
    pub parameters: Vec<String>,
}

/// Identity of this node as assigned by the discovery service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NodeIdentity {
    pub machine_id: String,
    pub machine_ip: String,
}
