//! The pluggable scheduling policy engine. Each policy implements the
//! same `full_name`/`descriptor`/`schedule` contract the original
//! defines as its `scheduler` interface; `SchedulerHandle` is the
//! tagged-variant equivalent of the Go interface, dispatched by a plain
//! `match` rather than a vtable so descriptor (de)serialization stays
//! exhaustive and compile-checked.

pub mod common;
mod forward;
mod no_scheduling;
mod power_of_n;
mod power_of_n_tau;
mod round_robin_master;

pub use common::SchedulingContext;
pub use power_of_n::PowerOfNScheduler;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppError;
use crate::types::{JobResult, SchedulerDescriptor, ServiceRequest};

use forward::ForwardScheduler;
use no_scheduling::NoSchedulingScheduler;
use power_of_n_tau::PowerOfNSchedulerTau;
use round_robin_master::RoundRobinWithMasterScheduler;

#[async_trait]
pub trait SchedulerPolicy: Send + Sync {
    /// Name plus parameters, formatted for logs (e.g. `PowerOfNScheduler(1, 2, true, 1)`).
    fn full_name(&self) -> String;
    /// The serializable descriptor this policy round-trips to/from.
    fn descriptor(&self) -> SchedulerDescriptor;
    /// Schedules a request; blocks (asynchronously) until the job has
    /// executed locally or externally, or until it is certain it cannot
    /// be scheduled.
    async fn schedule(&self, ctx: &SchedulingContext, request: ServiceRequest) -> Result<JobResult, AppError>;
}

pub enum SchedulerHandle {
    NoScheduling(NoSchedulingScheduler),
    Forward(ForwardScheduler),
    PowerOfN(PowerOfNScheduler),
    PowerOfNTau(PowerOfNSchedulerTau),
    RoundRobinWithMaster(RoundRobinWithMasterScheduler),
}

#[async_trait]
impl SchedulerPolicy for SchedulerHandle {
    fn full_name(&self) -> String {
        match self {
            SchedulerHandle::NoScheduling(s) => s.full_name(),
            SchedulerHandle::Forward(s) => s.full_name(),
            SchedulerHandle::PowerOfN(s) => s.full_name(),
            SchedulerHandle::PowerOfNTau(s) => s.full_name(),
            SchedulerHandle::RoundRobinWithMaster(s) => s.full_name(),
        }
    }

    fn descriptor(&self) -> SchedulerDescriptor {
        match self {
            SchedulerHandle::NoScheduling(s) => s.descriptor(),
            SchedulerHandle::Forward(s) => s.descriptor(),
            SchedulerHandle::PowerOfN(s) => s.descriptor(),
            SchedulerHandle::PowerOfNTau(s) => s.descriptor(),
            SchedulerHandle::RoundRobinWithMaster(s) => s.descriptor(),
        }
    }

    async fn schedule(&self, ctx: &SchedulingContext, request: ServiceRequest) -> Result<JobResult, AppError> {
        match self {
            SchedulerHandle::NoScheduling(s) => s.schedule(ctx, request).await,
            SchedulerHandle::Forward(s) => s.schedule(ctx, request).await,
            SchedulerHandle::PowerOfN(s) => s.schedule(ctx, request).await,
            SchedulerHandle::PowerOfNTau(s) => s.schedule(ctx, request).await,
            SchedulerHandle::RoundRobinWithMaster(s) => s.schedule(ctx, request).await,
        }
    }
}

pub fn default_scheduler() -> SchedulerHandle {
    SchedulerHandle::PowerOfN(PowerOfNScheduler {
        f: 1,
        t: 2,
        loss: true,
        max_hops: 1,
    })
}

/// Parses a descriptor into a live policy, matching the original's
/// `SetScheduler` positional-parameter parsing. Any parse failure (wrong
/// count, wrong type) is reported uniformly as
/// `AppError::InputNotValid` — the descriptor was simply malformed.
pub fn parse_descriptor(descriptor: &SchedulerDescriptor) -> Result<SchedulerHandle, AppError> {
    let bad = || AppError::InputNotValid;
    let params = &descriptor.parameters;

    match descriptor.name.as_str() {
        no_scheduling::NAME => {
            let loss = params.first().ok_or_else(bad)?.parse().map_err(|_| bad())?;
            Ok(SchedulerHandle::NoScheduling(NoSchedulingScheduler { loss }))
        }
        forward::NAME => {
            let max_hops = params.first().ok_or_else(bad)?.parse().map_err(|_| bad())?;
            Ok(SchedulerHandle::Forward(ForwardScheduler { max_hops }))
        }
        power_of_n::NAME => {
            if params.len() < 4 {
                return Err(bad());
            }
            let f = params[0].parse().map_err(|_| bad())?;
            let t = params[1].parse().map_err(|_| bad())?;
            let loss = params[2].parse().map_err(|_| bad())?;
            let max_hops = params[3].parse().map_err(|_| bad())?;
            Ok(SchedulerHandle::PowerOfN(PowerOfNScheduler { f, t, loss, max_hops }))
        }
        power_of_n_tau::NAME => {
            if params.len() < 5 {
                return Err(bad());
            }
            let f = params[0].parse().map_err(|_| bad())?;
            let t = params[1].parse().map_err(|_| bad())?;
            let loss = params[2].parse().map_err(|_| bad())?;
            let max_hops = params[3].parse().map_err(|_| bad())?;
            let tau = parse_duration(&params[4]).ok_or_else(bad)?;
            Ok(SchedulerHandle::PowerOfNTau(PowerOfNSchedulerTau {
                f,
                t,
                loss,
                max_hops,
                tau,
            }))
        }
        round_robin_master::NAME => {
            if params.len() < 3 {
                return Err(bad());
            }
            let master = params[0].parse().map_err(|_| bad())?;
            let master_ip = params[1].clone();
            let loss = params[2].parse().map_err(|_| bad())?;
            Ok(SchedulerHandle::RoundRobinWithMaster(RoundRobinWithMasterScheduler::new(
                master, master_ip, loss,
            )))
        }
        _ => Err(bad()),
    }
}

/// Parses durations of the shape `"200ms"`/`"10s"` the same way the
/// original's descriptor parameters encode `Tau`.
fn parse_duration(s: &str) -> Option<Duration> {
    if let Some(ms) = s.strip_suffix("ms") {
        return ms.parse::<u64>().ok().map(Duration::from_millis);
    }
    if let Some(secs) = s.strip_suffix('s') {
        return secs.parse::<u64>().ok().map(Duration::from_secs);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, params: &[&str]) -> SchedulerDescriptor {
        SchedulerDescriptor {
            name: name.to_string(),
            parameters: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn default_scheduler_is_power_of_n_1_2_true_1() {
        let sched = default_scheduler();
        assert_eq!(sched.descriptor(), descriptor("PowerOfNScheduler", &["1", "2", "true", "1"]));
    }

    #[test]
    fn parses_all_five_policies() {
        assert!(parse_descriptor(&descriptor("NoSchedulingScheduler", &["true"])).is_ok());
        assert!(parse_descriptor(&descriptor("ForwardScheduler", &["2"])).is_ok());
        assert!(parse_descriptor(&descriptor("PowerOfNScheduler", &["1", "2", "true", "1"])).is_ok());
        assert!(parse_descriptor(&descriptor("PowerOfNSchedulerTau", &["1", "2", "true", "1", "200ms"])).is_ok());
        assert!(parse_descriptor(&descriptor(
            "RoundRobinWithMasterScheduler",
            &["true", "10.0.0.1", "false"]
        ))
        .is_ok());
    }

    #[test]
    fn rejects_malformed_parameters() {
        assert!(parse_descriptor(&descriptor("PowerOfNScheduler", &["1", "2"])).is_err());
        assert!(parse_descriptor(&descriptor("PowerOfNScheduler", &["x", "2", "true", "1"])).is_err());
        assert!(parse_descriptor(&descriptor("PowerOfNSchedulerTau", &["1", "2", "true", "1", "nope"])).is_err());
        assert!(parse_descriptor(&descriptor("NotAScheduler", &[])).is_err());
    }

    #[test]
    fn round_trips_descriptor_for_each_policy() {
        for d in [
            descriptor("NoSchedulingScheduler", &["true"]),
            descriptor("ForwardScheduler", &["3"]),
            descriptor("PowerOfNScheduler", &["2", "3", "false", "2"]),
            descriptor("PowerOfNSchedulerTau", &["2", "3", "false", "2", "150ms"]),
            descriptor("RoundRobinWithMasterScheduler", &["false", "10.0.0.2", "true"]),
        ] {
            let policy = parse_descriptor(&d).unwrap();
            assert_eq!(policy.descriptor(), d);
        }
    }
}
