use std::time::Instant;

use async_trait::async_trait;

use crate::error::AppError;
use crate::types::{JobResult, SchedulerDescriptor, ServiceRequest, TimingsStart};

use super::common::{execute_job_externally, execute_job_locally, SchedulingContext};
use super::SchedulerPolicy;

pub const NAME: &str = "ForwardScheduler";

/// Forwards every job to one random peer, for testing purposes. Falls
/// back to local execution once `max_hops` is reached, or if no peer is
/// reachable.
#[derive(Debug, Clone)]
pub struct ForwardScheduler {
    pub max_hops: u32,
}

#[async_trait]
impl SchedulerPolicy for ForwardScheduler {
    fn full_name(&self) -> String {
        format!("{}({})", NAME, self.max_hops)
    }

    fn descriptor(&self) -> SchedulerDescriptor {
        SchedulerDescriptor {
            name: NAME.to_string(),
            parameters: vec![self.max_hops.to_string()],
        }
    }

    async fn schedule(&self, ctx: &SchedulingContext, request: ServiceRequest) -> Result<JobResult, AppError> {
        let mut timings_start = TimingsStart {
            arrived_at: Some(Instant::now()),
            ..Default::default()
        };

        let job_must_execute_here = request.external && request.hops() >= self.max_hops;

        if !job_must_execute_here {
            timings_start.started_probing_at = Some(Instant::now());
            let random_machine = ctx.discovery.random_machines(1).await;
            timings_start.ended_probing_at = Some(Instant::now());

            match random_machine {
                Ok(machines) if !machines.is_empty() => {
                    return execute_job_externally(ctx, &request, &machines[0], timings_start).await;
                }
                Ok(_) => {
                    tracing::debug!("no random machines retrieved");
                }
                Err(err) => {
                    tracing::debug!(error = %err, "error in retrieving machines");
                }
            }
        }

        execute_job_locally(ctx, request, timings_start).await
    }
}
