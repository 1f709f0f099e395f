use std::time::Instant;

use async_trait::async_trait;

use crate::error::AppError;
use crate::types::{JobResult, ServiceRequest, SchedulerDescriptor, TimingsStart};

use super::common::{execute_job_locally, SchedulingContext};
use super::SchedulerPolicy;

pub const NAME: &str = "NoSchedulingScheduler";

/// Always executes locally, never forwards. `loss` carries no control
/// flow of its own here (the queue already uniformly rejects once full)
/// but is preserved in the descriptor as the deployment's documented
/// loss-tolerance policy.
#[derive(Debug, Clone)]
pub struct NoSchedulingScheduler {
    pub loss: bool,
}

#[async_trait]
impl SchedulerPolicy for NoSchedulingScheduler {
    fn full_name(&self) -> String {
        format!("{}({})", NAME, self.loss)
    }

    fn descriptor(&self) -> SchedulerDescriptor {
        SchedulerDescriptor {
            name: NAME.to_string(),
            parameters: vec![self.loss.to_string()],
        }
    }

    async fn schedule(&self, ctx: &SchedulingContext, request: ServiceRequest) -> Result<JobResult, AppError> {
        let timings_start = TimingsStart {
            arrived_at: Some(Instant::now()),
            ..Default::default()
        };
        execute_job_locally(ctx, request, timings_start).await
    }
}
