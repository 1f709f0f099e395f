use std::time::Instant;

use async_trait::async_trait;

use crate::error::AppError;
use crate::types::{JobResult, SchedulerDescriptor, ServiceRequest, TimingsStart};

use super::common::{execute_job_externally, execute_job_locally, least_loaded_of_n_random, SchedulingContext};
use super::SchedulerPolicy;

pub const NAME: &str = "PowerOfNScheduler";

/// Probes `f` random peers once local load reaches `t`, and forwards to
/// the least loaded one if it strictly improves on the local load.
#[derive(Debug, Clone)]
pub struct PowerOfNScheduler {
    pub f: u32,
    pub t: u32,
    pub loss: bool,
    pub max_hops: u32,
}

impl PowerOfNScheduler {
    pub const NAME: &'static str = NAME;
}

#[async_trait]
impl SchedulerPolicy for PowerOfNScheduler {
    fn full_name(&self) -> String {
        format!("{}({}, {}, {}, {})", NAME, self.f, self.t, self.loss, self.max_hops)
    }

    fn descriptor(&self) -> SchedulerDescriptor {
        SchedulerDescriptor {
            name: NAME.to_string(),
            parameters: vec![
                self.f.to_string(),
                self.t.to_string(),
                self.loss.to_string(),
                self.max_hops.to_string(),
            ],
        }
    }

    async fn schedule(&self, ctx: &SchedulingContext, request: ServiceRequest) -> Result<JobResult, AppError> {
        let current_load = ctx.load_memory.current_load();
        let mut timings_start = TimingsStart {
            arrived_at: Some(Instant::now()),
            ..Default::default()
        };

        let balancing_hit = current_load >= self.t;
        let job_must_execute_here = request.external && request.hops() >= self.max_hops;

        tracing::debug!(
            request_id = request.id,
            balancing_hit,
            job_must_execute_here,
            "scheduling decision"
        );

        if balancing_hit && !job_must_execute_here {
            timings_start.started_probing_at = Some(Instant::now());
            let least_loaded = least_loaded_of_n_random(ctx, self.f, current_load).await;
            timings_start.ended_probing_at = Some(Instant::now());

            return match least_loaded {
                Ok(ip) => {
                    let mut result = execute_job_externally(ctx, &request, &ip, timings_start).await?;
                    result.probing_messages = self.f;
                    Ok(result)
                }
                Err(err) => {
                    tracing::debug!(error = %err, "error in retrieving machines, running locally");
                    let mut result = execute_job_locally(ctx, request, timings_start).await?;
                    result.probing_messages = self.f;
                    Ok(result)
                }
            };
        }

        execute_job_locally(ctx, request, timings_start).await
    }
}
