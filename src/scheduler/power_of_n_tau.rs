use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::AppError;
use crate::types::{JobResult, SchedulerDescriptor, ServiceRequest, TimingsStart};

use super::common::{execute_job_externally, execute_job_locally, least_loaded_of_n_random, SchedulingContext};
use super::SchedulerPolicy;

pub const NAME: &str = "PowerOfNSchedulerTau";

/// Like [`super::power_of_n::PowerOfNScheduler`], but pads the probing
/// phase out to a fixed duration `tau` so that request latency does not
/// leak information about whether balancing occurred.
#[derive(Debug, Clone)]
pub struct PowerOfNSchedulerTau {
    pub f: u32,
    pub t: u32,
    pub loss: bool,
    pub max_hops: u32,
    pub tau: Duration,
}

#[async_trait]
impl SchedulerPolicy for PowerOfNSchedulerTau {
    fn full_name(&self) -> String {
        format!(
            "{}({}, {}, {}, {}, {}ms)",
            NAME,
            self.f,
            self.t,
            self.loss,
            self.max_hops,
            self.tau.as_millis()
        )
    }

    fn descriptor(&self) -> SchedulerDescriptor {
        SchedulerDescriptor {
            name: NAME.to_string(),
            parameters: vec![
                self.f.to_string(),
                self.t.to_string(),
                self.loss.to_string(),
                self.max_hops.to_string(),
                format!("{}ms", self.tau.as_millis()),
            ],
        }
    }

    async fn schedule(&self, ctx: &SchedulingContext, request: ServiceRequest) -> Result<JobResult, AppError> {
        let current_load = ctx.load_memory.current_load();
        let started_scheduling = Instant::now();
        let mut timings_start = TimingsStart {
            arrived_at: Some(started_scheduling),
            ..Default::default()
        };

        let balancing_hit = current_load >= self.t;
        let job_must_execute_here = request.external && request.hops() >= self.max_hops;

        if balancing_hit && !job_must_execute_here {
            let started_probing = Instant::now();
            timings_start.started_probing_at = Some(started_probing);
            let least_loaded = least_loaded_of_n_random(ctx, self.f, current_load).await;
            let ended_probing = Instant::now();
            timings_start.ended_probing_at = Some(ended_probing);

            let probing_time = ended_probing.duration_since(started_probing);
            if started_scheduling.elapsed() < self.tau {
                tokio::time::sleep(self.tau.saturating_sub(probing_time)).await;
            }

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
