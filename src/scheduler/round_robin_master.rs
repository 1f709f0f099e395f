use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;

use crate::error::AppError;
use crate::types::{JobResult, SchedulerDescriptor, ServiceRequest, TimingsStart};

use super::common::{execute_job_externally, execute_job_locally, SchedulingContext};
use super::SchedulerPolicy;

pub const NAME: &str = "RoundRobinWithMasterScheduler";

/// On the master node, round-robins every externally-originated (i.e.
/// client-facing) request across the known machines and refuses to
/// accept internally-originated dispatch (the master only dispatches).
/// On a slave node, every internal request is forwarded to the master
/// and every request already received from a peer is executed locally.
#[derive(Debug)]
pub struct RoundRobinWithMasterScheduler {
    pub master: bool,
    pub master_ip: String,
    pub loss: bool,
    current_index: Mutex<usize>,
}

impl RoundRobinWithMasterScheduler {
    pub fn new(master: bool, master_ip: String, loss: bool) -> Self {
        Self {
            master,
            master_ip,
            loss,
            current_index: Mutex::new(0),
        }
    }
}

#[async_trait]
impl SchedulerPolicy for RoundRobinWithMasterScheduler {
    fn full_name(&self) -> String {
        format!("{}({}, {}, {})", NAME, self.master, self.master_ip, self.loss)
    }

    fn descriptor(&self) -> SchedulerDescriptor {
        SchedulerDescriptor {
            name: NAME.to_string(),
            parameters: vec![self.master.to_string(), self.master_ip.clone(), self.loss.to_string()],
        }
    }

    async fn schedule(&self, ctx: &SchedulingContext, request: ServiceRequest) -> Result<JobResult, AppError> {
        let timings_start = TimingsStart {
            arrived_at: Some(Instant::now()),
            ..Default::default()
        };

        if self.master {
            if !request.external {
                return Err(AppError::JobCannotBeScheduled(
                    "master node only dispatches, it does not accept internal requests".to_string(),
                ));
            }

            let machines = ctx
                .discovery
                .list_machines()
                .await
                .map_err(|e| AppError::JobCannotBeScheduled(e.to_string()))?;
            if machines.is_empty() {
                return Err(AppError::JobCannotBeScheduled("no machine known".to_string()));
            }

            let picked_ip = {
                let mut index = self.current_index.lock().unwrap();
                if *index >= machines.len() {
                    *index = 0;
                }
                let picked = machines[*index].clone();
                *index = (*index + 1) % machines.len();
                picked
            };

            return execute_job_externally(ctx, &request, &picked_ip, timings_start).await;
        }

        // Slave node.
        if !request.external {
            return execute_job_externally(ctx, &request, &self.master_ip, timings_start).await;
        }

        execute_job_locally(ctx, request, timings_start).await
    }
}
