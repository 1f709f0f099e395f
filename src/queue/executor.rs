//! Local job execution: the step that actually calls the FaaS backend
//! once a queued job has been handed a free slot.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::backend::BackendClient;
use crate::memdb::LoadMemory;
use crate::types::{JobResult, ServiceRequest};

#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, request: ServiceRequest) -> JobResult;
}

pub struct BackendExecutor {
    load_memory: Arc<LoadMemory>,
    backend: Arc<BackendClient>,
}

impl BackendExecutor {
    pub fn new(load_memory: Arc<LoadMemory>, backend: Arc<BackendClient>) -> Self {
        Self { load_memory, backend }
    }
}

#[async_trait]
impl JobExecutor for BackendExecutor {
    async fn execute(&self, request: ServiceRequest) -> JobResult {
        tracing::debug!(
            request_id = request.id,
            function = %request.service_name,
            has_payload = !request.payload.is_empty(),
            "starting local execution"
        );

        self.load_memory.mark_running(&request.service_name);
        let started = Instant::now();

        let outcome = self
            .backend
            .execute_function(&request.service_name, &request.payload, &request.content_type)
            .await;

        let mut result = JobResult::default();
        result.timings.execution_time = Some(started.elapsed().as_secs_f64());

        self.load_memory.mark_stopped(&request.service_name);

        match outcome {
            Ok(response) => {
                tracing::debug!(function = %request.service_name, "function executed");
                if let Some(duration) = crate::backend::duration_header(&response.headers) {
                    result.timings.execution_time = Some(duration);
                }
                result.response = Some(response);
            }
            Err(err) => {
                tracing::error!(function = %request.service_name, error = %err, "cannot execute service");
            }
        }

        result
    }
}
