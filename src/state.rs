//! Shared, process-wide node state handed to every HTTP handler.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::backend::BackendClient;
use crate::config::AppConfig;
use crate::discovery::DiscoveryClient;
use crate::error::AppError;
use crate::memdb::LoadMemory;
use crate::metrics::Metrics;
use crate::peer::PeerClient;
use crate::queue::QueueHandle;
use crate::scheduler::{self, SchedulerHandle, SchedulerPolicy, SchedulingContext};
use crate::types::{JobResult, NodeIdentity, PeerDescriptor, ServiceRequest, Timings};

pub struct NodeState {
    pub config: RwLock<AppConfig>,
    pub scheduler: RwLock<SchedulerHandle>,
    pub load_memory: Arc<LoadMemory>,
    pub queue: Arc<QueueHandle>,
    pub backend: Arc<BackendClient>,
    pub peer_client: Arc<PeerClient>,
    pub discovery: Arc<DiscoveryClient>,
    pub metrics: Arc<Metrics>,
    pub identity: NodeIdentity,
    pub data_dir: PathBuf,
    /// Whether `config` was loaded from an existing file at startup, as
    /// opposed to falling back to defaults. Gates whether a partial
    /// `SetConfiguration` merges onto the current configuration or onto
    /// a fresh default one.
    pub config_read_from_file: AtomicBool,
}

impl NodeState {
    /// Assigns the next development-only request id; always zero in
    /// production, matching the original's `log.GetEnv()` check.
    pub fn next_request_id(&self) -> u64 {
        let config = self.config.try_read();
        let is_dev = config.map(|c| c.is_development()).unwrap_or(false);
        if is_dev {
            self.load_memory.next_request_number()
        } else {
            0
        }
    }

    pub async fn schedule(&self, request: ServiceRequest) -> Result<JobResult, AppError> {
        let ctx = SchedulingContext {
            load_memory: self.load_memory.clone(),
            queue: self.queue.clone(),
            peer_client: self.peer_client.clone(),
            discovery: self.discovery.clone(),
            identity: self.identity.clone(),
        };
        let scheduler = self.scheduler.read().await;
        scheduler.schedule(&ctx, request).await
    }

    pub async fn scheduler_full_name(&self) -> String {
        self.scheduler.read().await.full_name()
    }

    pub async fn scheduler_descriptor(&self) -> crate::types::SchedulerDescriptor {
        self.scheduler.read().await.descriptor()
    }

    /// Refuses to switch policies while jobs are in flight, matching the
    /// original's `CannotChangeScheduler`.
    pub async fn set_scheduler(&self, descriptor: &crate::types::SchedulerDescriptor) -> Result<(), AppError> {
        if self.load_memory.total_running() != 0 {
            return Err(AppError::JobCannotBeScheduled(
                "scheduler cannot be changed while jobs are running".to_string(),
            ));
        }
        let new_scheduler = scheduler::parse_descriptor(descriptor)?;
        *self.scheduler.write().await = new_scheduler;
        Ok(())
    }

    pub fn config_was_read_from_file(&self) -> bool {
        self.config_read_from_file.load(Ordering::Relaxed)
    }

    pub fn peer_descriptor(&self, timings: Timings) -> PeerDescriptor {
        PeerDescriptor {
            machine_id: self.identity.machine_id.clone(),
            machine_ip: self.identity.machine_ip.clone(),
            timings,
        }
    }
}
