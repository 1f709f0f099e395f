//! p2pfaas-scheduler: a per-node load-balancing front-end for a cluster
//! of FaaS workers.
//!
//! Accepts client and peer invocation requests, queues them behind a
//! bounded concurrency limit, and dispatches each one to the local FaaS
//! backend or forwards it to a peer node according to a pluggable
//! scheduling policy.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::RwLock;
use tracing::info;

use p2pfaas_scheduler::backend::BackendClient;
use p2pfaas_scheduler::cli::{Cli, Command, SchedulerAction};
use p2pfaas_scheduler::discovery::DiscoveryClient;
use p2pfaas_scheduler::memdb::LoadMemory;
use p2pfaas_scheduler::metrics::Metrics;
use p2pfaas_scheduler::peer::PeerClient;
use p2pfaas_scheduler::queue::{BackendExecutor, QueueHandle};
use p2pfaas_scheduler::state::NodeState;
use p2pfaas_scheduler::types::SchedulerDescriptor;
use p2pfaas_scheduler::{api, config, scheduler, types};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("p2pfaas_scheduler=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .map(PathBuf::from)
        .unwrap_or_else(config::default_data_path);

    if let Some(command) = cli.command {
        return run_command(&data_dir, command);
    }

    info!(data_dir = %data_dir.display(), "starting p2pfaas-scheduler");

    let (mut app_config, config_read_from_file) = config::load(&data_dir);
    if let Some(port) = cli.listening_port {
        app_config.listening_port = port;
    }

    info!(
        environment = %app_config.running_environment,
        running_functions_max = app_config.running_functions_max,
        queue_length_max = app_config.queue_length_max,
        "configuration loaded"
    );

    let metrics = Arc::new(Metrics::new());
    let load_memory = Arc::new(LoadMemory::new(app_config.running_functions_max));
    let queue = QueueHandle::new(
        app_config.running_functions_max as usize,
        app_config.queue_length_max as usize,
        metrics.clone(),
    );
    let backend = Arc::new(BackendClient::new(app_config.faas_listening_host.clone()));
    let peer_client = Arc::new(PeerClient::new());
    let discovery = Arc::new(DiscoveryClient::new(app_config.discovery_listening_host.clone()));

    let identity = if app_config.is_development() {
        if let Some(node_id) = cli.node_id.clone() {
            types::NodeIdentity {
                machine_id: node_id,
                machine_ip: "127.0.0.1".to_string(),
            }
        } else {
            discovery.resolve_identity_with_retry().await
        }
    } else {
        discovery.resolve_identity_with_retry().await
    };
    info!(machine_id = %identity.machine_id, machine_ip = %identity.machine_ip, "node identity resolved");

    let active_scheduler = config::load_scheduler_descriptor(&data_dir)
        .and_then(|descriptor| scheduler::parse_descriptor(&descriptor).ok())
        .unwrap_or_else(scheduler::default_scheduler);
    info!(scheduler = %scheduler::SchedulerPolicy::full_name(&active_scheduler), "active scheduler");

    let executor = Arc::new(BackendExecutor::new(load_memory.clone(), backend.clone()));
    tokio::spawn(queue.clone().run(executor));

    let listening_port = app_config.listening_port;

    let state = Arc::new(NodeState {
        config: RwLock::new(app_config),
        scheduler: RwLock::new(active_scheduler),
        load_memory,
        queue,
        backend,
        peer_client,
        discovery,
        metrics,
        identity,
        data_dir,
        config_read_from_file: AtomicBool::new(config_read_from_file),
    });

    let app = api::router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], listening_port));
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Handles the `scheduler show`/`set` subcommands, which inspect or
/// change the persisted policy without starting the HTTP server.
fn run_command(data_dir: &std::path::Path, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Scheduler { action } => match action {
            SchedulerAction::Show => {
                let descriptor = config::load_scheduler_descriptor(data_dir)
                    .unwrap_or_else(|| scheduler::default_scheduler().descriptor());
                println!("{}", serde_json::to_string_pretty(&descriptor)?);
            }
            SchedulerAction::Set { name, parameters } => {
                let descriptor = SchedulerDescriptor { name, parameters };
                // Validate it parses before persisting.
                scheduler::parse_descriptor(&descriptor)?;
                config::save_scheduler_descriptor(data_dir, &descriptor)?;
                println!("scheduler updated: {}", descriptor.name);
            }
        },
    }
    Ok(())
}
