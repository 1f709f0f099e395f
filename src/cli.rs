//! Command-line surface: startup flags plus an administrative
//! `scheduler` subcommand group usable without starting the HTTP server.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "p2pfaas-scheduler")]
#[command(about = "Per-node load-balancing front-end for a cluster of FaaS workers")]
pub struct Cli {
    /// Directory holding the node configuration and scheduler descriptor files
    #[arg(short, long, env = "P2PFAAS_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Overrides the node id normally resolved from the discovery service
    #[arg(long, env = "P2PFAAS_NODE_ID")]
    pub node_id: Option<String>,

    /// Overrides the configured HTTP listening port
    #[arg(short, long)]
    pub listening_port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Inspect or change the active scheduling policy without starting the server
    Scheduler {
        #[command(subcommand)]
        action: SchedulerAction,
    },
}

#[derive(Subcommand)]
pub enum SchedulerAction {
    /// Prints the currently persisted scheduler descriptor
    Show,
    /// Persists a new scheduler descriptor (name plus positional parameters)
    Set {
        name: String,
        #[arg(num_args = 0..)]
        parameters: Vec<String>,
    },
}
