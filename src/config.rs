//! Node configuration: defaults, JSON file persistence with
//! write-then-rename, and the running-environment/profiling env vars.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const ENV_RUNNING_ENVIRONMENT: &str = "P2PFAAS_DEV_ENV";
pub const ENV_PROFILING: &str = "P2PFAAS_PROF";

pub const RUNNING_ENVIRONMENT_PRODUCTION: &str = "production";
pub const RUNNING_ENVIRONMENT_DEVELOPMENT: &str = "development";

const CONFIG_FILE_NAME: &str = "p2p_faas-scheduler.json";
const SCHEDULER_CONFIG_FILE_NAME: &str = "p2p_faas-scheduler-config.json";

fn default_running_functions_max() -> u32 {
    10
}
fn default_queue_length_max() -> u32 {
    100
}
fn default_listening_port() -> u16 {
    18080
}
fn default_faas_listening_port() -> u16 {
    8080
}
fn default_faas_listening_host() -> String {
    "http://faas-swarm:8080".to_string()
}
fn default_discovery_listening_port() -> u16 {
    19000
}
fn default_discovery_listening_host() -> String {
    "http://discovery:19000".to_string()
}
fn default_running_environment() -> String {
    RUNNING_ENVIRONMENT_PRODUCTION.to_string()
}

/// Mirrors `ConfigurationSetExp`: the persisted, exported shape of the
/// node's configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_running_functions_max")]
    pub running_functions_max: u32,
    #[serde(default = "default_queue_length_max")]
    pub queue_length_max: u32,
    #[serde(default = "default_listening_port")]
    pub listening_port: u16,
    #[serde(default = "default_faas_listening_port")]
    pub faas_listening_port: u16,
    #[serde(default = "default_faas_listening_host")]
    pub faas_listening_host: String,
    #[serde(default = "default_discovery_listening_port")]
    pub discovery_listening_port: u16,
    #[serde(default = "default_discovery_listening_host")]
    pub discovery_listening_host: String,
    #[serde(default = "default_running_environment")]
    pub running_environment: String,
    #[serde(skip, default)]
    pub profiling_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            running_functions_max: default_running_functions_max(),
            queue_length_max: default_queue_length_max(),
            listening_port: default_listening_port(),
            faas_listening_port: default_faas_listening_port(),
            faas_listening_host: default_faas_listening_host(),
            discovery_listening_port: default_discovery_listening_port(),
            discovery_listening_host: default_discovery_listening_host(),
            running_environment: default_running_environment(),
            profiling_enabled: false,
        }
    }
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.running_environment == RUNNING_ENVIRONMENT_DEVELOPMENT
    }
}

pub fn config_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE_NAME)
}

pub fn scheduler_config_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SCHEDULER_CONFIG_FILE_NAME)
}

/// Returns `./data` in development, `/data` in production, matching the
/// original's `GetDataPath`.
pub fn default_data_path() -> PathBuf {
    let running_env = std::env::var(ENV_RUNNING_ENVIRONMENT).unwrap_or_default();
    if running_env != RUNNING_ENVIRONMENT_PRODUCTION {
        PathBuf::from("./data")
    } else {
        PathBuf::from("/data")
    }
}

/// Loads the node config from `data_dir`, falling back to defaults on
/// any read/parse failure. The running environment always comes from
/// the env var, never from the file, to avoid stale deploys silently
/// flipping environments.
pub fn load(data_dir: &Path) -> (AppConfig, bool) {
    let path = config_file_path(data_dir);
    let config = match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot decode config file, using default values");
                return (with_env(AppConfig::default()), false);
            }
        },
        Err(_) => {
            tracing::warn!(path = %path.display(), "cannot read config file, using default values");
            return (with_env(AppConfig::default()), false);
        }
    };
    (with_env(config), true)
}

fn with_env(mut config: AppConfig) -> AppConfig {
    config.running_environment = if std::env::var(ENV_RUNNING_ENVIRONMENT).as_deref() == Ok(RUNNING_ENVIRONMENT_DEVELOPMENT) {
        RUNNING_ENVIRONMENT_DEVELOPMENT.to_string()
    } else {
        RUNNING_ENVIRONMENT_PRODUCTION.to_string()
    };
    config.profiling_enabled = std::env::var(ENV_PROFILING).map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false);
    config
}

/// Best-effort atomic save: write to a temp file in the same directory,
/// then rename over the target.
pub fn save(data_dir: &Path, config: &AppConfig) -> std::io::Result<()> {
    save_json(data_dir, &config_file_path(data_dir), config)
}

pub fn save_scheduler_descriptor(
    data_dir: &Path,
    descriptor: &crate::types::SchedulerDescriptor,
) -> std::io::Result<()> {
    save_json(data_dir, &scheduler_config_file_path(data_dir), descriptor)
}

fn save_json<T: Serialize>(data_dir: &Path, path: &Path, value: &T) -> std::io::Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let contents = serde_json::to_vec_pretty(value)?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Loads the scheduler descriptor from `data_dir`, falling back to
/// `None` (caller should use the compiled default policy) on any
/// read/parse failure.
pub fn load_scheduler_descriptor(data_dir: &Path) -> Option<crate::types::SchedulerDescriptor> {
    let path = scheduler_config_file_path(data_dir);
    let contents = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(descriptor) => Some(descriptor),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not decode scheduler config file, using default");
            None
        }
    }
}
