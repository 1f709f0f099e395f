//! `/configuration` and `/configuration/scheduler`: administrative
//! read/write of the node's persisted settings.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::config::{self, AppConfig};
use crate::error::AppError;
use crate::state::NodeState;
use crate::types::SchedulerDescriptor;

pub async fn get_configuration(State(state): State<Arc<NodeState>>) -> Json<AppConfig> {
    Json(state.config.read().await.clone())
}

/// Merges the request body onto the current configuration if one was
/// ever read from file, or onto a fresh default configuration otherwise
/// — matching the original's choice of merge base.
pub async fn set_configuration(
    State(state): State<Arc<NodeState>>,
    body: axum::body::Bytes,
) -> Result<StatusCode, AppError> {
    let base = if state.config_was_read_from_file() {
        state.config.read().await.clone()
    } else {
        AppConfig::default()
    };

    let merged = merge_onto(&base, &body).map_err(|_| AppError::Generic)?;

    {
        let mut config = state.config.write().await;
        *config = merged.clone();
    }
    state.config_read_from_file.store(true, std::sync::atomic::Ordering::Relaxed);

    if let Err(err) = config::save(&state.data_dir, &merged) {
        tracing::warn!(error = %err, "cannot save configuration to file");
    }

    tracing::info!("configuration updated");
    Ok(StatusCode::OK)
}

pub async fn get_scheduler(State(state): State<Arc<NodeState>>) -> Json<SchedulerDescriptor> {
    Json(state.scheduler_descriptor().await)
}

pub async fn set_scheduler(
    State(state): State<Arc<NodeState>>,
    Json(descriptor): Json<SchedulerDescriptor>,
) -> Result<StatusCode, AppError> {
    state.set_scheduler(&descriptor).await?;

    if let Err(err) = config::save_scheduler_descriptor(&state.data_dir, &descriptor) {
        tracing::warn!(error = %err, "cannot save scheduler configuration to file");
    }

    tracing::info!(scheduler = %descriptor.name, "configuration updated with scheduler");
    Ok(StatusCode::OK)
}

fn merge_onto(base: &AppConfig, body: &[u8]) -> Result<AppConfig, serde_json::Error> {
    let mut value = serde_json::to_value(base)?;
    let patch: serde_json::Value = serde_json::from_slice(body)?;

    if let (Some(base_obj), Some(patch_obj)) = (value.as_object_mut(), patch.as_object()) {
        for (key, val) in patch_obj {
            base_obj.insert(key.clone(), val.clone());
        }
    }

    serde_json::from_value(value)
}
