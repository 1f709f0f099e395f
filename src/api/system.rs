//! `/system/*`: thin pass-throughs to the back-end FaaS gateway.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::backend::BackendFunction;
use crate::error::AppError;
use crate::state::NodeState;

pub async fn list_functions(State(state): State<Arc<NodeState>>) -> Result<Json<Vec<BackendFunction>>, AppError> {
    Ok(Json(state.backend.list_functions().await?))
}

pub async fn get_function(
    State(state): State<Arc<NodeState>>,
    Path(name): Path<String>,
) -> Result<Json<BackendFunction>, AppError> {
    Ok(Json(state.backend.get_function(&name).await?))
}

#[derive(Debug, Deserialize)]
pub struct ScaleRequest {
    pub replicas: u32,
}

pub async fn scale_function(
    State(state): State<Arc<NodeState>>,
    Path(name): Path<String>,
    Json(req): Json<ScaleRequest>,
) -> Result<StatusCode, AppError> {
    state.backend.scale_function(&name, req.replicas).await?;
    Ok(StatusCode::OK)
}
