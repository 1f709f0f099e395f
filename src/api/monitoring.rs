//! `/monitoring/*`: the load probe peers hit before forwarding a job, and
//! the scale-delay introspection endpoint, which stays a thin stub — it
//! is explicitly out of core for this node.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;

use crate::headers;
use crate::state::NodeState;

pub async fn load(State(state): State<Arc<NodeState>>) -> (HeaderMap, String) {
    let current_load = state.load_memory.current_load();

    let mut response_headers = HeaderMap::new();
    if let Ok(value) = axum::http::HeaderValue::from_str(&current_load.to_string()) {
        response_headers.insert(headers::LOAD, value);
    }

    (response_headers, current_load.to_string())
}

/// Scale-delay estimation is a collaborator concern, not implemented by
/// this node; always reports zero delay.
pub async fn scale_delay(Path(_function_name): Path<String>) -> String {
    "0".to_string()
}
