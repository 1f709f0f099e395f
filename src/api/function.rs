//! Client-facing invocation endpoint: `GET|POST /function/{name}`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::headers;
use crate::state::NodeState;
use crate::types::ServiceRequest;

pub async fn execute(
    State(state): State<Arc<NodeState>>,
    Path(function_name): Path<String>,
    request_headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let content_type = request_headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let request = ServiceRequest {
        id: state.next_request_id(),
        service_name: function_name.clone(),
        payload: body.to_vec(),
        content_type,
        external: false,
        peer_request: None,
    };

    tracing::debug!(request_id = request.id, function = %function_name, "received client job");

    let mut result = state.schedule(request.clone()).await?;

    if result.external_execution {
        result
            .external_execution_info
            .peers_list
            .push(state.peer_descriptor(result.timings.clone()));
    }

    state.metrics.observe_job_completed(&function_name);

    let api_response = result.response.clone().unwrap_or_default();

    let mut response_headers = HeaderMap::new();
    if let Some((_, content_type)) = api_response.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
        if let Ok(value) = axum::http::HeaderValue::from_str(content_type) {
            response_headers.insert(axum::http::header::CONTENT_TYPE, value);
        }
    }
    headers::copy_x_headers(&mut response_headers, &api_response.headers);
    headers::add_scheduling_headers(&mut response_headers, &request, &state.scheduler_full_name().await, &result);

    let status = StatusCode::from_u16(api_response.status_code).unwrap_or(StatusCode::OK);
    Ok((status, response_headers, api_response.body).into_response())
}
