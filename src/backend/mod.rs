//! HTTP client for the FaaS runtime this node fronts (an OpenFaaS-style
//! gateway). GET is used when there is no payload, POST otherwise; the
//! choice is the implementer's, the wire contract only cares that the
//! right verb reaches the gateway.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::ApiResponse;

const DURATION_HEADER: &str = "X-Duration-Seconds";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendFunction {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub replicas: u32,
    #[serde(default)]
    pub invocation_count: u64,
}

pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(host: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("backend HTTP client configuration is valid");
        Self { http, base_url: host }
    }

    fn function_url(&self, function_name: &str) -> String {
        format!("{}/function/{}", self.base_url, function_name)
    }

    fn system_functions_url(&self) -> String {
        format!("{}/system/functions", self.base_url)
    }

    fn scale_url(&self, function_name: &str) -> String {
        format!("{}/system/scale-function/{}", self.base_url, function_name)
    }

    pub async fn execute_function(
        &self,
        function_name: &str,
        payload: &[u8],
        content_type: &str,
    ) -> Result<ApiResponse, AppError> {
        let url = self.function_url(function_name);

        let response = if payload.is_empty() {
            self.http.get(&url).send().await
        } else {
            self.http
                .post(&url)
                .header("Content-Type", content_type)
                .body(payload.to_vec())
                .send()
                .await
        }
        .map_err(|e| {
            tracing::debug!(function = function_name, error = %e, "cannot reach backend");
            AppError::BackendUnreachable
        })?;

        to_api_response(response).await
    }

    pub async fn list_functions(&self) -> Result<Vec<BackendFunction>, AppError> {
        let response = self
            .http
            .get(self.system_functions_url())
            .send()
            .await
            .map_err(|_| AppError::BackendUnreachable)?;

        response
            .json::<Vec<BackendFunction>>()
            .await
            .map_err(|_| AppError::BackendGenericError)
    }

    pub async fn get_function(&self, function_name: &str) -> Result<BackendFunction, AppError> {
        self.list_functions()
            .await?
            .into_iter()
            .find(|f| f.name == function_name)
            .ok_or(AppError::NotFound)
    }

    pub async fn scale_function(&self, function_name: &str, replicas: u32) -> Result<(), AppError> {
        let body = serde_json::json!({ "replicas": replicas });
        let response = self
            .http
            .post(self.scale_url(function_name))
            .json(&body)
            .send()
            .await
            .map_err(|_| AppError::BackendUnreachable)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::DeployError)
        }
    }
}

async fn to_api_response(response: reqwest::Response) -> Result<ApiResponse, AppError> {
    let status_code = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
        .collect();
    let body = response
        .bytes()
        .await
        .map_err(|_| AppError::BackendGenericError)?
        .to_vec();

    Ok(ApiResponse {
        status_code,
        headers,
        body,
    })
}

/// Parses the authoritative execution duration the backend reports,
/// falling back to `None` (letting the caller's own timer stand) on any
/// parse failure, exactly as the original client function defaults to
/// 0.0 rather than propagating an error.
pub fn duration_header(headers: &[(String, String)]) -> Option<f64> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(DURATION_HEADER))
        .and_then(|(_, v)| v.parse::<f64>().ok())
}
