//! HTTP client for talking to peer scheduler nodes: probing load and
//! forwarding a job for execution.

use std::time::Duration;

use crate::headers;
use crate::types::{PeerJobRequest, PeerJobResponse};

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("cannot reach peer: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("peer did not return a usable load header")]
    NoLoadHeader,
}

pub struct PeerClient {
    http: reqwest::Client,
}

impl Default for PeerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            // Marks this call as peer-originated, the same way the
            // original tags machine-to-machine calls with a distinct
            // User-Agent so the receiving node can tell client traffic
            // apart from peer traffic.
            .user_agent("Machine")
            .build()
            .expect("peer HTTP client configuration is valid");
        Self { http }
    }

    pub async fn get_load(&self, host: &str) -> Result<i64, PeerError> {
        let url = format!("{host}/monitoring/load");
        let response = self.http.get(url).send().await?;
        let load = response
            .headers()
            .get(headers::LOAD)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or(PeerError::NoLoadHeader)?;
        Ok(load)
    }

    pub async fn execute_function(
        &self,
        host: &str,
        function_name: &str,
        request: &PeerJobRequest,
    ) -> Result<PeerJobResponse, PeerError> {
        let url = format!("{host}/peer/function/{function_name}");
        let response = self.http.post(url).json(request).send().await?;
        let body: PeerJobResponse = response.json().await?;
        Ok(body)
    }
}
