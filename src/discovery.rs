//! Client for the discovery service: resolves this node's own identity
//! at startup and lists/samples peer machines for the scheduler.

use std::time::Duration;

use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::types::NodeIdentity;

#[derive(Debug, Deserialize)]
struct Machine {
    ip: String,
}

pub struct DiscoveryClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("cannot reach discovery service: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("discovery service returned no machines")]
    EmptyList,
}

impl DiscoveryClient {
    pub fn new(host: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("discovery HTTP client configuration is valid");
        Self { http, base_url: host }
    }

    pub async fn list_machines(&self) -> Result<Vec<String>, DiscoveryError> {
        let url = format!("{}/machines", self.base_url);
        let machines: Vec<Machine> = self.http.get(url).send().await?.json().await?;
        Ok(machines.into_iter().map(|m| m.ip).collect())
    }

    /// Picks `n` distinct machines at random, or the whole list unshuffled
    /// when `n` covers it exactly, matching the original's short-circuit.
    pub async fn random_machines(&self, n: usize) -> Result<Vec<String>, DiscoveryError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let list = self.list_machines().await?;
        if list.is_empty() {
            return Err(DiscoveryError::EmptyList);
        }
        if n >= list.len() {
            return Ok(list);
        }

        let mut rng = rand::thread_rng();
        let mut shuffled = list;
        shuffled.shuffle(&mut rng);
        shuffled.truncate(n);
        Ok(shuffled)
    }

    /// Retries every 5 seconds until the discovery service answers, called
    /// once at startup to resolve this node's own identity.
    pub async fn resolve_identity_with_retry(&self) -> NodeIdentity {
        loop {
            match self.fetch_identity().await {
                Ok(identity) => return identity,
                Err(err) => {
                    tracing::warn!(error = %err, "cannot retrieve discovery configuration, retrying in 5 seconds");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn fetch_identity(&self) -> Result<NodeIdentity, DiscoveryError> {
        let url = format!("{}/configuration", self.base_url);
        let identity: NodeIdentity = self.http.get(url).send().await?.json().await?;
        Ok(identity)
    }
}
