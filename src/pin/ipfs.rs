//! IPFS HTTP RPC API pin service
//!
//! Talks to a local `ipfs daemon` (Kubo) over `POST /api/v0/pin/{add,rm}`.

use crate::config::schema::IpfsConfig;
use crate::error::{PinOp, PinkeepError, PinkeepResult};
use crate::ledger::ResourceKey;
use crate::pin::PinService;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Error text Kubo returns from `pin/rm` when there is nothing to remove
const NOT_PINNED_MARKER: &str = "not pinned";

/// Pin service backed by the IPFS HTTP RPC API
#[derive(Clone)]
pub struct IpfsHttpPinService {
    api_url: String,
    agent: ureq::Agent,
}

impl IpfsHttpPinService {
    /// Create a client for the API at `api_url` (e.g. `http://127.0.0.1:5001`)
    ///
    /// `timeout` bounds each HTTP call; `None` waits for the daemon.
    pub fn new(api_url: impl Into<String>, timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .http_status_as_error(false)
            .build();

        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            agent: config.into(),
        }
    }

    /// Create a client from the `[ipfs]` config section
    pub fn from_config(config: &IpfsConfig) -> Self {
        let timeout = match config.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self::new(config.api_url.clone(), timeout)
    }

    /// Endpoint URL for a pin operation
    pub fn endpoint(&self, op: PinOp) -> String {
        let path = match op {
            PinOp::Add => "pin/add",
            PinOp::Remove => "pin/rm",
        };
        format!("{}/api/v0/{}", self.api_url, path)
    }

    async fn call(&self, op: PinOp, key: &ResourceKey) -> PinkeepResult<()> {
        let agent = self.agent.clone();
        let url = self.endpoint(op);
        let arg = key.to_string();

        debug!("POST {}?arg={}", url, arg);

        let (status, body) = tokio::task::spawn_blocking(move || {
            let mut response = agent.post(url.as_str()).query("arg", &arg).send_empty()?;
            let status = response.status().as_u16();
            let body = response.body_mut().read_to_string()?;
            Ok::<_, ureq::Error>((status, body))
        })
        .await
        .map_err(|e| PinkeepError::Internal(format!("pin request task failed: {}", e)))?
        .map_err(|e| PinkeepError::pin(op, key.as_str(), e))?;

        interpret_response(op, key, status, &body)
    }
}

/// Map an API response onto the idempotent pin contract
fn interpret_response(op: PinOp, key: &ResourceKey, status: u16, body: &str) -> PinkeepResult<()> {
    if (200..300).contains(&status) {
        return Ok(());
    }

    if op == PinOp::Remove && body.contains(NOT_PINNED_MARKER) {
        debug!("{} was not pinned", key);
        return Ok(());
    }

    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("Message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    Err(PinkeepError::pin(
        op,
        key.as_str(),
        format!("HTTP {}: {}", status, message),
    ))
}

#[async_trait]
impl PinService for IpfsHttpPinService {
    async fn pin_add(&self, key: &ResourceKey) -> PinkeepResult<()> {
        self.call(PinOp::Add, key).await
    }

    async fn pin_remove(&self, key: &ResourceKey) -> PinkeepResult<()> {
        self.call(PinOp::Remove, key).await
    }

    fn service_name(&self) -> &'static str {
        "IPFS HTTP API"
    }
}
