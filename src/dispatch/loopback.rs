//! Loopback HTTP backend for deferred execution
//!
//! Posts `{target, payload}` to an endpoint on the host itself and only waits
//! for the handoff. A request that times out after being sent is treated as
//! dispatched: the host keeps processing it after the client gives up.

use crate::dispatch::error::DispatchError;
use crate::dispatch::traits::{DeferredExecutor, DeferredRequest, DispatchResult};
use async_trait::async_trait;
use std::time::Duration;

pub const DEFAULT_HANDOFF_TIMEOUT: Duration = Duration::from_millis(500);

/// Header carrying the shared secret, when one is configured
const TOKEN_HEADER: &str = "x-hookwork-token";

/// Body of a loopback call, as the receiving endpoint decodes it
pub type LoopbackRequest = DeferredRequest;

#[derive(Debug, Clone)]
pub struct LoopbackExecutor {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    handoff_timeout: Duration,
    token: Option<String>,
}

impl LoopbackExecutor {
    pub fn new(endpoint: &str) -> Result<Self, DispatchError> {
        let endpoint = reqwest::Url::parse(endpoint).map_err(|e| DispatchError::Client {
            message: format!("invalid endpoint '{endpoint}': {e}"),
        })?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| DispatchError::Client {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            endpoint,
            handoff_timeout: DEFAULT_HANDOFF_TIMEOUT,
            token: None,
        })
    }

    pub fn with_handoff_timeout(mut self, timeout: Duration) -> Self {
        self.handoff_timeout = timeout;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[async_trait]
impl DeferredExecutor for LoopbackExecutor {
    async fn trigger(&self, request: DeferredRequest) -> DispatchResult {
        let mut call = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.handoff_timeout)
            .json(&request);
        if let Some(token) = &self.token {
            call = call.header(TOKEN_HEADER, token);
        }

        match call.send().await {
            Ok(response) if response.status().is_success() => DispatchResult::Dispatched,
            Ok(response) => {
                log::warn!(
                    "Loopback dispatch of '{}' rejected with {}",
                    request.target,
                    response.status()
                );
                DispatchResult::failed(format!("endpoint returned {}", response.status()))
            }
            Err(e) if e.is_timeout() => {
                log::debug!(
                    "Loopback dispatch of '{}' handed off (timed out waiting for response)",
                    request.target
                );
                DispatchResult::Dispatched
            }
            Err(e) => {
                log::warn!("Loopback dispatch of '{}' failed: {}", request.target, e);
                DispatchResult::failed(e.to_string())
            }
        }
    }
}
