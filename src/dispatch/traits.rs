//! Deferred execution port

use crate::dispatch::error::DispatchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One out-of-band call: the entry point to run and its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredRequest {
    pub target: String,
    #[serde(default)]
    pub payload: Value,
}

impl DeferredRequest {
    pub fn new(target: impl Into<String>, payload: Value) -> Self {
        Self {
            target: target.into(),
            payload,
        }
    }
}

/// Outcome of *triggering* an out-of-band pass, never of the pass itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Dispatched,
    /// Nothing to do, no call was made
    Skipped,
    Failed {
        reason: String,
    },
}

impl DispatchResult {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DispatchResult::Dispatched)
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        DispatchResult::Failed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DispatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchResult::Dispatched => write!(f, "dispatched"),
            DispatchResult::Skipped => write!(f, "skipped"),
            DispatchResult::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Receiving side of a deferred request
#[async_trait]
pub trait EntryPoint: Send + Sync {
    async fn run(&self, payload: Value) -> Result<(), DispatchError>;
}

/// Sending side: hands a request to another execution context
///
/// `trigger` must not wait for the deferred work and must not return an
/// error; transport problems become [`DispatchResult::Failed`].
#[async_trait]
pub trait DeferredExecutor: Send + Sync {
    async fn trigger(&self, request: DeferredRequest) -> DispatchResult;
}
