//! Queue items as callers create them and as the store keeps them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of deferred work: an action name and its positional arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub action: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl QueueItem {
    pub fn new(action: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            action: action.into(),
            args,
        }
    }
}

/// A durably stored item; `sequence` is assigned by the store and only grows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub sequence: u64,
    pub queued_at: DateTime<Utc>,
    #[serde(flatten)]
    pub item: QueueItem,
}
