//! Bulk population: seed one queue item per host record

use crate::hooks::api::{action, ActionHandler, SubscriptionId, DEFAULT_PRIORITY};
use crate::queue::manager::ActionQueue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A host record as handed to bulk tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Record {
    pub fn new(id: u64, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            data: Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub kind: String,
    pub limit: Option<usize>,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            kind: "post".to_string(),
            limit: None,
        }
    }
}

impl RecordQuery {
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            limit: None,
        }
    }
}

/// Host-defined collection of records
pub trait RecordSource: Send + Sync {
    fn find(&self, query: &RecordQuery) -> Vec<Record>;
}

/// Fixed in-memory record list
#[derive(Debug, Clone, Default)]
pub struct StaticRecords {
    records: Vec<Record>,
}

impl StaticRecords {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl RecordSource for StaticRecords {
    fn find(&self, query: &RecordQuery) -> Vec<Record> {
        self.records
            .iter()
            .filter(|record| record.kind == query.kind)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

impl ActionQueue {
    /// When `trigger_hook` fires, enqueue `task_action` once per matching record
    ///
    /// Each item's single argument is the record as JSON.
    pub fn add_bulk_population(
        self: &Arc<Self>,
        trigger_hook: &str,
        task_action: &str,
        query: RecordQuery,
        source: Arc<dyn RecordSource>,
    ) -> SubscriptionId {
        let queue = Arc::downgrade(self);
        let task_action = task_action.to_string();

        self.bus.add_action(
            trigger_hook,
            DEFAULT_PRIORITY,
            action(move |_args: &[Value]| {
                let Some(queue) = queue.upgrade() else {
                    log::warn!("Bulk action '{}' fired after its queue was dropped", task_action);
                    return Ok(());
                };
                let records = source.find(&query);
                let accepted = records
                    .into_iter()
                    .filter_map(|record| serde_json::to_value(record).ok())
                    .filter(|payload| queue.enqueue(&task_action, vec![payload.clone()]))
                    .count();
                log::info!(
                    "Queued '{}' for {} '{}' record(s)",
                    task_action,
                    accepted,
                    query.kind
                );
                Ok(())
            }),
        )
    }

    /// Register `handler` on `task_action` and seed it from `source` whenever
    /// `trigger_hook` fires
    pub fn add_bulk_task(
        self: &Arc<Self>,
        trigger_hook: &str,
        task_action: &str,
        handler: ActionHandler,
        priority: i32,
        query: RecordQuery,
        source: Arc<dyn RecordSource>,
    ) -> SubscriptionId {
        self.register_task(task_action, handler, priority);
        self.add_bulk_population(trigger_hook, task_action, query, source)
    }
}
