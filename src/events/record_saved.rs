//! Queue event for saved host records
//!
//! The host fires `hookwork/record_saved` with the record as its first
//! argument. Each save is queued as `after_save_record` and fanned out to
//! `after_save_record/<kind>`, so consumers can subscribe to all records or
//! to one kind only.

use crate::hooks::api::{action, hook_name, EventBus, HookError, SubscriptionId, DEFAULT_PRIORITY};
use crate::queue::api::ActionQueue;
use serde_json::{json, Value};
use std::sync::Arc;

/// Host hook suffix announcing a saved record
pub const RECORD_SAVED_HOOK: &str = "record_saved";

pub struct RecordSavedEvent {
    queue: Arc<ActionQueue>,
}

impl RecordSavedEvent {
    pub const HOOK_SUFFIX: &'static str = "after_save_record";

    pub fn new(queue: Arc<ActionQueue>) -> Self {
        Self { queue }
    }

    /// Enqueue one save; returns how many actions accepted it
    pub fn on_record_saved(&self, record_id: u64, kind: &str) -> usize {
        self.queue.enqueue_with_fanout(
            Self::HOOK_SUFFIX,
            vec![json!({ "record_id": record_id })],
            &[kind],
        )
    }

    /// Subscribe to the host's `record_saved` hook
    ///
    /// Autosaves and revisions are ignored.
    pub fn listen(self: &Arc<Self>, bus: &dyn EventBus) -> SubscriptionId {
        let event = Arc::downgrade(self);
        bus.add_action(
            &hook_name(&[RECORD_SAVED_HOOK]),
            DEFAULT_PRIORITY,
            action(move |args: &[Value]| {
                let Some(event) = event.upgrade() else {
                    log::warn!("Ignoring '{}': its queue event has been dropped", RECORD_SAVED_HOOK);
                    return Ok(());
                };
                let record = args
                    .first()
                    .ok_or_else(|| HookError::invalid_args("missing record"))?;
                let id = record
                    .get("id")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| HookError::invalid_args("record without numeric 'id'"))?;
                let kind = record.get("kind").and_then(Value::as_str).unwrap_or("post");

                if kind == "revision" || record.get("autosave").and_then(Value::as_bool) == Some(true) {
                    log::trace!("Ignoring autosave/revision of record {}", id);
                    return Ok(());
                }
                event.on_record_saved(id, kind);
                Ok(())
            }),
        )
    }
}
