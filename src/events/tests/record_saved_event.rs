use crate::dispatch::api::{EntryPoints, TaskExecutor};
use crate::events::api::*;
use crate::hooks::api::*;
use crate::queue::api::{ActionQueue, QueueSettings};
use crate::storage::api::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;

fn queue(bus: &Arc<HookManager>) -> Arc<ActionQueue> {
    Arc::new(ActionQueue::new(
        QueueSettings::default(),
        bus.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(TaskExecutor::new(EntryPoints::new())),
    ))
}

fn noop() -> ActionHandler {
    action(|_args: &[Value]| Ok(()))
}

#[test]
fn test_save_fans_out_to_kind() {
    let bus = Arc::new(HookManager::new());
    let queue = queue(&bus);
    queue.register_task("after_save_record", noop(), DEFAULT_PRIORITY);
    queue.register_task("after_save_record/page", noop(), DEFAULT_PRIORITY);

    let event = RecordSavedEvent::new(queue.clone());
    assert_eq!(event.on_record_saved(12, "page"), 2);
    assert_eq!(event.on_record_saved(13, "post"), 1);

    let actions: Vec<String> = queue
        .pending_items()
        .into_iter()
        .map(|item| item.action)
        .collect();
    assert_eq!(
        actions,
        vec!["after_save_record", "after_save_record/page", "after_save_record"]
    );
    assert_eq!(queue.pending_items()[0].args, vec![json!({"record_id": 12})]);
}

#[test]
fn test_listens_on_host_hook_and_skips_autosaves() {
    let bus = Arc::new(HookManager::new());
    let queue = queue(&bus);
    queue.register_task("after_save_record/post", noop(), DEFAULT_PRIORITY);

    let event = Arc::new(RecordSavedEvent::new(queue.clone()));
    event.listen(&*bus);

    let hook = hook_name(&[RECORD_SAVED_HOOK]);
    bus.do_action(&hook, &[json!({"id": 1, "kind": "post"})]);
    bus.do_action(&hook, &[json!({"id": 2, "kind": "post", "autosave": true})]);
    bus.do_action(&hook, &[json!({"id": 3, "kind": "revision"})]);

    let pending = queue.pending_items();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].args, vec![json!({"record_id": 1})]);
}

#[test]
fn test_malformed_record_is_reported_as_hook_failure() {
    let bus = Arc::new(HookManager::new());
    let event = Arc::new(RecordSavedEvent::new(queue(&bus)));
    event.listen(&*bus);

    let outcome = bus.do_action(&hook_name(&[RECORD_SAVED_HOOK]), &[json!({"kind": "post"})]);
    assert_eq!(outcome.failures.len(), 1);
    assert!(matches!(
        outcome.failures[0].error,
        HookError::InvalidArgs { .. }
    ));
}
