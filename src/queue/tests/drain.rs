use super::support::*;
use crate::dispatch::api::{DispatchResult, EntryPoints, TaskExecutor};
use crate::hooks::api::{action, EventBus, HookError, HookManager, DEFAULT_PRIORITY};
use crate::queue::api::*;
use crate::storage::api::MemoryStore;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn seed(harness: &Harness, action: &str, args: &[Value]) {
    for arg in args {
        assert!(harness.queue.enqueue(action, vec![arg.clone()]));
    }
    harness.queue.save().await.unwrap();
}

#[tokio::test]
async fn test_drain_runs_handlers_in_fifo_order_and_completes() {
    let harness = Harness::new();
    let calls = calls();
    harness
        .queue
        .register_task("index", recording_handler(&calls), DEFAULT_PRIORITY);
    seed(&harness, "index", &[json!(1), json!(2), json!(3)]).await;

    let completed = Arc::new(AtomicUsize::new(0));
    let counter = completed.clone();
    harness.bus.add_action(
        &harness.queue.complete_hook(),
        DEFAULT_PRIORITY,
        action(move |_args: &[Value]| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
    );

    let report = harness.queue.drain(&DrainBudget::unlimited()).await.unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.remaining, 0);
    assert_eq!(report.outcome, DrainOutcome::Completed);
    assert_eq!(
        *calls.lock().unwrap(),
        vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]]
    );
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert!(harness.queue.stored_items().await.unwrap().is_empty());
    assert!(harness.queue.is_processing().await.unwrap().is_none());
}

#[tokio::test]
async fn test_handlers_run_in_priority_order_per_item() {
    let harness = Harness::new();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    for (label, priority) in [("late", 20), ("early", 5)] {
        let order = order.clone();
        harness.queue.register_task(
            "a",
            action(move |_args: &[Value]| {
                order.lock().unwrap().push(label);
                Ok(())
            }),
            priority,
        );
    }
    seed(&harness, "a", &[json!(null)]).await;

    harness.queue.drain(&DrainBudget::unlimited()).await.unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["early", "late"]);
}

#[tokio::test]
async fn test_item_without_handler_in_drain_context_is_discarded() {
    let request = Harness::new();
    let calls = calls();
    request
        .queue
        .register_task("foo", recording_handler(&calls), DEFAULT_PRIORITY);
    seed(&request, "foo", &[json!("payload")]).await;

    // The drain context never registers "foo"
    let drain = request.next_context();
    let report = drain.queue.drain(&DrainBudget::unlimited()).await.unwrap();

    assert_eq!(report.discarded, 1);
    assert_eq!(report.processed, 0);
    assert!(calls.lock().unwrap().is_empty());
    assert!(drain.queue.stored_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failing_handler_is_logged_removed_and_drain_continues() {
    let harness = Harness::new();
    let calls = calls();
    harness.queue.register_task(
        "broken",
        action(|_args: &[Value]| Err(HookError::failed("boom"))),
        DEFAULT_PRIORITY,
    );
    harness
        .queue
        .register_task("ok", recording_handler(&calls), DEFAULT_PRIORITY);
    seed(&harness, "broken", &[json!(1)]).await;
    seed(&harness, "ok", &[json!(2)]).await;

    let report = harness.queue.drain(&DrainBudget::unlimited()).await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.processed, 1);
    assert_eq!(*calls.lock().unwrap(), vec![vec![json!(2)]]);
    assert!(harness.queue.stored_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_crash_after_first_checkpoint_keeps_second_item() {
    let kv = Arc::new(CrashingStore::new("hookwork/background_queue/items"));
    let harness = Harness::with(QueueSettings::default(), kv.clone());
    let calls = calls();
    harness
        .queue
        .register_task("work", recording_handler(&calls), DEFAULT_PRIORITY);
    seed(&harness, "work", &[json!(1), json!(2)]).await;

    // Swap 1 is the checkpoint after item 1, swap 2 the one after item 2
    kv.arm(2);
    assert!(harness.queue.drain(&DrainBudget::unlimited()).await.is_err());

    let left: Vec<Value> = harness
        .queue
        .stored_items()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.item.args[0].clone())
        .collect();
    assert_eq!(left, vec![json!(2)]);
    assert!(harness.queue.is_processing().await.unwrap().is_none());

    kv.disarm();
    let report = harness.queue.drain(&DrainBudget::unlimited()).await.unwrap();
    assert_eq!(report.processed, 1);
    assert!(harness.queue.stored_items().await.unwrap().is_empty());

    // Item 1 ran once, item 2 ran again after the crash
    assert_eq!(
        *calls.lock().unwrap(),
        vec![vec![json!(1)], vec![json!(2)], vec![json!(2)]]
    );
}

#[tokio::test]
async fn test_checkpoint_interval_batches_removals() {
    let settings = QueueSettings {
        checkpoint_interval: 2,
        ..QueueSettings::default()
    };
    let harness = Harness::with(settings, Arc::new(MemoryStore::new()));
    let calls = calls();
    harness
        .queue
        .register_task("a", recording_handler(&calls), DEFAULT_PRIORITY);
    seed(&harness, "a", &[json!(1), json!(2), json!(3)]).await;

    let report = harness.queue.drain(&DrainBudget::unlimited()).await.unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.remaining, 0);
    assert_eq!(calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_live_lock_blocks_second_drain() {
    let harness = Harness::new();
    let calls = calls();
    harness
        .queue
        .register_task("a", recording_handler(&calls), DEFAULT_PRIORITY);
    seed(&harness, "a", &[json!(1)]).await;

    assert!(harness
        .queue
        .store()
        .acquire_lock("other-pass", Duration::from_secs(60))
        .await
        .unwrap());

    let report = harness.queue.drain(&DrainBudget::unlimited()).await.unwrap();
    assert_eq!(report.outcome, DrainOutcome::Locked);
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(harness.queue.stored_items().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_expired_lock_is_taken_over() {
    let harness = Harness::new();
    let calls = calls();
    harness
        .queue
        .register_task("a", recording_handler(&calls), DEFAULT_PRIORITY);
    seed(&harness, "a", &[json!(1)]).await;

    harness
        .queue
        .store()
        .acquire_lock("crashed-pass", Duration::ZERO)
        .await
        .unwrap();

    let report = harness.queue.drain(&DrainBudget::unlimited()).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.outcome, DrainOutcome::Completed);
}

#[tokio::test]
async fn test_budget_exhaustion_redispatches_remainder() {
    let harness = Harness::new();
    let calls = calls();
    harness
        .queue
        .register_task("a", recording_handler(&calls), DEFAULT_PRIORITY);
    seed(&harness, "a", &[json!(1), json!(2), json!(3)]).await;
    let dispatched_before = harness.executor.targets().len();

    let report = harness
        .queue
        .drain(&DrainBudget::unlimited().with_max_items(2))
        .await
        .unwrap();

    assert!(report.budget_exhausted);
    assert_eq!(report.processed, 2);
    assert_eq!(report.remaining, 1);
    assert_eq!(
        report.outcome,
        DrainOutcome::Chained {
            redispatch: DispatchResult::Dispatched
        }
    );
    assert_eq!(harness.executor.targets().len(), dispatched_before + 1);
    assert!(harness.queue.is_processing().await.unwrap().is_none());
}

#[tokio::test]
async fn test_ceiling_probe_stops_pass() {
    let harness = Harness::new();
    harness
        .queue
        .register_task("a", recording_handler(&calls()), DEFAULT_PRIORITY);
    seed(&harness, "a", &[json!(1), json!(2)]).await;

    let budget = DrainBudget::unlimited().with_ceiling(Arc::new(|| true));
    let report = harness.queue.drain(&budget).await.unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.remaining, 1);
    assert!(report.budget_exhausted);
}

#[tokio::test]
async fn test_healthcheck() {
    let harness = Harness::new();
    assert_eq!(
        harness.queue.healthcheck().await.unwrap(),
        DispatchResult::Skipped
    );

    harness
        .queue
        .register_task("a", recording_handler(&calls()), DEFAULT_PRIORITY);
    seed(&harness, "a", &[json!(1)]).await;

    harness
        .queue
        .store()
        .acquire_lock("running", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(
        harness.queue.healthcheck().await.unwrap(),
        DispatchResult::Skipped
    );

    harness.queue.store().release_lock("running").await.unwrap();
    assert_eq!(
        harness.queue.healthcheck().await.unwrap(),
        DispatchResult::Dispatched
    );
}

#[tokio::test]
async fn test_task_executor_chains_passes_until_empty() {
    let bus = Arc::new(HookManager::new());
    let entry_points = EntryPoints::new();
    let executor = Arc::new(TaskExecutor::new(entry_points.clone()));
    let settings = QueueSettings {
        max_items_per_pass: Some(1),
        ..QueueSettings::default()
    };
    let queue = Arc::new(ActionQueue::new(
        settings,
        bus.clone(),
        Arc::new(MemoryStore::new()),
        executor.clone(),
    ));
    queue.register_entry_point(&entry_points);

    let calls = calls();
    queue.register_task("a", recording_handler(&calls), DEFAULT_PRIORITY);
    for n in 0..3 {
        queue.enqueue("a", vec![json!(n)]);
    }

    assert_eq!(
        queue.save_and_dispatch().await.unwrap(),
        DispatchResult::Dispatched
    );
    executor.wait_idle().await;

    assert_eq!(calls.lock().unwrap().len(), 3);
    assert!(queue.stored_items().await.unwrap().is_empty());
    assert!(bus.has_action("hookwork/background_queue/a"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_handler_keeps_lock_against_overlapping_pass() {
    let settings = QueueSettings {
        time_limit: Duration::from_millis(50),
        lock_ttl: Duration::from_millis(100),
        ..QueueSettings::default()
    };
    let first = Harness::with(settings, Arc::new(MemoryStore::new()));
    let second = first.next_context();

    let hits = Arc::new(AtomicUsize::new(0));
    for harness in [&first, &second] {
        let hits = hits.clone();
        harness.queue.register_task(
            "slow",
            action(move |_args: &[Value]| {
                hits.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(400));
                Ok(())
            }),
            DEFAULT_PRIORITY,
        );
    }
    seed(&first, "slow", &[json!(1)]).await;

    let budget = DrainBudget::unlimited();
    let (a, b) = tokio::join!(first.queue.drain(&budget), async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        second.queue.drain(&DrainBudget::unlimited()).await
    });

    let a = a.unwrap();
    assert_eq!(a.processed, 1);
    assert_eq!(a.outcome, DrainOutcome::Completed);
    assert_eq!(b.unwrap().outcome, DrainOutcome::Locked);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(first.queue.stored_items().await.unwrap().is_empty());
    assert!(first.queue.is_processing().await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pass_stops_without_checkpoint_after_takeover() {
    let harness = Harness::new();
    let store = harness.queue.store().clone();
    let kv = harness.kv.clone();
    let runtime = tokio::runtime::Handle::current();
    let calls = calls();
    let recorded = calls.clone();
    harness.queue.register_task(
        "work",
        action(move |args: &[Value]| {
            recorded.lock().unwrap().push(args.to_vec());
            // Another pass takes over as if our lock had expired
            runtime.block_on(async {
                kv.delete("hookwork/background_queue/lock").await.unwrap();
                assert!(store
                    .acquire_lock("successor", Duration::from_secs(60))
                    .await
                    .unwrap());
            });
            Ok(())
        }),
        DEFAULT_PRIORITY,
    );
    seed(&harness, "work", &[json!(1), json!(2)]).await;
    let dispatched_before = harness.executor.targets().len();

    let report = harness.queue.drain(&DrainBudget::unlimited()).await.unwrap();

    assert_eq!(report.outcome, DrainOutcome::LockLost);
    assert_eq!(report.processed, 1);
    assert_eq!(report.remaining, 2);
    assert_eq!(*calls.lock().unwrap(), vec![vec![json!(1)]]);
    assert_eq!(harness.executor.targets().len(), dispatched_before);
    let holder = harness.queue.is_processing().await.unwrap().unwrap();
    assert_eq!(holder.owner, "successor");
}

#[tokio::test]
async fn test_panicking_task_is_counted_as_failure_and_removed() {
    let harness = Harness::new();
    let calls = calls();
    harness.queue.register_task(
        "explodes",
        action(|_args: &[Value]| panic!("task bug")),
        DEFAULT_PRIORITY,
    );
    harness
        .queue
        .register_task("ok", recording_handler(&calls), DEFAULT_PRIORITY);
    seed(&harness, "explodes", &[json!(1)]).await;
    seed(&harness, "ok", &[json!(2)]).await;

    let report = harness.queue.drain(&DrainBudget::unlimited()).await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.processed, 1);
    assert_eq!(report.outcome, DrainOutcome::Completed);
    assert_eq!(*calls.lock().unwrap(), vec![vec![json!(2)]]);
    assert!(harness.queue.stored_items().await.unwrap().is_empty());
    assert!(harness.queue.is_processing().await.unwrap().is_none());
}
