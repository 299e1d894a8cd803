//! Shared fixtures for queue tests

use crate::dispatch::api::{DeferredExecutor, DeferredRequest, DispatchResult};
use crate::hooks::api::{action, ActionHandler, HookManager};
use crate::queue::api::*;
use crate::storage::api::{KeyValueStore, MemoryStore, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Executor that records requests instead of running them
pub(super) struct RecordingExecutor {
    pub requests: Mutex<Vec<DeferredRequest>>,
    result: DispatchResult,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::returning(DispatchResult::Dispatched)
    }

    pub fn returning(result: DispatchResult) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            result,
        }
    }

    pub fn targets(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.target.clone())
            .collect()
    }
}

#[async_trait]
impl DeferredExecutor for RecordingExecutor {
    async fn trigger(&self, request: DeferredRequest) -> DispatchResult {
        self.requests.lock().unwrap().push(request);
        self.result.clone()
    }
}

/// One execution context: its own bus, sharing durable storage
pub(super) struct Harness {
    pub bus: Arc<HookManager>,
    pub kv: Arc<dyn KeyValueStore>,
    pub executor: Arc<RecordingExecutor>,
    pub queue: Arc<ActionQueue>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(QueueSettings::default(), Arc::new(MemoryStore::new()))
    }

    pub fn with(settings: QueueSettings, kv: Arc<dyn KeyValueStore>) -> Self {
        let bus = Arc::new(HookManager::new());
        let executor = Arc::new(RecordingExecutor::new());
        let queue = Arc::new(ActionQueue::new(
            settings,
            bus.clone(),
            kv.clone(),
            executor.clone(),
        ));
        Self {
            bus,
            kv,
            executor,
            queue,
        }
    }

    /// A new context over the same store, with no handlers registered
    pub fn next_context(&self) -> Self {
        Self::with(self.queue.settings().clone(), self.kv.clone())
    }
}

pub(super) type Calls = Arc<Mutex<Vec<Vec<Value>>>>;

pub(super) fn calls() -> Calls {
    Arc::new(Mutex::new(Vec::new()))
}

pub(super) fn recording_handler(calls: &Calls) -> ActionHandler {
    let calls = calls.clone();
    action(move |args: &[Value]| {
        calls.lock().unwrap().push(args.to_vec());
        Ok(())
    })
}

/// Memory store whose nth compare-and-swap on one key fails like a crash
pub(super) struct CrashingStore {
    inner: MemoryStore,
    key: String,
    swaps: AtomicUsize,
    fail_at: AtomicUsize,
}

impl CrashingStore {
    pub fn new(key: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            key: key.to_string(),
            swaps: AtomicUsize::new(0),
            fail_at: AtomicUsize::new(usize::MAX),
        }
    }

    /// Fail the `nth` swap on the key from now on (1-based)
    pub fn arm(&self, nth: usize) {
        self.swaps.store(0, Ordering::SeqCst);
        self.fail_at.store(nth, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.fail_at.store(usize::MAX, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for CrashingStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.inner.delete(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: Option<String>,
    ) -> StorageResult<bool> {
        if key == self.key {
            let n = self.swaps.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_at.load(Ordering::SeqCst) {
                return Err(StorageError::Io {
                    key: key.to_string(),
                    source: std::io::Error::other("simulated crash"),
                });
            }
        }
        self.inner.compare_and_swap(key, expected, new).await
    }
}

/// Memory store where another writer appends an item right before our swap
pub(super) struct InterferingStore {
    inner: MemoryStore,
    key: String,
    interferences: AtomicUsize,
}

impl InterferingStore {
    pub fn new(key: &str, interferences: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            key: key.to_string(),
            interferences: AtomicUsize::new(interferences),
        }
    }

    async fn foreign_append(&self) {
        let mut document: QueueDocument = match self.inner.get(&self.key).await.unwrap() {
            Some(raw) => serde_json::from_str(&raw).unwrap(),
            None => QueueDocument::default(),
        };
        document.next_sequence += 1;
        document.revision += 1;
        document.items.push(StoredItem {
            sequence: document.next_sequence,
            queued_at: Utc::now(),
            item: QueueItem::new("foreign", vec![]),
        });
        self.inner
            .set(&self.key, serde_json::to_string(&document).unwrap())
            .await
            .unwrap();
    }
}

#[async_trait]
impl KeyValueStore for InterferingStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.inner.delete(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: Option<String>,
    ) -> StorageResult<bool> {
        if key == self.key
            && self
                .interferences
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            self.foreign_append().await;
        }
        self.inner.compare_and_swap(key, expected, new).await
    }
}
