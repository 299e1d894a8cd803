//! ActionQueue - request-side API of the background action queue
//!
//! During a request, modules register task handlers and enqueue items; the
//! items collect in memory until `save()` appends them to the durable store,
//! after which `dispatch()` asks the deferred executor to start a drain pass.
//! The drain pass itself lives in `drain.rs`.

use crate::dispatch::api::{DeferredExecutor, DeferredRequest, DispatchResult};
use crate::hooks::api::{hook_name, ActionHandler, EventBus, SubscriptionId};
use crate::queue::error::QueueResult;
use crate::queue::item::{QueueItem, StoredItem};
use crate::queue::settings::{CeilingProbe, DrainBudget, QueueSettings};
use crate::queue::store::{LockRecord, QueueStore};
use crate::storage::api::KeyValueStore;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct ActionQueue {
    pub(crate) settings: QueueSettings,
    pub(crate) bus: Arc<dyn EventBus>,
    pub(crate) store: QueueStore,
    executor: Arc<dyn DeferredExecutor>,
    pending: Mutex<Vec<QueueItem>>,
    last_dispatch: Mutex<Option<DispatchResult>>,
    ceiling: Option<CeilingProbe>,
}

impl ActionQueue {
    pub fn new(
        settings: QueueSettings,
        bus: Arc<dyn EventBus>,
        kv: Arc<dyn KeyValueStore>,
        executor: Arc<dyn DeferredExecutor>,
    ) -> Self {
        let store = QueueStore::new(&settings.name, kv, settings.save_retry.clone());
        Self {
            settings,
            bus,
            store,
            executor,
            pending: Mutex::new(Vec::new()),
            last_dispatch: Mutex::new(None),
            ceiling: None,
        }
    }

    /// Attach the environment's resource ceiling probe to every drain budget
    pub fn with_ceiling_probe(mut self, probe: CeilingProbe) -> Self {
        self.ceiling = Some(probe);
        self
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    /// Bus name task handlers for `action` subscribe to
    pub fn task_hook(&self, action: &str) -> String {
        hook_name(&[self.settings.name.as_str(), action])
    }

    /// Entry point target that runs a drain pass for this queue
    pub fn drain_target(&self) -> String {
        hook_name(&[self.settings.name.as_str(), "drain"])
    }

    /// Hook fired once a pass leaves the queue empty
    pub fn complete_hook(&self) -> String {
        hook_name(&[self.settings.name.as_str(), "complete"])
    }

    /// Budget for one pass: the configured limits plus the ceiling probe
    pub fn budget(&self) -> DrainBudget {
        let budget = self.settings.budget();
        match &self.ceiling {
            Some(probe) => budget.with_ceiling(probe.clone()),
            None => budget,
        }
    }

    pub fn register_task(&self, action: &str, handler: ActionHandler, priority: i32) -> SubscriptionId {
        let hook = self.task_hook(action);
        log::debug!("Task registered on '{}' at priority {}", hook, priority);
        self.bus.add_action(&hook, priority, handler)
    }

    pub fn has_task(&self, action: &str) -> bool {
        self.bus.has_action(&self.task_hook(action))
    }

    /// Queue `action` for the next drain if a handler is registered for it
    pub fn enqueue(&self, action: &str, args: Vec<Value>) -> bool {
        if !self.has_task(action) {
            log::debug!(
                "Not queueing '{}': no task registered on '{}'",
                action,
                self.task_hook(action)
            );
            return false;
        }
        self.pending_guard().push(QueueItem::new(action, args));
        log::trace!("Queued '{}' on '{}'", action, self.settings.name);
        true
    }

    /// Enqueue `action` and each `action/<sub_action>` independently
    ///
    /// Returns how many of the candidates were accepted.
    pub fn enqueue_with_fanout(&self, action: &str, args: Vec<Value>, sub_actions: &[&str]) -> usize {
        let mut accepted = usize::from(self.enqueue(action, args.clone()));
        for sub_action in sub_actions.iter().filter(|sub| !sub.is_empty()) {
            let derived = format!("{action}/{sub_action}");
            if self.enqueue(&derived, args.clone()) {
                accepted += 1;
            }
        }
        accepted
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_guard().is_empty()
    }

    pub fn pending_items(&self) -> Vec<QueueItem> {
        self.pending_guard().clone()
    }

    /// Append the pending batch to the durable store
    ///
    /// On failure the batch is kept in memory so a later `save()` can retry.
    pub async fn save(&self) -> QueueResult<usize> {
        let batch = std::mem::take(&mut *self.pending_guard());
        if batch.is_empty() {
            return Ok(0);
        }

        match self.store.append(&batch).await {
            Ok(sequences) => {
                log::debug!(
                    "Saved {} item(s) to queue '{}' (sequences {:?})",
                    batch.len(),
                    self.settings.name,
                    sequences
                );
                Ok(batch.len())
            }
            Err(e) => {
                let mut pending = self.pending_guard();
                let newer = std::mem::take(&mut *pending);
                *pending = batch.into_iter().chain(newer).collect();
                Err(e)
            }
        }
    }

    /// Ask the executor to start a drain pass; never fails
    pub async fn dispatch(&self) -> DispatchResult {
        let request = DeferredRequest::new(
            self.drain_target(),
            json!({ "queue": self.settings.name }),
        );
        let result = self.executor.trigger(request).await;
        match &result {
            DispatchResult::Failed { reason } => log::warn!(
                "Could not dispatch queue '{}': {} (items stay stored)",
                self.settings.name,
                reason
            ),
            other => log::debug!("Queue '{}' dispatch: {}", self.settings.name, other),
        }
        *self
            .last_dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(result.clone());
        result
    }

    /// Save pending items and dispatch when anything was saved
    pub async fn save_and_dispatch(&self) -> QueueResult<DispatchResult> {
        if self.save().await? == 0 {
            return Ok(DispatchResult::Skipped);
        }
        Ok(self.dispatch().await)
    }

    /// Dispatch if items are stored and no live drain holds the lock
    pub async fn healthcheck(&self) -> QueueResult<DispatchResult> {
        if self.store.is_empty().await? {
            return Ok(DispatchResult::Skipped);
        }
        if let Some(lock) = self.store.active_lock().await? {
            log::debug!(
                "Healthcheck: queue '{}' is being drained by {}",
                self.settings.name,
                lock.owner
            );
            return Ok(DispatchResult::Skipped);
        }
        log::info!("Healthcheck: restarting drain of queue '{}'", self.settings.name);
        Ok(self.dispatch().await)
    }

    /// Run `healthcheck` every `interval` until the queue is dropped
    pub fn spawn_healthcheck(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let queue: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(queue) = queue.upgrade() else {
                    break;
                };
                if let Err(e) = queue.healthcheck().await {
                    log::error!("Healthcheck of queue '{}' failed: {}", queue.name(), e);
                }
            }
        })
    }

    pub async fn stored_items(&self) -> QueueResult<Vec<StoredItem>> {
        self.store.items().await
    }

    /// The live drain lock, if a pass is running
    pub async fn is_processing(&self) -> QueueResult<Option<LockRecord>> {
        self.store.active_lock().await
    }

    /// Drop every stored and pending item
    pub async fn clear(&self) -> QueueResult<usize> {
        let pending = std::mem::take(&mut *self.pending_guard()).len();
        let stored = self.store.clear().await?;
        log::info!(
            "Cleared queue '{}': {} stored, {} pending",
            self.settings.name,
            stored,
            pending
        );
        Ok(stored + pending)
    }

    pub fn last_dispatch(&self) -> Option<DispatchResult> {
        self.last_dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn pending_guard(&self) -> std::sync::MutexGuard<'_, Vec<QueueItem>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
