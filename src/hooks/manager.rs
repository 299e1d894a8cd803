//! In-process event bus

use crate::hooks::error::{HookError, HookResult};
use crate::hooks::traits::{
    ActionHandler, ActionOutcome, EventBus, FilterHandler, HookFailure, SubscriptionId,
};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

struct Subscription<H> {
    id: SubscriptionId,
    priority: i32,
    handler: H,
}

type SubscriptionMap<H> = RwLock<HashMap<String, Vec<Subscription<H>>>>;

/// [`EventBus`] backed by in-memory subscriber lists
///
/// Handlers are cloned out of the lock before they run, so a handler may
/// register or invoke other hooks without deadlocking.
pub struct HookManager {
    actions: SubscriptionMap<ActionHandler>,
    filters: SubscriptionMap<FilterHandler>,
    next_id: AtomicU64,
}

impl Default for HookManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HookManager {
    pub fn new() -> Self {
        Self {
            actions: RwLock::new(HashMap::new()),
            filters: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of action subscribers on `name`
    pub fn action_count(&self, name: &str) -> usize {
        let actions = self.actions.read().unwrap_or_else(PoisonError::into_inner);
        actions.get(name).map_or(0, Vec::len)
    }

    /// Names with at least one action subscriber, sorted
    pub fn action_names(&self) -> Vec<String> {
        let actions = self.actions.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = actions
            .iter()
            .filter(|(_, subs)| !subs.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

fn insert_sorted<H>(map: &SubscriptionMap<H>, name: &str, subscription: Subscription<H>) {
    let mut map = map.write().unwrap_or_else(PoisonError::into_inner);
    let list = map.entry(name.to_string()).or_default();
    // After every subscriber with priority <= ours: FIFO among equals
    let position = list
        .iter()
        .position(|existing| existing.priority > subscription.priority)
        .unwrap_or(list.len());
    list.insert(position, subscription);
}

fn snapshot<H: Clone>(map: &SubscriptionMap<H>, name: &str) -> Vec<(SubscriptionId, H)> {
    let map = map.read().unwrap_or_else(PoisonError::into_inner);
    map.get(name)
        .map(|list| {
            list.iter()
                .map(|sub| (sub.id, sub.handler.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

/// Run one subscriber, turning a panic into [`HookError::Panicked`]
fn guarded<T>(name: &str, id: SubscriptionId, run: impl FnOnce() -> HookResult<T>) -> HookResult<T> {
    catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|payload| {
        let message = panic_message(payload);
        log::error!("Subscriber {:?} on '{}' panicked: {}", id, name, message);
        Err(HookError::Panicked { message })
    })
}

impl EventBus for HookManager {
    fn add_action(&self, name: &str, priority: i32, handler: ActionHandler) -> SubscriptionId {
        let id = self.allocate_id();
        insert_sorted(
            &self.actions,
            name,
            Subscription {
                id,
                priority,
                handler,
            },
        );
        log::trace!("Action '{}' subscribed at priority {} ({:?})", name, priority, id);
        id
    }

    fn remove_action(&self, name: &str, id: SubscriptionId) -> bool {
        let mut actions = self.actions.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = actions.get_mut(name) else {
            return false;
        };
        let before = list.len();
        list.retain(|sub| sub.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            actions.remove(name);
        }
        removed
    }

    fn has_action(&self, name: &str) -> bool {
        self.action_count(name) > 0
    }

    fn do_action(&self, name: &str, args: &[Value]) -> ActionOutcome {
        let handlers = snapshot(&self.actions, name);
        let mut outcome = ActionOutcome::default();

        for (id, handler) in handlers {
            outcome.invoked += 1;
            if let Err(error) = guarded(name, id, || handler(args)) {
                log::debug!("Action '{}' subscriber {:?} failed: {}", name, id, error);
                outcome.failures.push(HookFailure {
                    hook: name.to_string(),
                    subscription: id,
                    error,
                });
            }
        }

        outcome
    }

    fn add_filter(&self, name: &str, priority: i32, handler: FilterHandler) -> SubscriptionId {
        let id = self.allocate_id();
        insert_sorted(
            &self.filters,
            name,
            Subscription {
                id,
                priority,
                handler,
            },
        );
        id
    }

    fn has_filter(&self, name: &str) -> bool {
        let filters = self.filters.read().unwrap_or_else(PoisonError::into_inner);
        filters.get(name).is_some_and(|list| !list.is_empty())
    }

    fn apply_filters(&self, name: &str, value: Value, args: &[Value]) -> Value {
        snapshot(&self.filters, name)
            .into_iter()
            .fold(value, |current, (id, handler)| {
                match guarded(name, id, || handler(current.clone(), args)) {
                    Ok(next) => next,
                    Err(error) => {
                        log::warn!("Filter '{}' subscriber {:?} failed: {}", name, id, error);
                        current
                    }
                }
            })
    }
}
