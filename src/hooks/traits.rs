//! The event bus contract consumed by the registry and the queue

use crate::hooks::error::{HookError, HookResult};
use serde_json::Value;
use std::sync::Arc;

/// Priority used when a caller has no ordering preference
pub const DEFAULT_PRIORITY: i32 = 10;

/// Synchronous action subscriber
pub type ActionHandler = Arc<dyn Fn(&[Value]) -> HookResult<()> + Send + Sync>;

/// Synchronous filter subscriber: receives the current value and the extra args
pub type FilterHandler = Arc<dyn Fn(Value, &[Value]) -> HookResult<Value> + Send + Sync>;

/// Wrap a closure as an [`ActionHandler`]
pub fn action<F>(handler: F) -> ActionHandler
where
    F: Fn(&[Value]) -> HookResult<()> + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Wrap a closure as a [`FilterHandler`]
pub fn filter<F>(handler: F) -> FilterHandler
where
    F: Fn(Value, &[Value]) -> HookResult<Value> + Send + Sync + 'static,
{
    Arc::new(handler)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

/// One handler that returned an error during `do_action`
#[derive(Debug, Clone, PartialEq)]
pub struct HookFailure {
    pub hook: String,
    pub subscription: SubscriptionId,
    pub error: HookError,
}

/// Result of invoking every subscriber of an action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutcome {
    pub invoked: usize,
    pub failures: Vec<HookFailure>,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Named publish/subscribe bus with priority-ordered subscribers
///
/// Lower priorities run first; subscribers with equal priority run in the
/// order they were added. Invocation is synchronous and runs every subscriber
/// even when an earlier one fails.
pub trait EventBus: Send + Sync {
    fn add_action(&self, name: &str, priority: i32, handler: ActionHandler) -> SubscriptionId;

    /// Remove a subscriber; false when it was not registered on `name`
    fn remove_action(&self, name: &str, id: SubscriptionId) -> bool;

    fn has_action(&self, name: &str) -> bool;

    fn do_action(&self, name: &str, args: &[Value]) -> ActionOutcome;

    fn add_filter(&self, name: &str, priority: i32, handler: FilterHandler) -> SubscriptionId;

    fn has_filter(&self, name: &str) -> bool;

    /// Thread `value` through every filter on `name`
    ///
    /// A failing filter is skipped and the value it received is passed on.
    fn apply_filters(&self, name: &str, value: Value, args: &[Value]) -> Value;
}
