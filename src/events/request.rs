//! Background request event: fire-and-forget dispatch of one hook

use crate::dispatch::api::{
    entry_point, DeferredExecutor, DeferredRequest, DispatchResult, EntryPoints,
};
use crate::hooks::api::{hook_name, ActionOutcome, EventBus};
use futures::FutureExt;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub struct BackgroundRequestEvent {
    suffix: String,
    data_keys: Vec<String>,
    bus: Arc<dyn EventBus>,
    executor: Arc<dyn DeferredExecutor>,
}

impl BackgroundRequestEvent {
    /// `data_keys` are the fields collected, in order, into positional args
    pub fn new(
        suffix: impl Into<String>,
        data_keys: &[&str],
        bus: Arc<dyn EventBus>,
        executor: Arc<dyn DeferredExecutor>,
    ) -> Self {
        Self {
            suffix: suffix.into(),
            data_keys: data_keys.iter().map(|key| key.to_string()).collect(),
            bus,
            executor,
        }
    }

    /// Bus name subscribers listen on; also the entry point target
    pub fn hook_name(&self) -> String {
        hook_name(&["background_event", self.suffix.as_str()])
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn has_subscribers(&self) -> bool {
        self.bus.has_action(&self.hook_name())
    }

    /// Declared fields of `data` in order; missing fields become `null`
    pub fn collect_args(&self, data: &Map<String, Value>) -> Vec<Value> {
        self.data_keys
            .iter()
            .map(|key| data.get(key).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Dispatch only when someone listens; `Skipped` without any call otherwise
    pub async fn dispatch_if_registered(&self, data: &Map<String, Value>) -> DispatchResult {
        if !self.has_subscribers() {
            log::trace!("No subscribers on '{}', not dispatching", self.hook_name());
            return DispatchResult::Skipped;
        }
        self.dispatch(self.collect_args(data)).await
    }

    /// Fire one out-of-band request carrying `args`
    pub async fn dispatch(&self, args: Vec<Value>) -> DispatchResult {
        let target = self.hook_name();
        let request = DeferredRequest::new(target.clone(), json!({ "args": args }));
        let result = self.executor.trigger(request).await;
        if let DispatchResult::Failed { reason } = &result {
            log::warn!("Background event '{}' lost: {}", target, reason);
        }
        result
    }

    /// Out-of-band side: invoke the hook with the carried args
    pub fn handle(&self, payload: &Value) -> ActionOutcome {
        let args = payload
            .get("args")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let outcome = self.bus.do_action(&self.hook_name(), &args);
        for failure in &outcome.failures {
            log::error!("Background event '{}' handler failed: {}", failure.hook, failure.error);
        }
        outcome
    }

    /// Bind [`handle`](Self::handle) to this event's target
    pub fn register_entry_point(self: &Arc<Self>, entry_points: &EntryPoints) {
        let event = Arc::downgrade(self);
        entry_points.register(
            self.hook_name(),
            entry_point(move |payload: Value| {
                let event = event.clone();
                async move {
                    match event.upgrade() {
                        Some(event) => {
                            event.handle(&payload);
                        }
                        None => log::warn!("Background request arrived after its event was dropped"),
                    }
                    Ok(())
                }
                .boxed()
            }),
        );
    }
}
