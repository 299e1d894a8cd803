//! Shared services handed to module factories

use crate::config::api::ActivationConfig;
use crate::dispatch::api::{DeferredExecutor, EntryPoints};
use crate::hooks::api::EventBus;
use crate::queue::api::{ActionQueue, RecordSource};
use std::sync::Arc;

/// Everything a module may wire itself into; cheap to clone
#[derive(Clone)]
pub struct ModuleContext {
    bus: Arc<dyn EventBus>,
    queue: Arc<ActionQueue>,
    executor: Arc<dyn DeferredExecutor>,
    entry_points: EntryPoints,
    records: Option<Arc<dyn RecordSource>>,
    config: Arc<ActivationConfig>,
}

impl ModuleContext {
    pub fn new(
        bus: Arc<dyn EventBus>,
        queue: Arc<ActionQueue>,
        executor: Arc<dyn DeferredExecutor>,
        entry_points: EntryPoints,
    ) -> Self {
        Self {
            bus,
            queue,
            executor,
            entry_points,
            records: None,
            config: Arc::new(ActivationConfig::new()),
        }
    }

    pub fn with_records(mut self, records: Arc<dyn RecordSource>) -> Self {
        self.records = Some(records);
        self
    }

    pub fn with_config(mut self, config: ActivationConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn bus(&self) -> &Arc<dyn EventBus> {
        &self.bus
    }

    pub fn queue(&self) -> &Arc<ActionQueue> {
        &self.queue
    }

    pub fn executor(&self) -> &Arc<dyn DeferredExecutor> {
        &self.executor
    }

    /// Targets this context answers when a deferred request arrives
    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    pub fn records(&self) -> Option<&Arc<dyn RecordSource>> {
        self.records.as_ref()
    }

    /// Merged activation configuration the registry was booted with
    pub fn config(&self) -> &ActivationConfig {
        &self.config
    }
}
