//! Host bootstrap
//!
//! Wires one execution context together: the event bus, durable storage, the
//! deferred executor and its entry points, the action queue, and the module
//! registry. Hosts call [`Host::boot`] once per request (or process) and
//! [`Host::finish_request`] when the request is done.

use crate::config::api::{ActivationSnapshot, ConfigError, ConfigResult, ConfigStore};
use crate::core::error_handling::ContextualError;
use crate::dispatch::api::{
    DeferredExecutor, DispatchError, DispatchResult, EntryPoints, LoopbackExecutor, TaskExecutor,
};
use crate::hooks::api::{EventBus, HookManager};
use crate::module::api::{
    ActivationReport, ModuleCatalog, ModuleContext, ModuleError, ModuleRegistry,
};
use crate::queue::api::{ActionQueue, QueueError, QueueResult, QueueSettings, RecordSource};
use crate::storage::api::KeyValueStore;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub type BootResult<T> = Result<T, BootError>;

impl ContextualError for BootError {
    fn is_user_actionable(&self) -> bool {
        match self {
            BootError::Config(e) => e.is_user_actionable(),
            BootError::Module(e) => e.is_user_actionable(),
            BootError::Queue(e) => e.is_user_actionable(),
        }
    }

    fn user_message(&self) -> Option<String> {
        match self {
            BootError::Config(e) => e.user_message(),
            BootError::Module(e) => e.user_message(),
            BootError::Queue(e) => e.user_message(),
        }
    }
}

/// External collaborators of one execution context
pub struct HostServices {
    pub bus: Arc<dyn EventBus>,
    pub kv: Arc<dyn KeyValueStore>,
    pub executor: Arc<dyn DeferredExecutor>,
    pub entry_points: EntryPoints,
    pub records: Option<Arc<dyn RecordSource>>,
}

impl HostServices {
    /// In-process bus, deferred work on tokio tasks
    pub fn in_process(kv: Arc<dyn KeyValueStore>) -> Self {
        let entry_points = EntryPoints::new();
        Self {
            bus: Arc::new(HookManager::new()),
            kv,
            executor: Arc::new(TaskExecutor::new(entry_points.clone())),
            entry_points,
            records: None,
        }
    }

    /// In-process bus, deferred work posted to the host's `endpoint`
    pub fn loopback(kv: Arc<dyn KeyValueStore>, endpoint: &str) -> Result<Self, DispatchError> {
        Ok(Self {
            bus: Arc::new(HookManager::new()),
            kv,
            executor: Arc::new(LoopbackExecutor::new(endpoint)?),
            entry_points: EntryPoints::new(),
            records: None,
        })
    }

    pub fn with_records(mut self, records: Arc<dyn RecordSource>) -> Self {
        self.records = Some(records);
        self
    }

    /// Load configuration from `defaults`, whatever the bus's
    /// `config_paths` filter adds, then `site_dir`
    ///
    /// Register the filter on [`bus`](Self::bus) before calling this.
    pub fn load_config(
        &self,
        store: ConfigStore,
        defaults: &[PathBuf],
        site_dir: Option<&Path>,
    ) -> ConfigResult<ConfigStore> {
        let mut store = store;
        let paths = ConfigStore::base_paths(defaults, Some(&*self.bus), site_dir);
        let loaded = store.load_base_paths(&paths)?;
        log::debug!(
            "Loaded {} configuration file(s) from {} base path(s)",
            loaded,
            paths.len()
        );
        Ok(store)
    }
}

/// A booted execution context
pub struct Host {
    bus: Arc<dyn EventBus>,
    entry_points: EntryPoints,
    queue: Arc<ActionQueue>,
    registry: ModuleRegistry,
    report: ActivationReport,
    healthcheck: Option<JoinHandle<()>>,
}

impl Host {
    /// Resolve the merged configuration and activate the result
    pub async fn boot(
        services: HostServices,
        catalog: ModuleCatalog,
        config: &ConfigStore,
    ) -> BootResult<Self> {
        let settings = config.queue_settings()?;
        let merged = config.merged();
        let (queue, ctx) = Self::context(&services, settings);
        let ctx = ctx.with_config(merged.clone());

        let mut registry = ModuleRegistry::new(catalog);
        let report = registry.activate(&ctx, &merged).await?;
        Ok(Self::assemble(services, queue, registry, report))
    }

    /// Activate a frozen snapshot without resolving
    pub async fn boot_from_snapshot(
        services: HostServices,
        catalog: ModuleCatalog,
        settings: QueueSettings,
        snapshot: &ActivationSnapshot,
    ) -> BootResult<Self> {
        let (queue, ctx) = Self::context(&services, settings);

        let mut registry = ModuleRegistry::new(catalog);
        let report = registry.activate_snapshot(&ctx, snapshot).await?;
        Ok(Self::assemble(services, queue, registry, report))
    }

    fn context(services: &HostServices, settings: QueueSettings) -> (Arc<ActionQueue>, ModuleContext) {
        let queue = Arc::new(ActionQueue::new(
            settings,
            services.bus.clone(),
            services.kv.clone(),
            services.executor.clone(),
        ));
        queue.register_entry_point(&services.entry_points);

        let ctx = ModuleContext::new(
            services.bus.clone(),
            queue.clone(),
            services.executor.clone(),
            services.entry_points.clone(),
        );
        let ctx = match &services.records {
            Some(records) => ctx.with_records(records.clone()),
            None => ctx,
        };
        (queue, ctx)
    }

    fn assemble(
        services: HostServices,
        queue: Arc<ActionQueue>,
        registry: ModuleRegistry,
        report: ActivationReport,
    ) -> Self {
        Self {
            bus: services.bus,
            entry_points: services.entry_points,
            queue,
            registry,
            report,
            healthcheck: None,
        }
    }

    pub fn bus(&self) -> &Arc<dyn EventBus> {
        &self.bus
    }

    pub fn queue(&self) -> &Arc<ActionQueue> {
        &self.queue
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn report(&self) -> &ActivationReport {
        &self.report
    }

    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    /// Persist and dispatch anything queued during this request
    pub async fn finish_request(&self) -> QueueResult<DispatchResult> {
        if !self.queue.has_pending() {
            return Ok(DispatchResult::Skipped);
        }
        self.queue.save_and_dispatch().await
    }

    /// Run an incoming deferred request (the host side of a loopback call)
    pub async fn handle(&self, target: &str, payload: Value) -> Result<(), DispatchError> {
        self.entry_points.handle(target, payload).await
    }

    /// Periodically re-dispatch a queue that has stored items but no pass
    pub fn start_healthcheck(&mut self) {
        if self.healthcheck.is_none() {
            let interval = self.queue.settings().healthcheck_interval;
            self.healthcheck = Some(self.queue.spawn_healthcheck(interval));
        }
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        if let Some(handle) = self.healthcheck.take() {
            handle.abort();
        }
    }
}
