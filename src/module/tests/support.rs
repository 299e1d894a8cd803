//! Shared fixtures for module tests

use crate::dispatch::api::{EntryPoints, TaskExecutor};
use crate::hooks::api::HookManager;
use crate::module::api::*;
use crate::queue::api::{ActionQueue, QueueSettings};
use crate::storage::api::MemoryStore;
use std::sync::{Arc, Mutex};

pub(super) type Log = Arc<Mutex<Vec<String>>>;

pub(super) fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub(super) fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub(super) struct Services {
    pub bus: Arc<HookManager>,
    pub executor: Arc<TaskExecutor>,
    pub queue: Arc<ActionQueue>,
    pub ctx: ModuleContext,
}

pub(super) fn services() -> Services {
    let bus = Arc::new(HookManager::new());
    let entry_points = EntryPoints::new();
    let executor = Arc::new(TaskExecutor::new(entry_points.clone()));
    let queue = Arc::new(ActionQueue::new(
        QueueSettings::default(),
        bus.clone(),
        Arc::new(MemoryStore::new()),
        executor.clone(),
    ));
    queue.register_entry_point(&entry_points);
    let ctx = ModuleContext::new(bus.clone(), queue.clone(), executor.clone(), entry_points);
    Services {
        bus,
        executor,
        queue,
        ctx,
    }
}

/// Module that logs `"<id> init"` and `"<id>.<feature>"`
pub(super) struct Recorder {
    id: String,
    log: Log,
    features: FeatureTable,
    fail_init: bool,
}

#[async_trait::async_trait]
impl Module for Recorder {
    fn id(&self) -> &str {
        &self.id
    }

    async fn init(&mut self, _ctx: &ModuleContext) -> ModuleResult<()> {
        self.log.lock().unwrap().push(format!("{} init", self.id));
        if self.fail_init {
            return Err(ModuleError::runtime(&self.id, "init", "boom"));
        }
        Ok(())
    }

    fn features(&self) -> &FeatureTable {
        &self.features
    }
}

pub(super) struct RecorderSpec {
    pub bound: Vec<&'static str>,
    pub failing: Vec<&'static str>,
    pub fail_init: bool,
}

impl RecorderSpec {
    pub fn binding(features: &[&'static str]) -> Self {
        Self {
            bound: features.to_vec(),
            failing: Vec::new(),
            fail_init: false,
        }
    }
}

pub(super) fn register_recorder(
    catalog: &mut ModuleCatalog,
    descriptor: ModuleDescriptor,
    spec: RecorderSpec,
    log: &Log,
) {
    let log = log.clone();
    let spec = Arc::new(spec);
    let id = descriptor.id.clone();
    catalog.register(descriptor, move |_ctx: &ModuleContext| {
        let mut features = FeatureTable::new();
        for name in &spec.bound {
            let log = log.clone();
            let label = format!("{}.{}", id, name);
            let fails = spec.failing.contains(name);
            features.insert(name, move || {
                log.lock().unwrap().push(label.clone());
                if fails {
                    Err(ModuleError::runtime("feature", "run", "failed on purpose"))
                } else {
                    Ok(())
                }
            });
        }
        Ok(Box::new(Recorder {
            id: id.clone(),
            log: log.clone(),
            features,
            fail_init: spec.fail_init,
        }) as Box<dyn Module>)
    });
}

/// Catalog of plain modules with the given `(id, dependencies)` edges
pub(super) fn descriptors(edges: &[(&str, &[&str])]) -> Vec<ModuleDescriptor> {
    edges
        .iter()
        .map(|(id, deps)| ModuleDescriptor::new(*id).with_dependencies(deps))
        .collect()
}
