//! Module catalog: descriptors plus the factories that build them

use crate::module::builtin::api::builtin_modules;
use crate::module::context::ModuleContext;
use crate::module::descriptor::{FeatureDescriptor, ModuleDescriptor};
use crate::module::error::{ModuleError, ModuleResult};
use crate::module::graph::DependencyGraph;
use crate::module::traits::Module;
use serde::Serialize;
use std::sync::Arc;

/// Builds one module instance from the shared context
pub type ModuleFactory =
    Arc<dyn Fn(&ModuleContext) -> ModuleResult<Box<dyn Module>> + Send + Sync>;

/// Catalog listing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleFeatures {
    pub id: String,
    pub description: String,
    pub default_enabled: bool,
    pub dependencies: Vec<String>,
    pub features: Vec<FeatureDescriptor>,
}

/// Every module a host knows about, in registration order
///
/// Registration order is the tie-breaker when resolving, so hosts should
/// register in the order they want independent modules to run.
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    descriptors: Vec<ModuleDescriptor>,
    factories: Vec<ModuleFactory>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the modules compiled in through `builtin_module!`
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for entry in builtin_modules() {
            catalog.register((entry.descriptor)(), entry.factory);
        }
        catalog
    }

    /// Add a module; duplicates are reported by [`validate`](Self::validate)
    pub fn register<F>(&mut self, descriptor: ModuleDescriptor, factory: F) -> &mut Self
    where
        F: Fn(&ModuleContext) -> ModuleResult<Box<dyn Module>> + Send + Sync + 'static,
    {
        log::trace!("Catalog entry '{}'", descriptor.id);
        self.descriptors.push(descriptor);
        self.factories.push(Arc::new(factory));
        self
    }

    pub fn descriptors(&self) -> &[ModuleDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.descriptors.iter().find(|descriptor| descriptor.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.descriptor(id).is_some()
    }

    pub(crate) fn factory(&self, id: &str) -> ModuleResult<&ModuleFactory> {
        self.descriptors
            .iter()
            .position(|descriptor| descriptor.id == id)
            .map(|position| &self.factories[position])
            .ok_or_else(|| ModuleError::UnknownModule { id: id.to_string() })
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn validate(&self) -> ModuleResult<()> {
        DependencyGraph::build(&self.descriptors).map(|_| ())
    }

    /// Every module with its features and defaults
    pub fn module_features(&self) -> Vec<ModuleFeatures> {
        self.descriptors
            .iter()
            .map(|descriptor| ModuleFeatures {
                id: descriptor.id.clone(),
                description: descriptor.description.clone(),
                default_enabled: descriptor.default_enabled,
                dependencies: descriptor.dependencies.clone(),
                features: descriptor.features.clone(),
            })
            .collect()
    }
}

impl std::fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleCatalog")
            .field(
                "modules",
                &self.descriptors.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
