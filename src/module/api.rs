//! Public API for the module registry

pub use crate::module::activation::{ActivationPlan, ActivationReport, FeatureRun, PlannedModule};
pub use crate::module::builtin::api::{builtin_modules, BuiltinModuleEntry};
pub use crate::module::builtin::background_processing::{
    BackgroundProcessing, BACKGROUND_PROCESSING, SAVE_BACKGROUND_QUEUE_HOOK, SETTINGS_SAVED_HOOK,
};
pub use crate::module::catalog::{ModuleCatalog, ModuleFactory, ModuleFeatures};
pub use crate::module::context::ModuleContext;
pub use crate::module::descriptor::{FeatureDescriptor, ModuleDescriptor};
pub use crate::module::error::{ModuleError, ModuleResult};
pub use crate::module::graph::{resolve, DependencyGraph};
pub use crate::module::registry::ModuleRegistry;
pub use crate::module::traits::{FeatureFn, FeatureTable, Module, ModuleExtension};
