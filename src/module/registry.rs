//! Module Registry
//!
//! Owns the catalog and, after activation, the constructed module instances.
//! Activation is all-or-nothing with respect to configuration errors: the
//! plan is complete and valid before the first factory runs. Runtime failures
//! after that point are isolated per module and per feature.

use crate::config::api::{ActivationConfig, ActivationSnapshot};
use crate::module::activation::{activate_features, ActivationPlan, ActivationReport, PlannedModule};
use crate::module::catalog::ModuleCatalog;
use crate::module::context::ModuleContext;
use crate::module::error::{ModuleError, ModuleResult};
use crate::module::traits::{Module, ModuleExtension};
use std::sync::Arc;

pub struct ModuleRegistry {
    catalog: ModuleCatalog,
    extensions: Vec<Arc<dyn ModuleExtension>>,
    active: Vec<Box<dyn Module>>,
    activated: bool,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("catalog", &self.catalog)
            .field(
                "extensions",
                &self.extensions.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .field("active", &self.active_ids())
            .finish()
    }
}

impl ModuleRegistry {
    pub fn new(catalog: ModuleCatalog) -> Self {
        Self {
            catalog,
            extensions: Vec::new(),
            active: Vec::new(),
            activated: false,
        }
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    /// Run `extension` over the constructed modules before their `init`
    pub fn add_extension(&mut self, extension: Arc<dyn ModuleExtension>) {
        self.extensions.push(extension);
    }

    pub fn resolve(&self, config: &ActivationConfig) -> ModuleResult<ActivationPlan> {
        ActivationPlan::plan(self.catalog.descriptors(), config)
    }

    /// Resolve `config` and activate the result
    pub async fn activate(
        &mut self,
        ctx: &ModuleContext,
        config: &ActivationConfig,
    ) -> ModuleResult<ActivationReport> {
        let plan = self.resolve(config)?;
        self.activate_plan(ctx, &plan).await
    }

    /// Activate a frozen module list without resolving
    pub async fn activate_snapshot(
        &mut self,
        ctx: &ModuleContext,
        snapshot: &ActivationSnapshot,
    ) -> ModuleResult<ActivationReport> {
        let plan = ActivationPlan::from_snapshot(self.catalog.descriptors(), snapshot)?;
        self.activate_plan(ctx, &plan).await
    }

    /// Construct, extend, then init and run features module by module
    ///
    /// # Errors
    /// Only configuration problems (an unknown module in `plan`) or a second
    /// activation are returned; everything else lands in the report.
    pub async fn activate_plan(
        &mut self,
        ctx: &ModuleContext,
        plan: &ActivationPlan,
    ) -> ModuleResult<ActivationReport> {
        if self.activated {
            return Err(ModuleError::AlreadyActivated);
        }
        let factories = plan
            .modules
            .iter()
            .map(|planned| self.catalog.factory(&planned.id).cloned())
            .collect::<ModuleResult<Vec<_>>>()?;
        self.activated = true;

        let mut report = ActivationReport {
            order: plan.module_ids().into_iter().map(str::to_string).collect(),
            ..ActivationReport::default()
        };

        let mut constructed: Vec<(&PlannedModule, Box<dyn Module>)> = Vec::new();
        for (planned, factory) in plan.modules.iter().zip(factories) {
            if planned.forced {
                log::debug!("Module '{}' enabled as a dependency", planned.id);
            }
            match factory(ctx) {
                Ok(module) => constructed.push((planned, module)),
                Err(e) => report.fail(ModuleError::runtime(&planned.id, "construct", e)),
            }
        }

        let (planned, mut modules): (Vec<_>, Vec<_>) = constructed.into_iter().unzip();
        for extension in &self.extensions {
            if let Err(e) = extension.extend(&modules, ctx) {
                report.fail(ModuleError::runtime(
                    extension.name(),
                    "extension",
                    e,
                ));
            }
        }

        for (planned, module) in planned.iter().zip(modules.iter_mut()) {
            if let Err(e) = module.init(ctx).await {
                report.fail(ModuleError::runtime(&planned.id, "init", e));
                log::warn!("Skipping features of '{}' after failed init", planned.id);
                continue;
            }
            report.initialized.push(planned.id.clone());
            activate_features(module.as_ref(), planned, &mut report);
        }

        self.active = modules;
        log::info!(
            "Activated {} module(s), {} feature(s), {} failure(s)",
            report.initialized.len(),
            report.features_run.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Identifiers of constructed modules, in activation order
    pub fn active_ids(&self) -> Vec<&str> {
        self.active.iter().map(|module| module.id()).collect()
    }

    pub fn module(&self, id: &str) -> Option<&dyn Module> {
        self.active
            .iter()
            .find(|module| module.id() == id)
            .map(|module| module.as_ref())
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }
}
