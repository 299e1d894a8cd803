//! Activation plans and the feature activator

use crate::config::api::{ActivationConfig, ActivationSnapshot, SnapshotEntry};
use crate::module::descriptor::ModuleDescriptor;
use crate::module::error::{ModuleError, ModuleResult};
use crate::module::graph::{is_configured_on, resolve_positions, DependencyGraph};
use crate::module::traits::Module;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedModule {
    pub id: String,
    /// Enabled features in declaration order
    pub features: Vec<String>,
    /// On only because another module requires it
    pub forced: bool,
}

/// Resolved module set with the features each module runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationPlan {
    pub modules: Vec<PlannedModule>,
}

impl ActivationPlan {
    /// Resolve `config` against the catalog and gate each module's features
    pub fn plan(descriptors: &[ModuleDescriptor], config: &ActivationConfig) -> ModuleResult<Self> {
        let graph = DependencyGraph::build(descriptors)?;
        let modules = resolve_positions(&graph, config)
            .into_iter()
            .map(|position| {
                let descriptor = graph.descriptor(position);
                PlannedModule {
                    id: descriptor.id.clone(),
                    features: enabled_features(descriptor, config),
                    forced: !is_configured_on(descriptor, config),
                }
            })
            .collect();
        Ok(Self { modules })
    }

    /// Plan from a frozen snapshot, without resolving
    ///
    /// Every module and feature named must exist in the catalog, each module
    /// may appear once, and every dependency must be listed before the
    /// modules that need it.
    pub fn from_snapshot(
        descriptors: &[ModuleDescriptor],
        snapshot: &ActivationSnapshot,
    ) -> ModuleResult<Self> {
        let mut modules: Vec<PlannedModule> = Vec::with_capacity(snapshot.modules.len());
        for entry in &snapshot.modules {
            let descriptor = descriptors
                .iter()
                .find(|descriptor| descriptor.id == entry.id)
                .ok_or_else(|| ModuleError::UnknownModule {
                    id: entry.id.clone(),
                })?;
            if modules.iter().any(|planned| planned.id == entry.id) {
                return Err(ModuleError::DuplicateModule {
                    id: entry.id.clone(),
                });
            }
            if let Some(feature) = entry
                .features
                .iter()
                .find(|feature| descriptor.feature(feature).is_none())
            {
                return Err(ModuleError::UnknownFeature {
                    module: entry.id.clone(),
                    feature: feature.clone(),
                });
            }
            if let Some(dependency) = descriptor
                .dependencies
                .iter()
                .find(|dependency| !modules.iter().any(|planned| &planned.id == *dependency))
            {
                return Err(ModuleError::UnorderedDependency {
                    module: entry.id.clone(),
                    dependency: dependency.clone(),
                });
            }
            modules.push(PlannedModule {
                id: entry.id.clone(),
                features: entry.features.clone(),
                forced: false,
            });
        }
        Ok(Self { modules })
    }

    pub fn snapshot(&self) -> ActivationSnapshot {
        ActivationSnapshot::new(
            self.modules
                .iter()
                .map(|module| SnapshotEntry {
                    id: module.id.clone(),
                    features: module.features.clone(),
                })
                .collect(),
        )
    }

    pub fn module_ids(&self) -> Vec<&str> {
        self.modules.iter().map(|module| module.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Declared features switched on by `config`, falling back to each
/// feature's own default
pub(crate) fn enabled_features(descriptor: &ModuleDescriptor, config: &ActivationConfig) -> Vec<String> {
    let setting = config.get(&descriptor.id);
    descriptor
        .features
        .iter()
        .filter(|feature| {
            setting
                .and_then(|setting| setting.feature(&feature.name))
                .unwrap_or(feature.default_enabled)
        })
        .map(|feature| feature.name.clone())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRun {
    pub module: String,
    pub feature: String,
}

/// What an activation did; failures never stop later modules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Resolved order, including modules that later failed
    pub order: Vec<String>,
    pub initialized: Vec<String>,
    pub features_run: Vec<FeatureRun>,
    pub failures: Vec<ModuleError>,
}

impl ActivationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn fail(&mut self, error: ModuleError) {
        log::error!("{}", error);
        self.failures.push(error);
    }
}

/// Invoke `planned.features` on an initialized module, in order
pub(crate) fn activate_features(module: &dyn Module, planned: &PlannedModule, report: &mut ActivationReport) {
    let table = module.features();
    for feature in &planned.features {
        let Some(entry) = table.get(feature) else {
            report.fail(ModuleError::MissingEntryPoint {
                module: planned.id.clone(),
                feature: feature.clone(),
            });
            continue;
        };

        log::debug!("Feature {}.{}", planned.id, feature);
        match entry() {
            Ok(()) => report.features_run.push(FeatureRun {
                module: planned.id.clone(),
                feature: feature.clone(),
            }),
            Err(e @ ModuleError::Runtime { .. }) => report.fail(e),
            Err(e) => report.fail(ModuleError::runtime(
                &planned.id,
                &format!("feature '{feature}'"),
                e,
            )),
        }
    }
}
