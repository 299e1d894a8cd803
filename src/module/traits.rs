//! Module trait system
//!
//! A module is constructed by its catalog factory, initialized once, then has
//! its enabled features invoked in declaration order. Features are closures
//! the module collects at construction into a [`FeatureTable`].

use crate::module::context::ModuleContext;
use crate::module::error::ModuleResult;
use once_cell::sync::Lazy;

/// Feature entry point, invoked with no arguments
pub type FeatureFn = Box<dyn Fn() -> ModuleResult<()> + Send + Sync>;

static NO_FEATURES: Lazy<FeatureTable> = Lazy::new(FeatureTable::new);

/// Named feature entry points of one module instance
#[derive(Default)]
pub struct FeatureTable {
    entries: Vec<(String, FeatureFn)>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, name: &str, feature: F) -> Self
    where
        F: Fn() -> ModuleResult<()> + Send + Sync + 'static,
    {
        self.insert(name, feature);
        self
    }

    /// Bind `name`, replacing an earlier binding of the same name
    pub fn insert<F>(&mut self, name: &str, feature: F)
    where
        F: Fn() -> ModuleResult<()> + Send + Sync + 'static,
    {
        let feature: FeatureFn = Box::new(feature);
        match self.entries.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = feature,
            None => self.entries.push((name.to_string(), feature)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureFn> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, feature)| feature)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for FeatureTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[async_trait::async_trait]
pub trait Module: Send + Sync {
    /// Catalog identifier this instance was built for
    fn id(&self) -> &str;

    /// Mandatory initialization, run once before any feature
    async fn init(&mut self, _ctx: &ModuleContext) -> ModuleResult<()> {
        Ok(())
    }

    fn features(&self) -> &FeatureTable {
        &NO_FEATURES
    }
}

/// Hook run over the whole constructed module set before any `init`
pub trait ModuleExtension: Send + Sync {
    fn name(&self) -> &str;

    fn extend(&self, modules: &[Box<dyn Module>], ctx: &ModuleContext) -> ModuleResult<()>;
}
