//! Static module metadata

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static IDENTIFIER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-z0-9_-]+$").ok());

pub(crate) fn is_valid_identifier(id: &str) -> bool {
    IDENTIFIER.as_ref().is_some_and(|pattern| pattern.is_match(id))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    pub name: String,
    #[serde(default)]
    pub default_enabled: bool,
}

impl FeatureDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_enabled: false,
        }
    }

    pub fn enabled_by_default(mut self) -> Self {
        self.default_enabled = true;
        self
    }
}

/// Identifier, dependencies and features of one module
///
/// Descriptors never change after construction; resolution only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub features: Vec<FeatureDescriptor>,
    #[serde(default)]
    pub default_enabled: bool,
}

impl ModuleDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            dependencies: Vec::new(),
            features: Vec::new(),
            default_enabled: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    pub fn with_dependencies(mut self, ids: &[&str]) -> Self {
        self.dependencies.extend(ids.iter().map(|id| id.to_string()));
        self
    }

    /// Declare a feature that is off unless configured
    pub fn with_feature(mut self, name: impl Into<String>) -> Self {
        self.features.push(FeatureDescriptor::new(name));
        self
    }

    /// Declare a feature that is on unless configured off
    pub fn with_default_feature(mut self, name: impl Into<String>) -> Self {
        self.features
            .push(FeatureDescriptor::new(name).enabled_by_default());
        self
    }

    pub fn enabled_by_default(mut self) -> Self {
        self.default_enabled = true;
        self
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureDescriptor> {
        self.features.iter().find(|feature| feature.name == name)
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|feature| feature.name.as_str())
    }
}
