//! Activation configuration and its merge rules

use crate::config::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-module configuration: an on/off flag or a feature map
///
/// A feature map switches the module on when it is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleSetting {
    Enabled(bool),
    Features(BTreeMap<String, bool>),
}

impl ModuleSetting {
    pub fn is_enabled(&self) -> bool {
        match self {
            ModuleSetting::Enabled(enabled) => *enabled,
            ModuleSetting::Features(features) => !features.is_empty(),
        }
    }

    /// Explicit setting for one feature; `None` when not configured
    pub fn feature(&self, name: &str) -> Option<bool> {
        match self {
            ModuleSetting::Enabled(_) => None,
            ModuleSetting::Features(features) => features.get(name).copied(),
        }
    }

    /// Later layer wins per key: two feature maps merge, anything else replaces
    pub fn merge(&mut self, other: &ModuleSetting) {
        match (self, other) {
            (ModuleSetting::Features(mine), ModuleSetting::Features(theirs)) => {
                mine.extend(theirs.iter().map(|(k, v)| (k.clone(), *v)));
            }
            (mine, theirs) => *mine = theirs.clone(),
        }
    }
}

/// Map from module identifier to [`ModuleSetting`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationConfig(BTreeMap<String, ModuleSetting>);

/// Top-level keys that are not module entries
const RESERVED_KEYS: &[&str] = &["queue"];

impl ActivationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(mut self, module: &str) -> Self {
        self.set(module, ModuleSetting::Enabled(true));
        self
    }

    pub fn disable(mut self, module: &str) -> Self {
        self.set(module, ModuleSetting::Enabled(false));
        self
    }

    /// Set one feature flag, turning a boolean entry into a feature map
    pub fn feature(mut self, module: &str, feature: &str, enabled: bool) -> Self {
        let entry = self
            .0
            .entry(module.to_string())
            .or_insert_with(|| ModuleSetting::Features(BTreeMap::new()));
        if matches!(entry, ModuleSetting::Enabled(_)) {
            *entry = ModuleSetting::Features(BTreeMap::new());
        }
        if let ModuleSetting::Features(features) = entry {
            features.insert(feature.to_string(), enabled);
        }
        self
    }

    pub fn set(&mut self, module: &str, setting: ModuleSetting) {
        self.0.insert(module.to_string(), setting);
    }

    pub fn get(&self, module: &str) -> Option<&ModuleSetting> {
        self.0.get(module)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleSetting)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Deep-merge `other` over this configuration
    pub fn merge(&mut self, other: &ActivationConfig) {
        for (module, setting) in &other.0 {
            match self.0.get_mut(module) {
                Some(existing) => existing.merge(setting),
                None => {
                    self.0.insert(module.clone(), setting.clone());
                }
            }
        }
    }

    /// Merge layers in priority order, later layers winning
    pub fn merge_all<'a, I>(layers: I) -> Self
    where
        I: IntoIterator<Item = &'a ActivationConfig>,
    {
        layers.into_iter().fold(Self::new(), |mut merged, layer| {
            merged.merge(layer);
            merged
        })
    }

    /// Read module entries from a parsed TOML table
    ///
    /// Accepted forms:
    /// - `seo = true`
    /// - `modules = ["seo", "search"]` (each listed module on)
    /// - `seo = ["sitemap", "schema"]` (each listed feature on)
    /// - `[seo]` table of feature booleans
    pub fn from_toml_table(table: &toml::Table, origin: &str) -> ConfigResult<Self> {
        let mut config = Self::new();

        for (key, value) in table {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let invalid = |message: &str| ConfigError::InvalidValue {
                origin: origin.to_string(),
                key: key.clone(),
                message: message.to_string(),
            };

            match (key.as_str(), value) {
                ("modules", toml::Value::Array(items)) => {
                    for name in string_list(items).ok_or_else(|| invalid("expected module names"))? {
                        config.set(&name, ModuleSetting::Enabled(true));
                    }
                }
                (_, toml::Value::Boolean(enabled)) => {
                    config.set(key, ModuleSetting::Enabled(*enabled));
                }
                (_, toml::Value::Array(items)) => {
                    let features = string_list(items)
                        .ok_or_else(|| invalid("expected a list of feature names"))?
                        .into_iter()
                        .map(|name| (name, true))
                        .collect();
                    config.set(key, ModuleSetting::Features(features));
                }
                (_, toml::Value::Table(features)) => {
                    let mut map = BTreeMap::new();
                    for (feature, flag) in features {
                        let flag = flag
                            .as_bool()
                            .ok_or_else(|| invalid(&format!("feature '{feature}' must be a boolean")))?;
                        map.insert(feature.clone(), flag);
                    }
                    config.set(key, ModuleSetting::Features(map));
                }
                _ => return Err(invalid("expected a boolean, a list or a table of booleans")),
            }
        }

        Ok(config)
    }
}

fn string_list(items: &[toml::Value]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}
