//! Layered configuration store
//!
//! Layers are kept in the order they were added and merged on demand, later
//! layers overriding earlier ones per key. File layers come from base paths:
//! built-in defaults, then whatever the `hookwork/config_paths` filter
//! returns, then the site directory. Each base path contributes
//! `hookwork.toml` followed by `conf.d/*.toml` in name order.

use crate::config::activation::ActivationConfig;
use crate::config::error::{ConfigError, ConfigResult};
use crate::hooks::api::{hook_name, EventBus};
use crate::queue::api::QueueSettings;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "hookwork.toml";

/// Filter hook suffix hosts use to add or reorder base paths
pub const CONFIG_PATHS_FILTER: &str = "config_paths";

/// `<config dir>/Hookwork`, the per-user site directory
pub fn default_site_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("Hookwork"))
}

#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub origin: String,
    pub activation: ActivationConfig,
    pub queue: Option<toml::Table>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    layers: Vec<ConfigLayer>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: ActivationConfig) -> Self {
        let mut store = Self::new();
        store.push_layer("defaults", defaults);
        store
    }

    pub fn push_layer(&mut self, origin: impl Into<String>, activation: ActivationConfig) {
        self.layers.push(ConfigLayer {
            origin: origin.into(),
            activation,
            queue: None,
        });
    }

    pub fn layers(&self) -> &[ConfigLayer] {
        &self.layers
    }

    /// Parse TOML text as one layer
    pub fn load_str(&mut self, content: &str, origin: &Path) -> ConfigResult<()> {
        let table: toml::Table = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        let origin_name = origin.display().to_string();
        let activation = ActivationConfig::from_toml_table(&table, &origin_name)?;

        let queue = match table.get("queue") {
            Some(toml::Value::Table(queue)) => Some(queue.clone()),
            Some(_) => {
                return Err(ConfigError::InvalidValue {
                    origin: origin_name,
                    key: "queue".to_string(),
                    message: "expected a table".to_string(),
                })
            }
            None => None,
        };

        log::debug!("Loaded configuration layer {}", origin_name);
        self.layers.push(ConfigLayer {
            origin: origin_name,
            activation,
            queue,
        });
        Ok(())
    }

    pub fn load_file(&mut self, path: &Path) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&content, path)
    }

    /// Load `hookwork.toml` and `conf.d/*.toml` from one base path
    pub fn load_dir(&mut self, dir: &Path) -> ConfigResult<usize> {
        let mut loaded = 0;

        let main = dir.join(CONFIG_FILE_NAME);
        if main.is_file() {
            self.load_file(&main)?;
            loaded += 1;
        }

        let pattern = format!(
            "{}/conf.d/*.toml",
            glob::Pattern::escape(&dir.to_string_lossy())
        );
        let mut fragments: Vec<PathBuf> = glob::glob(&pattern)
            .map_err(|e| ConfigError::InvalidValue {
                origin: dir.display().to_string(),
                key: "conf.d".to_string(),
                message: e.to_string(),
            })?
            .filter_map(Result::ok)
            .collect();
        fragments.sort();

        for fragment in fragments {
            self.load_file(&fragment)?;
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn load_base_paths(&mut self, paths: &[PathBuf]) -> ConfigResult<usize> {
        let mut loaded = 0;
        for path in paths {
            loaded += self.load_dir(path)?;
        }
        Ok(loaded)
    }

    /// Ordered, de-duplicated, existing base paths
    pub fn base_paths(
        defaults: &[PathBuf],
        bus: Option<&dyn EventBus>,
        site_dir: Option<&Path>,
    ) -> Vec<PathBuf> {
        let mut paths = defaults.to_vec();

        if let Some(bus) = bus {
            let current = Value::Array(
                paths
                    .iter()
                    .map(|p| Value::String(p.display().to_string()))
                    .collect(),
            );
            let filtered = bus.apply_filters(&hook_name(&[CONFIG_PATHS_FILTER]), current, &[]);
            match filtered.as_array() {
                Some(items) => {
                    paths = items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(PathBuf::from)
                        .collect()
                }
                None => log::warn!("Ignoring config_paths filter result: not a list"),
            }
        }

        if let Some(site_dir) = site_dir {
            paths.push(site_dir.to_path_buf());
        }

        let mut seen = HashSet::new();
        paths
            .into_iter()
            .filter(|path| seen.insert(path.clone()))
            .filter(|path| {
                let exists = path.is_dir();
                if !exists {
                    log::debug!("Skipping missing config path {}", path.display());
                }
                exists
            })
            .collect()
    }

    /// All layers deep-merged in order
    pub fn merged(&self) -> ActivationConfig {
        ActivationConfig::merge_all(self.layers.iter().map(|layer| &layer.activation))
    }

    /// Queue settings from the merged `[queue]` tables, defaults elsewhere
    pub fn queue_settings(&self) -> ConfigResult<QueueSettings> {
        let mut merged = toml::Table::new();
        for queue in self.layers.iter().filter_map(|layer| layer.queue.as_ref()) {
            merge_tables(&mut merged, queue);
        }

        let invalid = |message: String| ConfigError::InvalidValue {
            origin: "merged configuration".to_string(),
            key: "queue".to_string(),
            message,
        };
        let settings: QueueSettings = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| invalid(e.to_string()))?;
        settings.validate().map_err(|e| invalid(e.to_string()))?;
        Ok(settings)
    }
}

fn merge_tables(base: &mut toml::Table, over: &toml::Table) {
    for (key, value) in over {
        match (base.get_mut(key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming)
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}
