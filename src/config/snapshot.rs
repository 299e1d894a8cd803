//! Frozen activation results

use crate::config::error::{ConfigError, ConfigResult};
use crate::core::version::get_api_version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub id: String,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Ordered module/feature list that can be activated without resolving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationSnapshot {
    pub generated_at: DateTime<Utc>,
    pub api_version: u32,
    pub modules: Vec<SnapshotEntry>,
}

impl ActivationSnapshot {
    pub fn new(modules: Vec<SnapshotEntry>) -> Self {
        Self {
            generated_at: Utc::now(),
            api_version: get_api_version(),
            modules,
        }
    }

    pub fn module_ids(&self) -> Vec<&str> {
        self.modules.iter().map(|entry| entry.id.as_str()).collect()
    }

    pub async fn write(&self, path: &Path) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(path, content)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!(
            "Wrote activation snapshot with {} module(s) to {}",
            self.modules.len(),
            path.display()
        );
        Ok(())
    }

    pub async fn read(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let snapshot: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if snapshot.api_version != get_api_version() {
            log::warn!(
                "Snapshot {} was written for module API {} (running {})",
                path.display(),
                snapshot.api_version,
                get_api_version()
            );
        }
        Ok(snapshot)
    }
}
