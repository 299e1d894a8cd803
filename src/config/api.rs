//! Public API for activation configuration
//!
//! Activation data comes from layered TOML files (and programmatic layers)
//! deep-merged into one [`ActivationConfig`]. A resolved result can be frozen
//! into an [`ActivationSnapshot`] and activated later without resolving.

pub use crate::config::activation::{ActivationConfig, ModuleSetting};
pub use crate::config::error::{ConfigError, ConfigResult};
pub use crate::config::snapshot::{ActivationSnapshot, SnapshotEntry};
pub use crate::config::store::{
    default_site_dir, ConfigLayer, ConfigStore, CONFIG_FILE_NAME, CONFIG_PATHS_FILTER,
};
