//! CLI error type

use crate::config::api::ConfigError;
use crate::core::error_handling::ContextualError;
use crate::dispatch::api::DispatchError;
use crate::module::api::ModuleError;
use crate::queue::api::QueueError;
use crate::storage::api::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("{message}")]
    Usage { message: String },
}

pub type CliResult<T> = Result<T, CliError>;

impl ContextualError for CliError {
    fn is_user_actionable(&self) -> bool {
        match self {
            CliError::Config(e) => e.is_user_actionable(),
            CliError::Module(e) => e.is_user_actionable(),
            CliError::Queue(e) => e.is_user_actionable(),
            CliError::Storage(e) => e.is_user_actionable(),
            CliError::Dispatch(e) => e.is_user_actionable(),
            CliError::Output(_) => false,
            CliError::Usage { .. } => true,
        }
    }

    fn user_message(&self) -> Option<String> {
        self.is_user_actionable().then(|| self.to_string())
    }
}
