//! Queue Error Types

use crate::storage::api::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("queue '{queue}' holds an unreadable document: {source}")]
    Corrupt {
        queue: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("queue '{queue}' was modified concurrently")]
    Conflict { queue: String },

    #[error("no record source available for bulk action '{action}'")]
    MissingRecordSource { action: String },

    #[error("invalid queue settings: {message}")]
    InvalidSettings { message: String },
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

impl crate::core::error_handling::ContextualError for QueueError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            QueueError::InvalidSettings { .. } | QueueError::MissingRecordSource { .. }
        )
    }

    fn user_message(&self) -> Option<String> {
        self.is_user_actionable().then(|| self.to_string())
    }
}
