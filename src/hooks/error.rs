//! Error types for hook handlers

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("handler failed: {message}")]
    Failed { message: String },

    #[error("invalid hook arguments: {message}")]
    InvalidArgs { message: String },

    #[error("handler panicked: {message}")]
    Panicked { message: String },
}

impl HookError {
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Failed {
            message: message.into(),
        }
    }

    pub fn invalid_args(message: impl Into<String>) -> Self {
        HookError::InvalidArgs {
            message: message.into(),
        }
    }
}

/// Result type for hook handlers
pub type HookResult<T> = Result<T, HookError>;

impl crate::core::error_handling::ContextualError for HookError {
    fn is_user_actionable(&self) -> bool {
        false // handler failures are reported per hook, never shown directly
    }

    fn user_message(&self) -> Option<String> {
        None
    }
}
