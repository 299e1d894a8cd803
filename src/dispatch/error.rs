//! Dispatch Error Types

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no entry point registered for '{target}'")]
    UnknownTarget { target: String },

    #[error("entry point '{target}' failed: {message}")]
    EntryFailed { target: String, message: String },

    #[error("loopback client error: {message}")]
    Client { message: String },
}

impl crate::core::error_handling::ContextualError for DispatchError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, DispatchError::Client { .. })
    }

    fn user_message(&self) -> Option<String> {
        match self {
            DispatchError::Client { message } => Some(format!("loopback endpoint: {message}")),
            _ => None,
        }
    }
}
