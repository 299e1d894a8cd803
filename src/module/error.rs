//! Module Error Types

/// Result type alias for module operations
pub type ModuleResult<T> = std::result::Result<T, ModuleError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModuleError {
    #[error("dependency cycle: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("module '{module}' requires unknown module '{dependency}'")]
    MissingDependency { module: String, dependency: String },

    #[error("module '{id}' is registered more than once")]
    DuplicateModule { id: String },

    #[error("module '{module}' needs '{dependency}' listed before it")]
    UnorderedDependency { module: String, dependency: String },

    #[error("invalid module identifier '{id}' (allowed: a-z, 0-9, '_' and '-')")]
    InvalidIdentifier { id: String },

    #[error("unknown module '{id}'")]
    UnknownModule { id: String },

    #[error("module '{module}' has no feature '{feature}'")]
    UnknownFeature { module: String, feature: String },

    #[error("feature '{feature}' of module '{module}' has no entry point")]
    MissingEntryPoint { module: String, feature: String },

    #[error("module '{module}' failed during {stage}: {cause}")]
    Runtime {
        module: String,
        stage: String,
        cause: String,
    },

    #[error("modules have already been activated for this registry")]
    AlreadyActivated,
}

impl ModuleError {
    pub fn runtime(module: &str, stage: &str, cause: impl ToString) -> Self {
        ModuleError::Runtime {
            module: module.to_string(),
            stage: stage.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Errors that abort activation before any module runs
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ModuleError::CyclicDependency { .. }
                | ModuleError::MissingDependency { .. }
                | ModuleError::DuplicateModule { .. }
                | ModuleError::UnorderedDependency { .. }
                | ModuleError::InvalidIdentifier { .. }
                | ModuleError::UnknownModule { .. }
                | ModuleError::UnknownFeature { .. }
        )
    }
}

impl crate::core::error_handling::ContextualError for ModuleError {
    fn is_user_actionable(&self) -> bool {
        self.is_configuration_error() || matches!(self, ModuleError::AlreadyActivated)
    }

    fn user_message(&self) -> Option<String> {
        self.is_user_actionable().then(|| self.to_string())
    }
}
