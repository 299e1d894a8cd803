//! Error classification shared by every subsystem error type
//!
//! Configuration problems (a dependency cycle, an unknown module, a malformed
//! activation file, a bad command line) are user-actionable: the operator can
//! fix them, so their own message is what gets reported. Storage and transport
//! failures are system errors; they are reported by the operation that failed,
//! with the details at debug level.

/// Errors that know whether their message is meant for the operator
///
/// When `is_user_actionable()` is `true`, `user_message()` returns `Some`.
pub trait ContextualError: std::error::Error {
    fn is_user_actionable(&self) -> bool;

    fn user_message(&self) -> Option<String>;
}

/// The line reported for `error`: its own message when user-actionable,
/// otherwise the failed operation
pub fn headline<E: ContextualError + ?Sized>(error: &E, operation_context: &str) -> String {
    error
        .user_message()
        .filter(|_| error.is_user_actionable())
        .unwrap_or_else(|| format!("{operation_context} failed"))
}

/// Log `error` at error level, then its source chain at debug level
///
/// ```rust,no_run
/// # use hookwork::core::error_handling::log_error_with_context;
/// # use hookwork::module::api::ModuleError;
/// let err = ModuleError::UnknownModule { id: "seo".to_string() };
/// log_error_with_context(&err, "Module activation");
/// ```
pub fn log_error_with_context<E: ContextualError + ?Sized>(error: &E, operation_context: &str) {
    log::error!("FATAL: {}", headline(error, operation_context));
    log::debug!("DETAIL: {}", error);

    let mut source = error.source();
    while let Some(cause) = source {
        log::debug!("CAUSED BY: {}", cause);
        source = cause.source();
    }
}
