// Internal modules - all access should go through api module
pub(crate) mod error;
pub(crate) mod manager;
pub(crate) mod name;
pub(crate) mod traits;

// Public API module - the only public interface for the hook system
pub mod api;
