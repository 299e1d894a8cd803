// Internal modules - all access should go through api module
pub(crate) mod error;
pub(crate) mod file;
pub(crate) mod memory;
pub(crate) mod traits;

// Public API module - the only public interface for durable storage
pub mod api;
