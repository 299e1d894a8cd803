// Internal modules - all access should go through api module
pub(crate) mod entry_points;
pub(crate) mod error;
pub(crate) mod loopback;
pub(crate) mod task;
pub(crate) mod traits;

// Public API module - the only public interface for deferred execution
pub mod api;
