// Internal modules - all access should go through api module
pub(crate) mod activation;
pub(crate) mod error;
pub(crate) mod snapshot;
pub(crate) mod store;

// Public API module - the only public interface for configuration
pub mod api;

#[cfg(test)]
mod tests;
