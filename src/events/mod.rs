// Internal modules - all access should go through api module
pub(crate) mod record_saved;
pub(crate) mod request;

// Public API module - the only public interface for background events
pub mod api;

#[cfg(test)]
mod tests;
