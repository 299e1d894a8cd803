//! Module registry and feature activation
//!
//! ```text
//!   ModuleCatalog ──descriptors──▶ graph::resolve ◀── ActivationConfig
//!        │                               │
//!     factories                    ActivationPlan ──▶ ActivationSnapshot
//!        │                               │
//!        └────────▶ ModuleRegistry::activate_plan
//!                     construct → extensions → init → features
//! ```

// Internal modules - all access should go through api module
pub(crate) mod activation;
pub(crate) mod builtin;
pub(crate) mod catalog;
pub(crate) mod context;
pub(crate) mod descriptor;
pub(crate) mod error;
pub(crate) mod graph;
pub(crate) mod registry;
pub(crate) mod traits;

// Public API module - the only public interface for modules
pub mod api;

#[cfg(test)]
mod tests;
