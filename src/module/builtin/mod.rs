//! Built-in Modules
//!
//! Modules that ship with the crate. Each registers itself with
//! `builtin_module!` and is picked up by `ModuleCatalog::with_builtins`.

pub mod api;
pub mod background_processing;
