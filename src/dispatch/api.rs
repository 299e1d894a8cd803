//! Public API for deferred (out-of-band) execution
//!
//! A [`DeferredExecutor`] hands a [`DeferredRequest`] to a separate execution
//! context and reports only whether the handoff worked. The receiving side
//! looks the request's target up in an [`EntryPoints`] table.

pub use crate::dispatch::entry_points::{entry_point, EntryPoints, FnEntryPoint};
pub use crate::dispatch::error::DispatchError;
pub use crate::dispatch::loopback::{LoopbackExecutor, LoopbackRequest, DEFAULT_HANDOFF_TIMEOUT};
pub use crate::dispatch::task::TaskExecutor;
pub use crate::dispatch::traits::{DeferredExecutor, DeferredRequest, DispatchResult, EntryPoint};
