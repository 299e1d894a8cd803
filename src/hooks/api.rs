//! Public API for the hook system
//!
//! Modules, the queue and request events all talk to the host through the
//! [`EventBus`] trait. [`HookManager`] is the in-process implementation used
//! by the CLI and the test suites.

pub use crate::hooks::error::{HookError, HookResult};
pub use crate::hooks::manager::HookManager;
pub use crate::hooks::name::{hook_name, HookName, ROOT};
pub use crate::hooks::traits::{
    action, filter, ActionHandler, ActionOutcome, EventBus, FilterHandler, HookFailure,
    SubscriptionId, DEFAULT_PRIORITY,
};
