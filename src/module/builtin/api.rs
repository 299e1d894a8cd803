//! Compile-time registration of built-in modules
//!
//! Modules use the `builtin_module!` macro to submit a descriptor function
//! and a factory; `builtin_modules()` collects them.

use crate::module::context::ModuleContext;
use crate::module::descriptor::ModuleDescriptor;
use crate::module::error::ModuleResult;
use crate::module::traits::Module;

/// Entry for a built-in module in the static registry
pub struct BuiltinModuleEntry {
    pub descriptor: fn() -> ModuleDescriptor,
    pub factory: fn(&ModuleContext) -> ModuleResult<Box<dyn Module>>,
}

inventory::collect!(BuiltinModuleEntry);

/// Register a built-in module
///
/// ```rust,ignore
/// builtin_module!(descriptor, BackgroundProcessing::build);
/// ```
#[macro_export]
macro_rules! builtin_module {
    ($descriptor:expr, $factory:expr) => {
        inventory::submit!($crate::module::api::BuiltinModuleEntry {
            descriptor: $descriptor,
            factory: $factory,
        });
    };
}

/// Every registered built-in, ordered by identifier
///
/// Link order is not stable, so the identifier decides catalog order.
pub fn builtin_modules() -> Vec<&'static BuiltinModuleEntry> {
    let mut entries: Vec<&'static BuiltinModuleEntry> =
        inventory::iter::<BuiltinModuleEntry>.into_iter().collect();
    entries.sort_by_key(|entry| (entry.descriptor)().id);
    entries
}
