//! Hierarchical hook names
//!
//! Every name the crate puts on the bus starts with [`ROOT`]; parts are joined
//! with `/` and empty parts are dropped, so `hook_name(&["background_queue", ""])`
//! and `hook_name(&["background_queue"])` name the same hook.

use std::fmt;

/// Root segment shared by all hook names
pub const ROOT: &str = "hookwork";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookName(String);

impl HookName {
    /// Build a name below [`ROOT`] from the given parts
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::root().join_all(parts)
    }

    pub fn root() -> Self {
        HookName(ROOT.to_string())
    }

    /// Append one part, ignoring it when empty
    pub fn join(&self, part: &str) -> Self {
        let part = part.trim_matches('/');
        if part.is_empty() {
            return self.clone();
        }
        HookName(format!("{}/{}", self.0, part))
    }

    pub fn join_all<I, S>(&self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        parts
            .into_iter()
            .fold(self.clone(), |name, part| name.join(part.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HookName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<HookName> for String {
    fn from(name: HookName) -> Self {
        name.0
    }
}

/// Shorthand for `HookName::new(parts).into_string()`
pub fn hook_name(parts: &[&str]) -> String {
    HookName::new(parts).into_string()
}
