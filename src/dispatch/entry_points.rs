//! Table of named entry points for incoming deferred requests

use crate::dispatch::error::DispatchError;
use crate::dispatch::traits::EntryPoint;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// [`EntryPoint`] backed by a closure returning a boxed future
pub struct FnEntryPoint<F> {
    run: F,
}

#[async_trait]
impl<F> EntryPoint for FnEntryPoint<F>
where
    F: Fn(Value) -> BoxFuture<'static, Result<(), DispatchError>> + Send + Sync,
{
    async fn run(&self, payload: Value) -> Result<(), DispatchError> {
        (self.run)(payload).await
    }
}

/// Wrap a closure as a shareable entry point
pub fn entry_point<F>(run: F) -> Arc<dyn EntryPoint>
where
    F: Fn(Value) -> BoxFuture<'static, Result<(), DispatchError>> + Send + Sync + 'static,
{
    Arc::new(FnEntryPoint { run })
}

#[derive(Clone, Default)]
pub struct EntryPoints {
    entries: Arc<RwLock<HashMap<String, Arc<dyn EntryPoint>>>>,
}

impl EntryPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `target`, replacing any previous binding
    pub fn register(&self, target: impl Into<String>, entry: Arc<dyn EntryPoint>) {
        let target = target.into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.insert(target.clone(), entry).is_some() {
            log::warn!("Entry point '{}' replaced an existing binding", target);
        } else {
            log::debug!("Entry point '{}' registered", target);
        }
    }

    pub fn get(&self, target: &str) -> Option<Arc<dyn EntryPoint>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(target).cloned()
    }

    pub fn contains(&self, target: &str) -> bool {
        self.get(target).is_some()
    }

    pub fn targets(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut targets: Vec<String> = entries.keys().cloned().collect();
        targets.sort();
        targets
    }

    /// Run the entry point bound to `target`
    pub async fn handle(&self, target: &str, payload: Value) -> Result<(), DispatchError> {
        let entry = self
            .get(target)
            .ok_or_else(|| DispatchError::UnknownTarget {
                target: target.to_string(),
            })?;
        entry.run(payload).await
    }
}

impl std::fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPoints")
            .field("targets", &self.targets())
            .finish()
    }
}
