//! Tokio task backend for deferred execution

use crate::dispatch::entry_points::EntryPoints;
use crate::dispatch::traits::{DeferredExecutor, DeferredRequest, DispatchResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Notify;

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Runs each request on a detached tokio task in the current runtime
///
/// The caller's future is never tied to the spawned work: dropping it, or the
/// request that issued it finishing, does not cancel the pass.
#[derive(Clone)]
pub struct TaskExecutor {
    entry_points: EntryPoints,
    in_flight: Arc<InFlight>,
}

impl TaskExecutor {
    pub fn new(entry_points: EntryPoints) -> Self {
        Self {
            entry_points,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    /// Number of spawned passes that have not finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Wait until no spawned pass is running
    ///
    /// A pass that triggers a follow-up keeps the executor busy, so this also
    /// waits for self-chained passes.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl DeferredExecutor for TaskExecutor {
    async fn trigger(&self, request: DeferredRequest) -> DispatchResult {
        if !self.entry_points.contains(&request.target) {
            return DispatchResult::failed(format!(
                "no entry point registered for '{}'",
                request.target
            ));
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => return DispatchResult::failed(format!("no tokio runtime: {e}")),
        };

        let entry_points = self.entry_points.clone();
        let in_flight = self.in_flight.clone();
        in_flight.count.fetch_add(1, Ordering::SeqCst);

        log::debug!("Spawning deferred task for '{}'", request.target);
        handle.spawn(async move {
            if let Err(e) = entry_points.handle(&request.target, request.payload).await {
                log::error!("Deferred task '{}' failed: {}", request.target, e);
            }
            if in_flight.count.fetch_sub(1, Ordering::SeqCst) == 1 {
                in_flight.idle.notify_waiters();
            }
        });

        DispatchResult::Dispatched
    }
}
