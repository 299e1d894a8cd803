//! Drain pass: the out-of-band side of the action queue

use crate::dispatch::api::{entry_point, DispatchError, DispatchResult, EntryPoints};
use crate::queue::error::QueueResult;
use crate::queue::item::StoredItem;
use crate::queue::manager::ActionQueue;
use crate::queue::settings::DrainBudget;
use crate::queue::store::QueueStore;
use futures::FutureExt;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

static PASS_COUNTER: AtomicU64 = AtomicU64::new(0);

/// How a drain pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Queue emptied, completion hook fired
    Completed,
    /// Items remain; another pass was requested
    Chained { redispatch: DispatchResult },
    /// Another pass holds the lock, nothing was done
    Locked,
    /// The lock expired mid-pass and was taken over; unsaved progress is
    /// left for the new holder
    LockLost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub processed: usize,
    pub discarded: usize,
    pub failed: usize,
    pub remaining: usize,
    pub budget_exhausted: bool,
    pub outcome: DrainOutcome,
}

impl DrainReport {
    fn locked() -> Self {
        Self {
            processed: 0,
            discarded: 0,
            failed: 0,
            remaining: 0,
            budget_exhausted: false,
            outcome: DrainOutcome::Locked,
        }
    }

    pub fn attempted(&self) -> usize {
        self.processed + self.discarded + self.failed
    }
}

#[derive(Default)]
struct Progress {
    processed: usize,
    discarded: usize,
    failed: usize,
    budget_exhausted: bool,
}

/// Keeps the drain lock alive while a pass runs
///
/// The heartbeat renews every third of the TTL. Once a renewal finds another
/// owner the lease is marked lost and the pass stops before its next item.
struct LockLease {
    lost: Arc<AtomicBool>,
    stop: Option<oneshot::Sender<()>>,
    heartbeat: JoinHandle<()>,
}

impl LockLease {
    fn start(store: QueueStore, owner: String, ttl: Duration) -> Self {
        let lost = Arc::new(AtomicBool::new(false));
        let (stop, mut stopped) = oneshot::channel();
        let flag = lost.clone();
        let period = (ttl / 3).max(Duration::from_millis(1));

        let heartbeat = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {}
                }
                match store.renew_lock(&owner, ttl).await {
                    Ok(true) => log::trace!("Renewed lock on queue '{}'", store.name()),
                    Ok(false) => {
                        log::warn!("Lost lock on queue '{}' to another pass", store.name());
                        flag.store(true, Ordering::SeqCst);
                        break;
                    }
                    Err(e) => log::warn!("Could not renew lock on queue '{}': {}", store.name(), e),
                }
            }
        });

        Self {
            lost,
            stop: Some(stop),
            heartbeat,
        }
    }

    fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    fn mark_lost(&self) {
        self.lost.store(true, Ordering::SeqCst);
    }

    /// Stop the heartbeat and wait for an in-flight renewal; true when lost
    async fn finish(mut self) -> bool {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.heartbeat).await {
            if !e.is_cancelled() {
                log::warn!("Lock heartbeat ended abnormally: {}", e);
            }
        }
        self.is_lost()
    }
}

impl Drop for LockLease {
    fn drop(&mut self) {
        self.heartbeat.abort();
    }
}

impl Progress {
    fn attempted(&self) -> usize {
        self.processed + self.discarded + self.failed
    }
}

fn next_owner() -> String {
    format!(
        "pass-{}-{}-{}",
        std::process::id(),
        chrono::Utc::now().timestamp_micros(),
        PASS_COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

impl ActionQueue {
    /// Process stored items oldest first until the queue is empty or the
    /// budget runs out
    ///
    /// Items whose action has no handler in this context are discarded.
    /// Handler failures are logged and the item is removed like any other.
    /// Processed items are removed from the store every
    /// `checkpoint_interval` items, so a crash repeats at most that many.
    /// The lock is renewed while the pass runs; if another pass takes it
    /// over anyway, this one stops and reports [`DrainOutcome::LockLost`].
    pub async fn drain(&self, budget: &DrainBudget) -> QueueResult<DrainReport> {
        let owner = next_owner();
        if !self
            .store
            .acquire_lock(&owner, self.settings.lock_ttl)
            .await?
        {
            log::debug!("Queue '{}' is locked, skipping drain", self.settings.name);
            return Ok(DrainReport::locked());
        }

        let lease = LockLease::start(self.store.clone(), owner.clone(), self.settings.lock_ttl);
        let result = self.drain_locked(&owner, budget, &lease).await;
        let lost = lease.finish().await;

        let progress = match result {
            Ok(progress) => progress,
            Err(e) => {
                if !lost {
                    if let Err(release_error) = self.store.release_lock(&owner).await {
                        log::warn!(
                            "Could not release lock on queue '{}': {}",
                            self.settings.name,
                            release_error
                        );
                    }
                }
                return Err(e);
            }
        };

        if lost {
            let report = DrainReport {
                processed: progress.processed,
                discarded: progress.discarded,
                failed: progress.failed,
                remaining: self.store.len().await?,
                budget_exhausted: progress.budget_exhausted,
                outcome: DrainOutcome::LockLost,
            };
            log::warn!(
                "Queue '{}' pass ended after losing its lock: {} processed, {} left to the new holder",
                self.settings.name,
                report.processed,
                report.remaining
            );
            return Ok(report);
        }
        self.store.release_lock(&owner).await?;

        let remaining = self.store.len().await?;
        let outcome = if remaining == 0 {
            let complete = self.complete_hook();
            self.bus.do_action(&complete, &[]);
            DrainOutcome::Completed
        } else {
            DrainOutcome::Chained {
                redispatch: self.dispatch().await,
            }
        };

        let report = DrainReport {
            processed: progress.processed,
            discarded: progress.discarded,
            failed: progress.failed,
            remaining,
            budget_exhausted: progress.budget_exhausted,
            outcome,
        };
        log::info!(
            "Drained queue '{}': {} processed, {} discarded, {} failed, {} remaining",
            self.settings.name,
            report.processed,
            report.discarded,
            report.failed,
            report.remaining
        );
        Ok(report)
    }

    async fn drain_locked(
        &self,
        owner: &str,
        budget: &DrainBudget,
        lease: &LockLease,
    ) -> QueueResult<Progress> {
        let started = Instant::now();
        let interval = self.settings.checkpoint_interval.max(1);
        let mut progress = Progress::default();
        let mut last_sequence: Option<u64> = None;
        let mut unsaved = 0;

        'pass: loop {
            // Reload each round to pick up items appended while we worked
            let batch: Vec<StoredItem> = self
                .store
                .items()
                .await?
                .into_iter()
                .filter(|item| last_sequence.map_or(true, |seen| item.sequence > seen))
                .collect();
            if batch.is_empty() {
                break;
            }

            for item in batch {
                if lease.is_lost() {
                    break 'pass;
                }
                self.process_item(&item, &mut progress).await;
                last_sequence = Some(item.sequence);
                unsaved += 1;

                if unsaved >= interval {
                    if !self.checkpoint(owner, item.sequence, lease).await? {
                        break 'pass;
                    }
                    unsaved = 0;
                }

                if budget.is_exhausted(started, progress.attempted()) {
                    progress.budget_exhausted = true;
                    break 'pass;
                }
            }
        }

        if unsaved > 0 && !lease.is_lost() {
            if let Some(sequence) = last_sequence {
                self.checkpoint(owner, sequence, lease).await?;
            }
        }
        Ok(progress)
    }

    /// Renew the lock, then remove everything through `sequence`
    ///
    /// Returns false without touching the items when the lock has passed to
    /// another owner.
    async fn checkpoint(&self, owner: &str, sequence: u64, lease: &LockLease) -> QueueResult<bool> {
        if lease.is_lost() || !self.store.renew_lock(owner, self.settings.lock_ttl).await? {
            lease.mark_lost();
            log::warn!(
                "Queue '{}' lock lost before checkpoint at #{}",
                self.settings.name,
                sequence
            );
            return Ok(false);
        }
        self.store.remove_through(sequence).await?;
        Ok(true)
    }

    async fn process_item(&self, item: &StoredItem, progress: &mut Progress) {
        let hook = self.task_hook(&item.item.action);
        if !self.bus.has_action(&hook) {
            log::warn!(
                "Discarding queued '{}' (#{}): no task registered on '{}'",
                item.item.action,
                item.sequence,
                hook
            );
            progress.discarded += 1;
            return;
        }

        // Handlers are synchronous; run them off the runtime so the lock
        // heartbeat keeps ticking
        let bus = self.bus.clone();
        let args = item.item.args.clone();
        let outcome = match tokio::task::spawn_blocking(move || bus.do_action(&hook, &args)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!(
                    "Task '{}' (#{}) did not finish: {}",
                    item.item.action,
                    item.sequence,
                    e
                );
                progress.failed += 1;
                return;
            }
        };

        if outcome.is_success() {
            log::debug!("Processed '{}' (#{})", item.item.action, item.sequence);
            progress.processed += 1;
        } else {
            for failure in &outcome.failures {
                log::error!(
                    "Task '{}' (#{}) failed: {}",
                    failure.hook,
                    item.sequence,
                    failure.error
                );
            }
            progress.failed += 1;
        }
    }

    /// Bind this queue's drain pass to its entry point target
    pub fn register_entry_point(self: &Arc<Self>, entry_points: &EntryPoints) {
        let target = self.drain_target();
        let queue = Arc::downgrade(self);
        let entry_target = target.clone();

        entry_points.register(
            target,
            entry_point(move |_payload: Value| {
                let queue = queue.clone();
                let target = entry_target.clone();
                async move {
                    let queue = queue.upgrade().ok_or_else(|| DispatchError::EntryFailed {
                        target: target.clone(),
                        message: "queue has been dropped".to_string(),
                    })?;
                    let failed = |e: crate::queue::error::QueueError| DispatchError::EntryFailed {
                        target: target.clone(),
                        message: e.to_string(),
                    };
                    queue.drain(&queue.budget()).await.map_err(failed)?;
                    // handlers may have enqueued follow-up work in this context
                    if queue.has_pending() {
                        queue.save_and_dispatch().await.map_err(failed)?;
                    }
                    Ok(())
                }
                .boxed()
            }),
        );
    }
}
