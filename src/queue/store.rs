//! Durable queue document and drain lock on top of a key/value store
//!
//! The item list lives in one JSON document at `hookwork/<queue>/items`. Every
//! mutation is a read-merge-write guarded by `compare_and_swap`, so appends
//! from a request and checkpoints from a drain pass never overwrite each other.
//! The single-flight drain lock is a second key holding an owner and expiry.

use crate::core::retry::{retry_async, RetryPolicy};
use crate::hooks::api::hook_name;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::item::{QueueItem, StoredItem};
use crate::storage::api::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Compare-and-swap rounds before a renewal gives up
const LOCK_RENEW_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueDocument {
    pub revision: u64,
    pub next_sequence: u64,
    pub items: Vec<StoredItem>,
}

/// Current holder of the drain lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    pub owner: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LockRecord {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Clone)]
pub struct QueueStore {
    name: String,
    kv: Arc<dyn KeyValueStore>,
    retry: RetryPolicy,
    items_key: String,
    lock_key: String,
}

impl QueueStore {
    pub fn new(name: &str, kv: Arc<dyn KeyValueStore>, retry: RetryPolicy) -> Self {
        Self {
            name: name.to_string(),
            items_key: hook_name(&[name, "items"]),
            lock_key: hook_name(&[name, "lock"]),
            kv,
            retry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items_key(&self) -> &str {
        &self.items_key
    }

    async fn load(&self) -> QueueResult<(Option<String>, QueueDocument)> {
        let raw = self.kv.get(&self.items_key).await?;
        let document = match raw.as_deref() {
            Some(content) => {
                serde_json::from_str(content).map_err(|source| QueueError::Corrupt {
                    queue: self.name.clone(),
                    source,
                })?
            }
            None => QueueDocument::default(),
        };
        Ok((raw, document))
    }

    /// One read-modify-CAS cycle; `Conflict` when another writer got there first
    async fn update_once<F, T>(&self, mutate: &F) -> QueueResult<T>
    where
        F: Fn(&mut QueueDocument) -> T,
    {
        let (raw, mut document) = self.load().await?;
        let result = mutate(&mut document);
        document.revision += 1;

        let encoded = serde_json::to_string(&document).map_err(|source| QueueError::Corrupt {
            queue: self.name.clone(),
            source,
        })?;
        let swapped = self
            .kv
            .compare_and_swap(&self.items_key, raw.as_deref(), Some(encoded))
            .await?;

        if swapped {
            Ok(result)
        } else {
            Err(QueueError::Conflict {
                queue: self.name.clone(),
            })
        }
    }

    async fn update<F, T>(&self, operation: &str, mutate: F) -> QueueResult<T>
    where
        F: Fn(&mut QueueDocument) -> T,
    {
        retry_async(
            operation,
            &self.retry,
            |e: &QueueError| matches!(e, QueueError::Conflict { .. }),
            || self.update_once(&mutate),
        )
        .await
    }

    /// Append items after whatever is already stored; returns their sequences
    pub async fn append(&self, items: &[QueueItem]) -> QueueResult<Vec<u64>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        self.update("queue_append", |document| {
            let now = Utc::now();
            items
                .iter()
                .map(|item| {
                    document.next_sequence += 1;
                    let sequence = document.next_sequence;
                    document.items.push(StoredItem {
                        sequence,
                        queued_at: now,
                        item: item.clone(),
                    });
                    sequence
                })
                .collect()
        })
        .await
    }

    /// Remove every item up to and including `sequence`; returns how many went
    pub async fn remove_through(&self, sequence: u64) -> QueueResult<usize> {
        self.update("queue_checkpoint", |document| {
            let before = document.items.len();
            document.items.retain(|item| item.sequence > sequence);
            before - document.items.len()
        })
        .await
    }

    pub async fn items(&self) -> QueueResult<Vec<StoredItem>> {
        Ok(self.load().await?.1.items)
    }

    pub async fn len(&self) -> QueueResult<usize> {
        Ok(self.load().await?.1.items.len())
    }

    pub async fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Drop every stored item, keeping the sequence counter
    pub async fn clear(&self) -> QueueResult<usize> {
        self.update("queue_clear", |document| {
            let removed = document.items.len();
            document.items.clear();
            removed
        })
        .await
    }

    async fn read_lock(&self) -> QueueResult<(Option<String>, Option<LockRecord>)> {
        let raw = self.kv.get(&self.lock_key).await?;
        let record = match raw.as_deref() {
            Some(content) => match serde_json::from_str::<LockRecord>(content) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Ignoring unreadable lock on queue '{}': {}", self.name, e);
                    None
                }
            },
            None => None,
        };
        Ok((raw, record))
    }

    /// Take the drain lock unless a live lock is held by someone else
    pub async fn acquire_lock(&self, owner: &str, ttl: Duration) -> QueueResult<bool> {
        let (raw, current) = self.read_lock().await?;
        if let Some(record) = &current {
            if !record.is_expired() && record.owner != owner {
                return Ok(false);
            }
            if record.is_expired() {
                log::warn!(
                    "Queue '{}' lock held by {} expired at {}, taking over",
                    self.name,
                    record.owner,
                    record.expires_at
                );
            }
        }

        let encoded = self.encode_lock(owner, Utc::now(), ttl)?;
        Ok(self
            .kv
            .compare_and_swap(&self.lock_key, raw.as_deref(), Some(encoded))
            .await?)
    }

    /// Push the expiry of `owner`'s lock `ttl` into the future
    ///
    /// Returns false once the lock belongs to someone else (or nobody), in
    /// which case the caller no longer has exclusive use of the queue.
    pub async fn renew_lock(&self, owner: &str, ttl: Duration) -> QueueResult<bool> {
        for _ in 0..LOCK_RENEW_ATTEMPTS {
            let (raw, current) = self.read_lock().await?;
            let Some(record) = current.filter(|record| record.owner == owner) else {
                return Ok(false);
            };
            let encoded = self.encode_lock(owner, record.acquired_at, ttl)?;
            if self
                .kv
                .compare_and_swap(&self.lock_key, raw.as_deref(), Some(encoded))
                .await?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn encode_lock(&self, owner: &str, acquired_at: DateTime<Utc>, ttl: Duration) -> QueueResult<String> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        let record = LockRecord {
            owner: owner.to_string(),
            acquired_at,
            expires_at: Utc::now() + ttl,
        };
        serde_json::to_string(&record).map_err(|source| QueueError::Corrupt {
            queue: self.name.clone(),
            source,
        })
    }

    /// Release the lock if `owner` still holds it
    pub async fn release_lock(&self, owner: &str) -> QueueResult<bool> {
        let (raw, current) = self.read_lock().await?;
        match current {
            Some(record) if record.owner == owner => Ok(self
                .kv
                .compare_and_swap(&self.lock_key, raw.as_deref(), None)
                .await?),
            _ => Ok(false),
        }
    }

    /// The live (unexpired) lock, if any
    pub async fn active_lock(&self) -> QueueResult<Option<LockRecord>> {
        let (_, record) = self.read_lock().await?;
        Ok(record.filter(|r| !r.is_expired()))
    }
}
