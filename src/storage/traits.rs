//! Durable key/value storage port

use crate::storage::error::StorageResult;
use async_trait::async_trait;

/// String-keyed store of opaque string blobs
///
/// Implementations must give read-after-write consistency within one process.
/// `compare_and_swap` is the only primitive the queue relies on for
/// concurrent writers: it replaces the value only when the current value is
/// exactly `expected` (`None` meaning absent), and `new = None` deletes.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> StorageResult<()>;

    /// Delete `key`; false when it did not exist
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: Option<String>,
    ) -> StorageResult<bool>;
}
