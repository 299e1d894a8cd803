//! Public API for durable key/value storage

pub use crate::storage::error::{StorageError, StorageResult};
pub use crate::storage::file::FileStore;
pub use crate::storage::memory::MemoryStore;
pub use crate::storage::traits::KeyValueStore;
