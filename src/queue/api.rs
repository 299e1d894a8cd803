//! Public API for the background action queue

pub use crate::queue::bulk::{Record, RecordQuery, RecordSource, StaticRecords};
pub use crate::queue::drain::{DrainOutcome, DrainReport};
pub use crate::queue::error::{QueueError, QueueResult};
pub use crate::queue::item::{QueueItem, StoredItem};
pub use crate::queue::manager::ActionQueue;
pub use crate::queue::settings::{CeilingProbe, DrainBudget, QueueSettings, DEFAULT_QUEUE_NAME};
pub use crate::queue::store::{LockRecord, QueueDocument, QueueStore};
