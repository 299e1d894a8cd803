//! Background Action Queue
//!
//! A durable FIFO of `{action, args}` items. Requests enqueue work for actions
//! that currently have a task handler, `save()` appends it to a
//! [`KeyValueStore`](crate::storage::api::KeyValueStore), and `dispatch()`
//! starts an out-of-band drain pass through a
//! [`DeferredExecutor`](crate::dispatch::api::DeferredExecutor).
//!
//! ```text
//!  request                          durable store                drain pass
//! ┌──────────────┐  save()   ┌──────────────────────────┐  items  ┌─────────────┐
//! │ enqueue(...) ├──────────►│ hookwork/<queue>/items   ├────────►│ handlers    │
//! │ pending batch│           │ hookwork/<queue>/lock    │◄────────┤ checkpoint  │
//! └──────┬───────┘           └──────────────────────────┘ remove  └──────┬──────┘
//!        │ dispatch()                                                    │ budget hit
//!        └──────────────────────► DeferredExecutor ◄─────────────────────┘ re-dispatch
//! ```
//!
//! Delivery is at-least-once: an item leaves the store only after the
//! checkpoint that follows its handlers has been saved.

// Internal modules - all access should go through api module
pub(crate) mod bulk;
pub(crate) mod drain;
pub(crate) mod error;
pub(crate) mod item;
pub(crate) mod manager;
pub(crate) mod settings;
pub(crate) mod store;

// Public API module - the only public interface for the queue
pub mod api;

#[cfg(test)]
mod tests;
