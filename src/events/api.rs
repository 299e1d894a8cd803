//! Public API for background events
//!
//! A [`BackgroundRequestEvent`] is a one-shot, non-persisted out-of-band call;
//! a [`RecordSavedEvent`] turns a host hook into durable queue items.

pub use crate::events::record_saved::{RecordSavedEvent, RECORD_SAVED_HOOK};
pub use crate::events::request::BackgroundRequestEvent;
