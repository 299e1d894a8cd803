//! Background processing module
//!
//! Exposes the queue and request-event primitives to hosts:
//! - init: `hookwork/save_background_queue` saves and dispatches pending items
//! - `settings_saved_request_event`: `hookwork/settings_saved` fires the
//!   `after_save_settings` background event
//! - `record_saved_queue_event`: `hookwork/record_saved` queues
//!   `after_save_record` (fanned out per record kind)
//! - `reprocess_records_after_settings_saved`: the `after_save_settings`
//!   background event queues `after_save_record` for every record

use crate::builtin_module;
use crate::dispatch::api::{entry_point, DispatchError, EntryPoints};
use crate::events::api::{BackgroundRequestEvent, RecordSavedEvent};
use crate::hooks::api::{action, hook_name, HookError, HookResult, DEFAULT_PRIORITY};
use crate::module::context::ModuleContext;
use crate::module::descriptor::ModuleDescriptor;
use crate::module::error::{ModuleError, ModuleResult};
use crate::module::traits::{FeatureTable, Module};
use crate::queue::api::{ActionQueue, QueueError, RecordQuery};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, PoisonError};

pub const BACKGROUND_PROCESSING: &str = "background_processing";

/// Host hook announcing that site settings were saved
pub const SETTINGS_SAVED_HOOK: &str = "settings_saved";

/// Hook hosts fire at the end of a request to persist queued work
pub const SAVE_BACKGROUND_QUEUE_HOOK: &str = "save_background_queue";

const SETTINGS_EVENT_SUFFIX: &str = "after_save_settings";

const SETTINGS_EVENT_FEATURE: &str = "settings_saved_request_event";
const RECORD_EVENT_FEATURE: &str = "record_saved_queue_event";
const REPROCESS_FEATURE: &str = "reprocess_records_after_settings_saved";

type Held<T> = Arc<Mutex<Vec<Arc<T>>>>;

pub struct BackgroundProcessing {
    request_events: Held<BackgroundRequestEvent>,
    queue_events: Held<RecordSavedEvent>,
    features: FeatureTable,
}

impl BackgroundProcessing {
    pub fn descriptor() -> ModuleDescriptor {
        ModuleDescriptor::new(BACKGROUND_PROCESSING)
            .with_description("Durable background queue and one-shot background events")
            .enabled_by_default()
            .with_default_feature(SETTINGS_EVENT_FEATURE)
            .with_default_feature(RECORD_EVENT_FEATURE)
            .with_feature(REPROCESS_FEATURE)
    }

    pub fn build(ctx: &ModuleContext) -> ModuleResult<Box<dyn Module>> {
        Ok(Box::new(Self::new(ctx)))
    }

    pub fn new(ctx: &ModuleContext) -> Self {
        let request_events: Held<BackgroundRequestEvent> = Arc::default();
        let queue_events: Held<RecordSavedEvent> = Arc::default();

        let features = FeatureTable::new()
            .with(SETTINGS_EVENT_FEATURE, {
                let ctx = ctx.clone();
                let held = request_events.clone();
                move || {
                    let event = settings_saved_request_event(&ctx);
                    lock(&held).push(event);
                    Ok(())
                }
            })
            .with(RECORD_EVENT_FEATURE, {
                let ctx = ctx.clone();
                let held = queue_events.clone();
                move || {
                    let event = Arc::new(RecordSavedEvent::new(ctx.queue().clone()));
                    event.listen(&**ctx.bus());
                    lock(&held).push(event);
                    Ok(())
                }
            })
            .with(REPROCESS_FEATURE, {
                let ctx = ctx.clone();
                move || reprocess_records_after_settings_saved(&ctx)
            });

        Self {
            request_events,
            queue_events,
            features,
        }
    }

    /// The `after_save_settings` event, once its feature ran
    pub fn settings_event(&self) -> Option<Arc<BackgroundRequestEvent>> {
        lock(&self.request_events)
            .iter()
            .find(|event| event.suffix() == SETTINGS_EVENT_SUFFIX)
            .cloned()
    }

    pub fn record_event(&self) -> Option<Arc<RecordSavedEvent>> {
        lock(&self.queue_events).first().cloned()
    }
}

#[async_trait::async_trait]
impl Module for BackgroundProcessing {
    fn id(&self) -> &str {
        BACKGROUND_PROCESSING
    }

    async fn init(&mut self, ctx: &ModuleContext) -> ModuleResult<()> {
        let queue = Arc::downgrade(ctx.queue());
        ctx.bus().add_action(
            &hook_name(&[SAVE_BACKGROUND_QUEUE_HOOK]),
            DEFAULT_PRIORITY,
            action(move |_args: &[Value]| {
                let Some(queue) = queue.upgrade() else {
                    log::warn!("'{}' fired after the queue was dropped", SAVE_BACKGROUND_QUEUE_HOOK);
                    return Ok(());
                };
                if !queue.has_pending() {
                    return Ok(());
                }
                spawn(async move {
                    if let Err(e) = queue.save_and_dispatch().await {
                        log::error!("Saving background queue '{}' failed: {}", queue.name(), e);
                    }
                })
            }),
        );
        Ok(())
    }

    fn features(&self) -> &FeatureTable {
        &self.features
    }
}

builtin_module!(BackgroundProcessing::descriptor, BackgroundProcessing::build);

fn lock<T>(held: &Held<T>) -> std::sync::MutexGuard<'_, Vec<Arc<T>>> {
    held.lock().unwrap_or_else(PoisonError::into_inner)
}

fn spawn<F>(future: F) -> HookResult<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|_| HookError::failed("no async runtime available"))?;
    handle.spawn(future);
    Ok(())
}

fn settings_saved_request_event(ctx: &ModuleContext) -> Arc<BackgroundRequestEvent> {
    let event = Arc::new(BackgroundRequestEvent::new(
        SETTINGS_EVENT_SUFFIX,
        &[],
        ctx.bus().clone(),
        ctx.executor().clone(),
    ));
    register_request_entry_point(&event, ctx.queue(), ctx.entry_points());

    let weak = Arc::downgrade(&event);
    ctx.bus().add_action(
        &hook_name(&[SETTINGS_SAVED_HOOK]),
        DEFAULT_PRIORITY,
        action(move |_args: &[Value]| {
            let Some(event) = weak.upgrade() else {
                log::warn!("'{}' fired after its request event was dropped", SETTINGS_SAVED_HOOK);
                return Ok(());
            };
            spawn(async move {
                event.dispatch_if_registered(&Map::new()).await;
            })
        }),
    );
    event
}

/// Out-of-band side of a request event: run its hook, then persist whatever
/// the subscribers queued
fn register_request_entry_point(
    event: &Arc<BackgroundRequestEvent>,
    queue: &Arc<ActionQueue>,
    entry_points: &EntryPoints,
) {
    let target = event.hook_name();
    let event = Arc::downgrade(event);
    let queue = Arc::downgrade(queue);
    let entry_target = target.clone();

    entry_points.register(
        target,
        entry_point(move |payload: Value| {
            let event = event.upgrade();
            let queue = queue.upgrade();
            let target = entry_target.clone();
            async move {
                match event {
                    Some(event) => {
                        event.handle(&payload);
                    }
                    None => log::warn!("Request '{}' arrived after its event was dropped", target),
                }
                if let Some(queue) = queue.filter(|queue| queue.has_pending()) {
                    queue
                        .save_and_dispatch()
                        .await
                        .map_err(|e| DispatchError::EntryFailed {
                            target,
                            message: e.to_string(),
                        })?;
                }
                Ok(())
            }
            .boxed()
        }),
    );
}

fn reprocess_records_after_settings_saved(ctx: &ModuleContext) -> ModuleResult<()> {
    let records = ctx.records().cloned().ok_or_else(|| {
        ModuleError::runtime(
            BACKGROUND_PROCESSING,
            &format!("feature '{REPROCESS_FEATURE}'"),
            QueueError::MissingRecordSource {
                action: RecordSavedEvent::HOOK_SUFFIX.to_string(),
            },
        )
    })?;
    let queue = Arc::downgrade(ctx.queue());

    ctx.bus().add_action(
        &hook_name(&["background_event", SETTINGS_EVENT_SUFFIX]),
        DEFAULT_PRIORITY,
        action(move |_args: &[Value]| {
            let Some(queue) = queue.upgrade() else {
                log::warn!("Skipping record reprocessing: the queue has been dropped");
                return Ok(());
            };
            let event = RecordSavedEvent::new(queue);
            let accepted: usize = records
                .find(&RecordQuery::default())
                .iter()
                .map(|record| event.on_record_saved(record.id, &record.kind))
                .sum();
            log::info!("Queued {} record reprocessing item(s)", accepted);
            Ok(())
        }),
    );
    Ok(())
}
