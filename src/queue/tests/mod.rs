mod drain;
mod queue_store;
mod support;
