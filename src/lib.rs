//! hookwork: module activation and a durable background action queue for
//! hook-driven hosts.
//!
//! A host builds [`bootstrap::HostServices`], then [`bootstrap::Host::boot`]
//! resolves the configured modules, activates their features in dependency
//! order and wires the background queue to the host's event bus.

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod events;
pub mod hooks;
pub mod module;
pub mod queue;
pub mod storage;
