//! Shared helpers for integration tests

#![allow(dead_code)]

use hookwork::bootstrap::HostServices;
use hookwork::dispatch::api::{EntryPoints, TaskExecutor};
use hookwork::hooks::api::HookManager;
use hookwork::storage::api::KeyValueStore;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// In-process services that keep a handle on the task executor
pub fn task_services(kv: Arc<dyn KeyValueStore>) -> (HostServices, Arc<TaskExecutor>) {
    let entry_points = EntryPoints::new();
    let executor = Arc::new(TaskExecutor::new(entry_points.clone()));
    let services = HostServices {
        bus: Arc::new(HookManager::new()),
        kv,
        executor: executor.clone(),
        entry_points,
        records: None,
    };
    (services, executor)
}

pub fn write_file(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
