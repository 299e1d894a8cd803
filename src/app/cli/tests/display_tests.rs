use crate::app::cli::display::*;
use crate::module::api::{ActivationPlan, FeatureDescriptor, ModuleFeatures, PlannedModule};
use crate::queue::api::{LockRecord, QueueItem, StoredItem};
use chrono::{Duration, Utc};
use serde_json::json;

#[test]
fn test_catalog_table_marks_default_features() {
    let modules = vec![ModuleFeatures {
        id: "seo".to_string(),
        description: "Search metadata".to_string(),
        default_enabled: true,
        dependencies: vec!["content".to_string()],
        features: vec![
            FeatureDescriptor::new("schema").enabled_by_default(),
            FeatureDescriptor::new("sitemap"),
        ],
    }];

    let rendered = catalog_table(&modules, false).to_string();
    assert!(rendered.contains("seo"));
    assert!(rendered.contains("schema*"));
    assert!(rendered.contains("sitemap"));
    assert!(!rendered.contains("sitemap*"));
    assert!(rendered.contains("content"));
    assert!(rendered.contains("on"));
}

#[test]
fn test_plan_table_shows_reason() {
    let plan = ActivationPlan {
        modules: vec![
            PlannedModule {
                id: "content".to_string(),
                features: vec![],
                forced: true,
            },
            PlannedModule {
                id: "seo".to_string(),
                features: vec!["schema".to_string()],
                forced: false,
            },
        ],
    };

    let rendered = plan_table(&plan, false).to_string();
    assert!(rendered.contains("dependency"));
    assert!(rendered.contains("configured"));
    let content = rendered.find("content").unwrap();
    let seo = rendered.find("seo").unwrap();
    assert!(content < seo);
}

#[test]
fn test_queue_table_lists_items() {
    let items = vec![StoredItem {
        sequence: 4,
        queued_at: Utc::now(),
        item: QueueItem::new("reindex", vec![json!(12)]),
    }];

    let rendered = queue_table(&items, false).to_string();
    assert!(rendered.contains("reindex"));
    assert!(rendered.contains("[12]"));
    assert!(rendered.contains('4'));
}

#[test]
fn test_queue_summary() {
    assert_eq!(
        queue_summary("background", 0, None, false),
        "Queue background: 0 item(s), idle"
    );

    let now = Utc::now();
    let lock = LockRecord {
        owner: "worker-1".to_string(),
        acquired_at: now,
        expires_at: now + Duration::seconds(60),
    };
    let summary = queue_summary("background", 3, Some(&lock), false);
    assert!(summary.starts_with("Queue background: 3 item(s), draining (worker-1, until "));
}

#[test]
fn test_version_text() {
    let text = version_text();
    assert!(text.starts_with(&format!("hookwork {}", env!("CARGO_PKG_VERSION"))));
    assert!(text.contains("module API"));
}
