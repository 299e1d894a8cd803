//! Table rendering for CLI output

use crate::core::styles::StyleRole;
use crate::core::version::{build_time, get_api_version, git_hash};
use crate::module::api::{ActivationPlan, ModuleFeatures};
use crate::queue::api::{LockRecord, StoredItem};
use prettytable::{format, Cell, Row, Table};

fn cell(text: &str, role: StyleRole, color: bool) -> Cell {
    let cell = Cell::new(text);
    match role.to_prettytable_spec() {
        Some(spec) if color => cell.style_spec(&spec),
        _ => cell,
    }
}

fn titled(titles: &[&str], color: bool) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(Row::new(
        titles
            .iter()
            .map(|title| cell(title, StyleRole::Header, color))
            .collect(),
    ));
    table
}

fn on_off(enabled: bool, color: bool) -> Cell {
    if enabled {
        cell("on", StyleRole::Enabled, color)
    } else {
        cell("off", StyleRole::Disabled, color)
    }
}

/// Catalog listing; default-on features are marked with `*`
pub fn catalog_table(modules: &[ModuleFeatures], color: bool) -> Table {
    let mut table = titled(&["Module", "Default", "Requires", "Features", "Description"], color);
    for module in modules {
        let features = module
            .features
            .iter()
            .map(|feature| {
                if feature.default_enabled {
                    format!("{}*", feature.name)
                } else {
                    feature.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(Row::new(vec![
            cell(&module.id, StyleRole::Module, color),
            on_off(module.default_enabled, color),
            cell(&module.dependencies.join(", "), StyleRole::Value, color),
            cell(&features, StyleRole::Feature, color),
            cell(&module.description, StyleRole::Value, color),
        ]));
    }
    table
}

pub fn plan_table(plan: &ActivationPlan, color: bool) -> Table {
    let mut table = titled(&["#", "Module", "Reason", "Features"], color);
    for (position, module) in plan.modules.iter().enumerate() {
        let reason = if module.forced {
            cell("dependency", StyleRole::Forced, color)
        } else {
            cell("configured", StyleRole::Value, color)
        };
        table.add_row(Row::new(vec![
            Cell::new(&(position + 1).to_string()),
            cell(&module.id, StyleRole::Module, color),
            reason,
            cell(&module.features.join(", "), StyleRole::Feature, color),
        ]));
    }
    table
}

pub fn queue_table(items: &[StoredItem], color: bool) -> Table {
    let mut table = titled(&["Seq", "Action", "Queued", "Args"], color);
    for item in items {
        table.add_row(Row::new(vec![
            Cell::new(&item.sequence.to_string()),
            cell(&item.item.action, StyleRole::Module, color),
            Cell::new(&item.queued_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::new(&serde_json::Value::Array(item.item.args.clone()).to_string()),
        ]));
    }
    table
}

/// One-line summary above the queue table; `lock` is the active lock, if any
pub fn queue_summary(name: &str, items: usize, lock: Option<&LockRecord>, color: bool) -> String {
    let state = match lock {
        Some(lock) => StyleRole::Forced.paint(
            &format!("draining ({}, until {})", lock.owner, lock.expires_at.format("%H:%M:%S")),
            color,
        ),
        None => StyleRole::Disabled.paint("idle", color),
    };
    format!(
        "{} {}: {} item(s), {}",
        StyleRole::Header.paint("Queue", color),
        StyleRole::Module.paint(name, color),
        items,
        state
    )
}

pub fn version_text() -> String {
    format!(
        "hookwork {}\nmodule API {}\nbuilt {} ({})",
        env!("CARGO_PKG_VERSION"),
        get_api_version(),
        build_time(),
        git_hash()
    )
}
