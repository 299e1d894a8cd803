//! Subcommand execution

use crate::app::cli::args::{Args, Command, OutputFormat, QueueCommand};
use crate::app::cli::display::{catalog_table, plan_table, queue_summary, queue_table, version_text};
use crate::app::cli::error::{CliError, CliResult};
use crate::config::api::{default_site_dir, ConfigStore};
use crate::dispatch::api::{
    DeferredExecutor, DispatchError, DispatchResult, EntryPoints, LoopbackExecutor, TaskExecutor,
};
use crate::hooks::api::HookManager;
use crate::module::api::{ActivationPlan, ModuleCatalog};
use crate::queue::api::{ActionQueue, QueueSettings};
use crate::storage::api::FileStore;
use prettytable::Table;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Run the parsed subcommand
pub async fn run(args: &Args, color: bool) -> CliResult<()> {
    match &args.command {
        Command::List { format } => list(*format, color),
        Command::Resolve { format } => resolve(args, *format, color),
        Command::Snapshot { output } => snapshot(args, output).await,
        Command::Queue { store, action } => queue(args, store.as_deref(), action, color).await,
        Command::Version => {
            println!("{}", version_text());
            Ok(())
        }
    }
}

/// Layered configuration for the CLI: `--dir` paths, the site directory,
/// then `--config-file`
pub fn load_config(args: &Args) -> CliResult<ConfigStore> {
    let site_dir = if args.no_site { None } else { default_site_dir() };
    let paths = ConfigStore::base_paths(&args.dirs, None, site_dir.as_deref());
    log::debug!("Configuration base paths: {:?}", paths);

    let mut store = ConfigStore::new();
    let loaded = store.load_base_paths(&paths)?;
    if let Some(file) = &args.config_file {
        store.load_file(file)?;
    }
    log::info!("Loaded {} configuration layer(s)", store.layers().len());
    log::debug!("{} layer(s) came from base paths", loaded);
    Ok(store)
}

fn print_table(table: &Table, color: bool) {
    if table.print_tty(color).is_err() {
        table.printstd();
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn list(format: OutputFormat, color: bool) -> CliResult<()> {
    let catalog = ModuleCatalog::with_builtins();
    let modules = catalog.module_features();
    match format {
        OutputFormat::Json => print_json(&modules),
        OutputFormat::Table => {
            print_table(&catalog_table(&modules, color), color);
            Ok(())
        }
    }
}

fn plan_for(args: &Args) -> CliResult<ActivationPlan> {
    let config = load_config(args)?;
    let catalog = ModuleCatalog::with_builtins();
    Ok(ActivationPlan::plan(catalog.descriptors(), &config.merged())?)
}

fn resolve(args: &Args, format: OutputFormat, color: bool) -> CliResult<()> {
    let plan = plan_for(args)?;
    match format {
        OutputFormat::Json => print_json(&plan),
        OutputFormat::Table => {
            if plan.is_empty() {
                println!("No modules enabled");
            } else {
                print_table(&plan_table(&plan, color), color);
            }
            Ok(())
        }
    }
}

async fn snapshot(args: &Args, output: &Path) -> CliResult<()> {
    let plan = plan_for(args)?;
    plan.snapshot().write(output).await?;
    println!("Wrote {} module(s) to {}", plan.len(), output.display());
    Ok(())
}

fn store_dir(store: Option<&Path>) -> CliResult<PathBuf> {
    store
        .map(Path::to_path_buf)
        .or_else(|| default_site_dir().map(|dir| dir.join("queue")))
        .ok_or_else(|| CliError::Usage {
            message: "no site directory available; pass --store".to_string(),
        })
}

/// Queue view over the file store, using the configured queue settings
async fn open_queue(
    settings: QueueSettings,
    root: PathBuf,
    executor: Arc<dyn DeferredExecutor>,
) -> CliResult<ActionQueue> {
    let kv = Arc::new(FileStore::open(root).await?);
    Ok(ActionQueue::new(
        settings,
        Arc::new(HookManager::new()),
        kv,
        executor,
    ))
}

async fn queue(
    args: &Args,
    store: Option<&Path>,
    action: &QueueCommand,
    color: bool,
) -> CliResult<()> {
    let settings = load_config(args)?.queue_settings()?;
    let root = store_dir(store)?;
    log::debug!("Queue '{}' stored under {}", settings.name, root.display());

    match action {
        QueueCommand::Status { format } => {
            let queue = open_queue(settings, root, local_executor()).await?;
            let items = queue.stored_items().await?;
            let lock = queue.is_processing().await?;
            match format {
                OutputFormat::Json => print_json(&json!({
                    "queue": queue.name(),
                    "items": items,
                    "lock": lock,
                })),
                OutputFormat::Table => {
                    println!("{}", queue_summary(queue.name(), items.len(), lock.as_ref(), color));
                    if !items.is_empty() {
                        print_table(&queue_table(&items, color), color);
                    }
                    Ok(())
                }
            }
        }
        QueueCommand::Drain { endpoint, token } => {
            let mut executor = LoopbackExecutor::new(endpoint)?;
            if let Some(token) = token {
                executor = executor.with_token(token.as_str());
            }
            let queue = open_queue(settings, root, Arc::new(executor)).await?;
            match queue.dispatch().await {
                DispatchResult::Dispatched => {
                    println!("Drain requested at {}", queue.drain_target());
                    Ok(())
                }
                DispatchResult::Skipped => {
                    println!("Drain skipped");
                    Ok(())
                }
                DispatchResult::Failed { reason } => {
                    Err(DispatchError::Client { message: reason }.into())
                }
            }
        }
        QueueCommand::Clear { yes } => {
            if !yes {
                return Err(CliError::Usage {
                    message: "refusing to clear the queue without --yes".to_string(),
                });
            }
            let queue = open_queue(settings, root, local_executor()).await?;
            let removed = queue.clear().await?;
            println!("Removed {} item(s) from '{}'", removed, queue.name());
            Ok(())
        }
    }
}

/// Executor for read-only queue commands; no entry points are registered
fn local_executor() -> Arc<dyn DeferredExecutor> {
    Arc::new(TaskExecutor::new(EntryPoints::new()))
}
