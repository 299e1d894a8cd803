//! Command line arguments
//!
//! Global options come first and apply to every subcommand. Configuration is
//! read from each `--dir` base path (in order), then the site directory, then
//! `--config-file` as the highest-priority layer.

use crate::core::styles::palette_to_clap;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "hookwork")]
#[command(about = "Inspect module activation and the background action queue")]
#[command(version)]
pub struct Args {
    /// Extra configuration file, applied after every base path
    #[arg(long = "config-file", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Configuration base path (repeatable, searched in order)
    #[arg(long = "dir", value_name = "DIR", global = true)]
    pub dirs: Vec<PathBuf>,

    /// Skip the per-user site directory
    #[arg(long = "no-site", global = true)]
    pub no_site: bool,

    /// More output (repeatable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Less output (repeatable)
    #[arg(short = 'q', long = "quiet", action = clap::ArgAction::Count, global = true, conflicts_with = "verbose")]
    pub quiet: u8,

    /// Log level; overrides -v/-q
    #[arg(long = "log-level", value_name = "LEVEL", global = true, value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", global = true, value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<String>,

    /// Force colored output
    #[arg(long = "color", global = true)]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color", conflicts_with = "color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List every known module with its features and defaults
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Resolve the configuration and show the activation order
    Resolve {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Resolve the configuration and write an activation snapshot
    Snapshot {
        /// Output file
        #[arg(value_name = "FILE")]
        output: PathBuf,
    },

    /// Inspect or operate on a file-backed queue
    Queue {
        /// Queue storage directory (defaults to <site dir>/queue)
        #[arg(long = "store", value_name = "DIR")]
        store: Option<PathBuf>,

        #[command(subcommand)]
        action: QueueCommand,
    },

    /// Show version and build metadata
    Version,
}

impl Command {
    /// Subcommand as typed, for log messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::List { .. } => "list",
            Command::Resolve { .. } => "resolve",
            Command::Snapshot { .. } => "snapshot",
            Command::Queue { action, .. } => match action {
                QueueCommand::Status { .. } => "queue status",
                QueueCommand::Drain { .. } => "queue drain",
                QueueCommand::Clear { .. } => "queue clear",
            },
            Command::Version => "version",
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum QueueCommand {
    /// Stored items and lock state
    Status {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Ask the host at ENDPOINT to run a drain pass
    Drain {
        #[arg(long, value_name = "URL")]
        endpoint: String,

        /// Shared token sent with the request
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
    },

    /// Remove every stored item
    Clear {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl Args {
    /// Parse `argv` with help and errors styled from the CLI palette
    ///
    /// Exits the process on a usage error, like [`Parser::parse`].
    pub fn parse_styled<I, T>(argv: I, is_terminal: bool) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        let setting = color_setting(&argv);
        let command = Self::command()
            .styles(palette_to_clap(setting.unwrap_or(is_terminal)))
            .color(color_choice(setting));
        let matches = command.get_matches_from(argv);
        Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    /// Net `-v`/`-q` count
    pub fn verbosity(&self) -> i8 {
        let verbose = i8::try_from(self.verbose).unwrap_or(i8::MAX);
        let quiet = i8::try_from(self.quiet).unwrap_or(i8::MAX);
        verbose.saturating_sub(quiet)
    }

    /// Colour on when forced, or when stdout is a terminal and not disabled
    pub fn use_color(&self, is_terminal: bool) -> bool {
        !self.no_color && (self.color || is_terminal)
    }
}

/// Last `--color`/`--no-color` on the raw command line, before clap runs
pub(crate) fn color_setting(argv: &[OsString]) -> Option<bool> {
    argv.iter().rev().find_map(|arg| match arg.to_str() {
        Some("--color") => Some(true),
        Some("--no-color") => Some(false),
        _ => None,
    })
}

fn color_choice(setting: Option<bool>) -> clap::ColorChoice {
    match setting {
        Some(true) => clap::ColorChoice::Always,
        Some(false) => clap::ColorChoice::Never,
        None => clap::ColorChoice::Auto,
    }
}
