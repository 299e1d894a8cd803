use crate::app::cli::args::Args;
use crate::app::cli::commands;
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::{init_logging, is_logging_initialised, level_for_verbosity, set_log_level};
use std::io::IsTerminal;

/// Parse arguments, install logging and run the command; returns the exit code
pub async fn startup() -> i32 {
    let args = Args::parse_styled(std::env::args_os(), std::io::stdout().is_terminal());
    run(args).await
}

/// Run an already-parsed command line
pub async fn run(args: Args) -> i32 {
    let use_color = args.use_color(std::io::stdout().is_terminal());
    colored::control::set_override(use_color);

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| level_for_verbosity(args.verbosity()).to_string());
    // A logger outlives the run that installed it; later runs only adjust the level
    let logging = if is_logging_initialised() {
        set_log_level(&level)
    } else {
        init_logging(
            Some(level.as_str()),
            args.log_format.as_deref(),
            args.log_file.as_deref(),
            use_color,
        )
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialise logging: {e}");
    }

    log::debug!("Arguments: {:?}", args);

    match commands::run(&args, use_color).await {
        Ok(()) => 0,
        Err(e) => {
            log_error_with_context(&e, &format!("hookwork {}", args.command.name()));
            1
        }
    }
}
