//! workref CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use workref::cli::args::{ConfigAction, ConfigArgs};
use workref::cli::{Cli, Commands};
use workref::config::{Config, ConfigManager, LogFormat};
use workref::error::WorkrefResult;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> WorkrefResult<()> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // Config init and path work even when the existing file is invalid
    let skip_load = matches!(
        &cli.command,
        Commands::Config(ConfigArgs {
            action: Some(ConfigAction::Init { .. } | ConfigAction::Path)
        })
    );
    let config = if skip_load {
        Config::default()
    } else {
        config_manager.load().await?
    };

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let verbose = if config.general.verbose { cli.verbose.max(1) } else { cli.verbose };
    let filter = match verbose {
        0 => EnvFilter::new("workref=warn"),
        1 => EnvFilter::new("workref=info"),
        _ => EnvFilter::new("workref=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match config.general.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.without_time().init(),
    }

    match cli.command {
        Commands::Id(args) => workref::cli::commands::id(args).await,
        Commands::Config(args) => {
            workref::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
