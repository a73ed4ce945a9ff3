//! pinkeep - pin-on-access cache manager for IPFS content
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use pinkeep::cli::{Cli, Commands};
use pinkeep::config::{Config, ConfigManager};
use pinkeep::error::PinkeepResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

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

async fn run() -> PinkeepResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Serve(args) => pinkeep::cli::commands::serve(args, &config).await,
        Commands::Sweep(args) => pinkeep::cli::commands::sweep(args, &config).await,
        Commands::Access(args) => pinkeep::cli::commands::access(args, &config).await,
        Commands::Namespace(args) => pinkeep::cli::commands::namespace(args, &config).await,
        Commands::List(args) => pinkeep::cli::commands::list(args, &config).await,
        Commands::Config(args) => {
            pinkeep::cli::commands::config(args, &config_manager, &config).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; logs go to stderr so stdout stays parseable
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("pinkeep=warn"),
        1 => EnvFilter::new("pinkeep=info"),
        _ => EnvFilter::new("pinkeep=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
