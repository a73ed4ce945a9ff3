//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// pinkeep - pin-on-access cache for IPFS content
///
/// Pins resources the first time they are fetched, keeps one pinned
/// release per namespace, and releases resources nobody has accessed
/// within the expiration window.
#[derive(Parser, Debug)]
#[command(name = "pinkeep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PINKEEP_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Track requests read from stdin and reap expired pins periodically
    Serve(ServeArgs),

    /// Release expired resources once
    Sweep(SweepArgs),

    /// Record one access to a resource
    Access(AccessArgs),

    /// Show or advance a namespace's pinned resource
    Namespace(NamespaceArgs),

    /// List ledger entries
    List(ListArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Override the sweep interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,

    /// Skip the sweep at startup
    #[arg(long)]
    pub no_initial_sweep: bool,
}

/// Arguments for the sweep command
#[derive(Parser, Debug)]
pub struct SweepArgs {
    /// Show what would be released without unpinning anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the access command
#[derive(Parser, Debug)]
pub struct AccessArgs {
    /// Gateway URL (e.g. https://localhost:8080/ipfs/Qm...) or bare hash
    pub target: String,
}

/// Arguments for the namespace command
#[derive(Parser, Debug)]
pub struct NamespaceArgs {
    #[command(subcommand)]
    pub action: NamespaceAction,
}

/// Namespace selector shared by the namespace subcommands
#[derive(Parser, Debug)]
pub struct NamespaceSelector {
    /// Network name (e.g. mainnet)
    #[arg(short, long)]
    pub network: String,

    /// App id (default: from config)
    #[arg(short, long)]
    pub app: Option<String>,
}

/// Namespace subcommands
#[derive(Subcommand, Debug)]
pub enum NamespaceAction {
    /// Pin a resource as the namespace's current one, releasing the previous
    Set {
        /// Resource hash to pin
        hash: String,

        #[command(flatten)]
        selector: NamespaceSelector,
    },

    /// Show the namespace's current resource
    Show {
        #[command(flatten)]
        selector: NamespaceSelector,
    },
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only show expired resources
    #[arg(long)]
    pub expired: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache.expiration_window_days)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for list-style commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_serve() {
        let cli = Cli::parse_from(["pinkeep", "serve", "--interval", "60"]);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.interval, Some(60));
                assert!(!args.no_initial_sweep);
            }
            _ => panic!("expected Serve command"),
        }
    }

    #[test]
    fn cli_parses_sweep_dry_run() {
        let cli = Cli::parse_from(["pinkeep", "sweep", "--dry-run", "--format", "json"]);
        match cli.command {
            Commands::Sweep(args) => {
                assert!(args.dry_run);
                assert!(matches!(args.format, OutputFormat::Json));
            }
            _ => panic!("expected Sweep command"),
        }
    }

    #[test]
    fn cli_parses_access() {
        let cli = Cli::parse_from(["pinkeep", "access", "https://localhost:8080/ipfs/QmA"]);
        match cli.command {
            Commands::Access(args) => assert_eq!(args.target, "https://localhost:8080/ipfs/QmA"),
            _ => panic!("expected Access command"),
        }
    }

    #[test]
    fn cli_parses_namespace_set() {
        let cli = Cli::parse_from([
            "pinkeep",
            "namespace",
            "set",
            "QmRelease",
            "--network",
            "mainnet",
        ]);
        match cli.command {
            Commands::Namespace(NamespaceArgs {
                action: NamespaceAction::Set { hash, selector },
            }) => {
                assert_eq!(hash, "QmRelease");
                assert_eq!(selector.network, "mainnet");
                assert!(selector.app.is_none());
            }
            _ => panic!("expected Namespace Set command"),
        }
    }

    #[test]
    fn cli_parses_namespace_show_with_app() {
        let cli = Cli::parse_from([
            "pinkeep",
            "namespace",
            "show",
            "-n",
            "rinkeby",
            "--app",
            "my.app.eth",
        ]);
        match cli.command {
            Commands::Namespace(NamespaceArgs {
                action: NamespaceAction::Show { selector },
            }) => {
                assert_eq!(selector.network, "rinkeby");
                assert_eq!(selector.app.as_deref(), Some("my.app.eth"));
            }
            _ => panic!("expected Namespace Show command"),
        }
    }

    #[test]
    fn cli_namespace_requires_network() {
        assert!(Cli::try_parse_from(["pinkeep", "namespace", "show"]).is_err());
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from([
            "pinkeep",
            "config",
            "set",
            "cache.expiration_window_days",
            "14",
        ]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Set { key, value }),
            }) => {
                assert_eq!(key, "cache.expiration_window_days");
                assert_eq!(value, "14");
            }
            _ => panic!("expected Config Set command"),
        }
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["pinkeep", "list"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["pinkeep", "-v", "list"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["pinkeep", "-vv", "list"]);
        assert_eq!(cli.verbose, 2);
    }
}
