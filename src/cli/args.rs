//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// workref - worker-qualified cache result storage
///
/// Inspect cache identities and manage storage configuration.
#[derive(Parser, Debug)]
#[command(name = "workref")]
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
    #[arg(short, long, global = true, env = "WORKREF_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode or decode cache identities
    Id(IdArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the id command
#[derive(Parser, Debug)]
pub struct IdArgs {
    #[command(subcommand)]
    pub action: IdAction,
}

/// Id subcommands
#[derive(Subcommand, Debug)]
pub enum IdAction {
    /// Build an identity from a worker id and reference id
    Encode {
        /// Worker id
        worker: String,

        /// Reference id (omit for a worker-only identity)
        #[arg(default_value = "")]
        reference: String,
    },

    /// Split an identity into worker id and reference id
    Decode {
        /// Cache identity (<worker>::<ref>)
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
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
}
