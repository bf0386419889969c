//! CLI command definitions
//!
//! Defines the clap commands for the apichain CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the configured case groups against an environment
    Run {
        /// Path to the configuration file (default: ./apichain.toml)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Environment to run against (overrides `env` in the config)
        #[arg(long, short)]
        env: Option<String>,

        /// Only run these groups (can be given multiple times)
        #[arg(long = "group", short = 'g')]
        groups: Vec<String>,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,

        /// Don't write the rolling log file
        #[arg(long)]
        no_log_file: bool,
    },

    /// List groups in execution order with their cases
    List {
        /// Path to the configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Check every case file without sending requests
    Validate {
        /// Path to the configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Inspect or edit the shared variable store
    Var {
        /// Path to the configuration file
        #[arg(long, short, global = true)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        command: VarCommands,
    },
}

#[derive(Subcommand)]
pub enum VarCommands {
    /// Print the value at a dotted path
    Get {
        /// Dotted path, e.g. global.token
        path: String,
    },

    /// Write a value at a dotted path
    Set {
        /// Dotted path, e.g. global.token
        path: String,

        /// Value, parsed as YAML (`42`, `true`, `abc`, `[1, 2]`)
        value: String,
    },

    /// Print the whole store
    List,
}

impl Commands {
    /// Whether the command sets up its own logging (it needs the config's log directory)
    pub fn manages_logging(&self) -> bool {
        matches!(self, Commands::Run { .. })
    }
}
