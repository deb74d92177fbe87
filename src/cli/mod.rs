//! CLI definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for table and status output.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
    /// Comma-separated values
    Csv,
}

pub mod commands;

/// Order book sync - review, edit and publish the shared order book
#[derive(Parser, Debug)]
#[command(name = "orderbook", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store URL: a PostgREST base URL, or sqlite:<path>
    #[arg(long, global = true, env = "ORDERBOOK_URL")]
    pub url: Option<String>,

    /// API key for the PostgREST store
    #[arg(long, global = true, env = "ORDERBOOK_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Table name (default: order_book)
    #[arg(long, global = true, env = "ORDERBOOK_TABLE")]
    pub table: Option<String>,

    /// Edit session file (default: ~/.orderbook/session.json)
    #[arg(long, global = true, env = "ORDERBOOK_STATE")]
    pub state: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json, csv)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the order book being edited
    Show,

    /// Reload from the store, discarding local edits
    Pull,

    /// Replace the edit buffer with an edited table (JSON or CSV)
    Apply {
        /// Edited table file
        file: PathBuf,

        /// New batch label for the next save (default: keep the loaded label)
        #[arg(long)]
        label: Option<String>,
    },

    /// Publish the edit buffer, replacing the stored table
    Save {
        /// Update password
        #[arg(long, short)]
        password: String,
    },

    /// Show edit session status
    Status,

    /// Delete the edit session
    Discard,

    /// Configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration (API key redacted)
    Show,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
