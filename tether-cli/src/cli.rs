//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate an expression in a local sandbox
    Eval {
        /// Expression or script body; the last expression is the result
        expression: String,

        /// Binding visible to the expression (example: --bind 'user={"name":"ada"}')
        #[arg(long = "bind", value_name = "NAME=JSON")]
        bindings: Vec<String>,

        /// Override the evaluation timeout
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },

    /// Check whether a sender would pass the privileged sender guard
    CheckSender {
        /// Extension id the sender declares
        #[arg(long, value_name = "ID")]
        declared_id: Option<String>,

        /// URL of the sending document
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// The sender lives inside a tab
        #[arg(long)]
        tab: bool,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        config_file: PathBuf,
    },

    /// Print or write the default configuration
    Sample {
        /// Output file path; prints to stdout when omitted
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}
