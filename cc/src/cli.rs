//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::debug;

/// ContractCheck - contract compliance checker
#[derive(Parser)]
#[command(
    name = "cc",
    about = "Extract contract terms and judge task costs against them",
    version = env!("CARGO_PKG_VERSION"),
    after_help = after_help()
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP service
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Extract the terms of a contract and print them as JSON
    Extract {
        /// Contract document (.docx or .txt)
        contract: PathBuf,
    },

    /// Check every task in a task list against a contract
    Analyze {
        /// Contract document (.docx or .txt)
        contract: PathBuf,

        /// Task list (.csv or .xlsx)
        tasks: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Output format for analysis results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Path of the log file
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("contractcheck")
        .join("logs")
        .join("contractcheck.log")
}

fn after_help() -> String {
    format!("Logs are written to: {}", get_log_path().display())
}
