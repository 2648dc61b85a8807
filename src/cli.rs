//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gabarito - exam answer-key extraction and aggregation
///
/// Extract structured answer keys from exam PDFs via the Gemini API and
/// aggregate per-folder data.json files into one nested JSON document.
///
/// Examples:
///   gabarito aggregate --root . --save
///   gabarito extract --directory "fuvest/2024/1a Fase"
///   gabarito extract -d "unicamp/2023" --model gemini-2.5-pro --timeout 900
///   gabarito init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .gabarito.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Merge every folder's data.json into one nested JSON document
    Aggregate(AggregateArgs),
    /// Extract an answer key from a folder's exam PDFs via Gemini
    Extract(ExtractArgs),
    /// Generate a default .gabarito.toml configuration file
    InitConfig,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AggregateArgs {
    /// Root directory to aggregate
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub root: PathBuf,

    /// Also write the result to data.json at the root
    #[arg(short, long)]
    pub save: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Directory containing the exam PDFs (prova.pdf and gabarito.pdf)
    #[arg(short, long, value_name = "DIR")]
    pub directory: PathBuf,

    /// Gemini model to use
    ///
    /// Overrides the config file setting (default: gemini-2.5-flash).
    #[arg(short, long, value_name = "NAME")]
    pub model: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum retries for timed-out uploads and generations
    ///
    /// Unlimited when not set here or in the config file.
    #[arg(long, value_name = "COUNT")]
    pub max_retries: Option<u32>,

    /// Gemini API key
    ///
    /// Also read from GEMINI_API_KEY (a .env file is honored).
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, value_name = "KEY")]
    pub api_key: String,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Command::Extract(ref extract) = self.command {
            if let Some(timeout) = extract.timeout {
                if timeout == 0 {
                    return Err("Timeout must be at least 1 second".to_string());
                }
            }

            if extract.api_key.trim().is_empty() {
                return Err(
                    "GEMINI_API_KEY not found. Set it in your environment or .env file"
                        .to_string(),
                );
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
