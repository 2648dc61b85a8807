//! gabarito - exam answer-key extraction and aggregation
//!
//! A CLI tool that extracts structured answer-key data from exam PDFs
//! via the Gemini API and aggregates the per-folder results into one
//! nested JSON document.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, missing files, etc.)

mod aggregator;
mod cli;
mod config;
mod extractor;
mod gemini;
mod models;

use aggregator::{AggregateConfig, FolderAggregator};
use anyhow::{Context, Result};
use cli::{AggregateArgs, Args, Command, ExtractArgs};
use config::Config;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap resolves env-backed arguments.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("gabarito v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .gabarito.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".gabarito.toml");

    if path.exists() {
        eprintln!("⚠️  .gabarito.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .gabarito.toml")?;

    println!("✅ Created .gabarito.toml with default settings.");
    println!("   Edit it to customize model, timeouts, ignored directories, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Dispatch the selected subcommand.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    match args.command {
        Command::Aggregate(ref aggregate) => run_aggregate(aggregate, &config, args.quiet),
        Command::Extract(ref extract) => run_extract(extract, &config, args.quiet).await,
        // Handled in main before logging was set up.
        Command::InitConfig => Ok(()),
    }
}

/// Run the folder aggregation and print (and optionally save) the result.
fn run_aggregate(args: &AggregateArgs, config: &Config, quiet: bool) -> Result<()> {
    info!("Aggregating {}", args.root.display());

    let aggregator = FolderAggregator::new(
        args.root.clone(),
        AggregateConfig::from(&config.aggregator),
    );
    let tree = aggregator.aggregate();
    let json = aggregator::to_pretty_json(&tree)?;

    if !quiet {
        println!("✅ Successfully parsed the directory. Resulting JSON:\n");
    }
    println!("{}", json);

    if args.save {
        let output = args.root.join(&config.aggregator.data_file);
        match std::fs::write(&output, &json) {
            Ok(()) => {
                if !quiet {
                    println!("\n📄 Output has been saved to {}", output.display());
                }
            }
            // The printed result above stands; a failed save is not fatal.
            Err(e) => warn!("Error saving output file {}: {}", output.display(), e),
        }
    }

    Ok(())
}

/// Run the PDF extraction flow for one exam folder.
async fn run_extract(args: &ExtractArgs, config: &Config, quiet: bool) -> Result<()> {
    if !quiet {
        println!("🤖 Extracting answer key from: {}", args.directory.display());
        println!("   Model: {}", config.model.name);
        println!("   Timeout: {}s", config.model.timeout_seconds);
        match config.model.max_retries {
            Some(max) => println!("   Retries: up to {}", max),
            None => println!("   Retries: unlimited"),
        }
        println!();
    }

    let options = extractor::ExtractOptions {
        directory: args.directory.clone(),
        api_key: args.api_key.clone(),
        show_progress: !quiet,
    };

    extractor::run_extraction(&options, config).await?;

    if !quiet {
        println!("\n✅ Extraction complete!");
    }
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .gabarito.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
