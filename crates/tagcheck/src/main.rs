//! tagcheck CLI - evaluation and dataset tooling for LLM-driven image tagging.
//!
//! # Usage
//!
//! ```bash
//! # Per-label precision/recall for an evaluation table
//! tagcheck metrics results.csv
//!
//! # Classify a manifest of images, then score the predictions
//! tagcheck classify manifest.csv --images-dir ./imgs --metrics
//!
//! # Check a local corpus for mislabeled or oversized images
//! tagcheck audit ./imgs
//!
//! # Export an SFT dataset
//! tagcheck dataset sft train.csv -o train.jsonl
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// tagcheck - evaluation and dataset tooling for LLM-driven image tagging.
#[derive(Parser, Debug)]
#[command(name = "tagcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute per-label precision and recall for an evaluation table
    Metrics(cli::metrics::MetricsArgs),

    /// Report extension mismatches, oversized files and the largest images
    Audit(cli::audit::AuditArgs),

    /// Classify images with a vision LLM against the taxonomy
    Classify(cli::classify::ClassifyArgs),

    /// Build and check fine-tuning datasets
    Dataset(cli::dataset::DatasetArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match tagcheck_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `tagcheck config path`."
            );
            tagcheck_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("tagcheck v{}", tagcheck_core::VERSION);

    match cli.command {
        Commands::Metrics(args) => cli::metrics::execute(args, &config),
        Commands::Audit(args) => cli::audit::execute(args, &config),
        Commands::Classify(args) => cli::classify::execute(args, &config).await,
        Commands::Dataset(args) => cli::dataset::execute(args, &config),
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
