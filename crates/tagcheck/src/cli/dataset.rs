//! The `tagcheck dataset` command: SFT export and image checks.

use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use tagcheck_core::dataset::{check_images, export_sft, SftOptions, Table};
use tagcheck_core::{Config, Taxonomy};

/// Arguments for the `dataset` command.
#[derive(Args, Debug)]
pub struct DatasetArgs {
    #[command(subcommand)]
    pub command: DatasetCommand,
}

#[derive(Subcommand, Debug)]
pub enum DatasetCommand {
    /// Export a filename/flag CSV as conversation records (JSONL)
    Sft(SftArgs),

    /// List manifest images missing from a local directory
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct SftArgs {
    /// CSV with filename and flag columns
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output JSONL file (defaults to `<input>.jsonl`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Bucket holding the images [default: from config]
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key prefix of the images inside the bucket [default: from config]
    #[arg(long)]
    pub prefix: Option<String>,

    /// Account id that owns the bucket [default: from config]
    #[arg(long)]
    pub account: Option<String>,

    /// Skip rows whose image is not present in this local directory
    #[arg(long)]
    pub images_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// CSV with a filename column
    #[arg(required = true)]
    pub input: PathBuf,

    /// Local directory the filenames should exist in
    #[arg(long, required = true)]
    pub images_dir: PathBuf,
}

pub fn execute(args: DatasetArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        DatasetCommand::Sft(args) => sft(args, config),
        DatasetCommand::Check(args) => check(args, config),
    }
}

fn sft(args: SftArgs, config: &Config) -> anyhow::Result<()> {
    let input = super::expand_path(&args.input);
    super::require_exists(&input)?;
    let output = args
        .output
        .as_deref()
        .map(super::expand_path)
        .unwrap_or_else(|| input.with_extension("jsonl"));
    if output == input {
        anyhow::bail!("Output would overwrite the input: {:?}", input);
    }

    let taxonomy = Taxonomy::resolve(config.taxonomy_path().as_deref())?;
    let options = sft_options(&args, config, &taxonomy)?;
    let images_dir = args.images_dir.as_deref().map(super::expand_path);

    let summary = export_sft(
        &input,
        &output,
        &config.columns,
        &options,
        images_dir.as_deref(),
    )?;

    println!();
    println!("  SFT export");
    println!("  ───────────────────────────");
    println!("  Rows:            {}", summary.rows);
    println!("  Written:         {}", summary.written);
    println!("  Skipped format:  {}", summary.skipped_format);
    if images_dir.is_some() {
        println!("  Skipped missing: {}", summary.skipped_missing);
    }
    if summary.skipped_blank > 0 {
        println!("  Blank filename:  {}", summary.skipped_blank);
    }
    println!("  Output:          {}", output.display());
    println!();
    Ok(())
}

fn sft_options(
    args: &SftArgs,
    config: &Config,
    taxonomy: &Taxonomy,
) -> anyhow::Result<SftOptions> {
    let mut options =
        SftOptions::from_config(&config.dataset, taxonomy, config.classify.max_labels);
    if let Some(bucket) = &args.bucket {
        options.bucket = bucket.clone();
    }
    if let Some(prefix) = &args.prefix {
        options.prefix = prefix.clone();
    }
    if let Some(account) = &args.account {
        options.bucket_owner = account.clone();
    }
    if options.bucket.trim().is_empty() {
        anyhow::bail!(
            "No bucket set.\n\n  Hint: Pass --bucket or set dataset.bucket in the config file."
        );
    }
    Ok(options)
}

fn check(args: CheckArgs, config: &Config) -> anyhow::Result<()> {
    let input = super::expand_path(&args.input);
    super::require_exists(&input)?;
    let images_dir = super::expand_path(&args.images_dir);
    require_dir(&images_dir)?;

    let table = Table::read(&input)?;
    let result = check_images(&table, &config.columns.filename, &images_dir)?;

    for name in &result.missing {
        println!("{name}");
    }
    tracing::info!(
        "{} of {} images missing from {:?}",
        result.missing.len(),
        result.checked,
        images_dir
    );
    if !result.missing.is_empty() {
        anyhow::bail!("{} images are missing", result.missing.len());
    }
    Ok(())
}

fn require_dir(path: &Path) -> anyhow::Result<()> {
    if !path.is_dir() {
        anyhow::bail!("Not a directory: {:?}", path);
    }
    Ok(())
}
