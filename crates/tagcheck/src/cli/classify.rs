//! The `tagcheck classify` command.
//!
//! Reads a manifest CSV (or scans a directory), classifies every image with
//! the selected vision provider and writes a predictions table that
//! `tagcheck metrics` can score directly.

use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tagcheck_core::dataset::{load_classify_items, write_classifications, Table};
use tagcheck_core::llm::{
    ClassifyItem, ClassifyOptions, ClassifyStats, Classifier, LlmProviderFactory, Outcome,
};
use tagcheck_core::metrics::default_report_path;
use tagcheck_core::pipeline::{FileDiscovery, ImageLoader, ImageSource};
use tagcheck_core::{Config, Taxonomy};

use super::metrics::{self, MetricsSettings};

/// Extensions picked up when the input is a directory.
const DIRECTORY_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif", "bmp"];

/// Supported LLM providers.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum LlmProvider {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI Chat Completions (or a compatible endpoint)
    Openai,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Anthropic => write!(f, "anthropic"),
            LlmProvider::Openai => write!(f, "openai"),
        }
    }
}

/// Arguments for the `classify` command.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Manifest CSV (image column plus optional ground truth) or an image directory
    #[arg(required = true)]
    pub input: PathBuf,

    /// Directory that relative image names in the manifest resolve against
    /// (defaults to the manifest's directory)
    #[arg(long)]
    pub images_dir: Option<PathBuf>,

    /// Predictions file (defaults to `<input>_result.csv`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// LLM provider [default: from config]
    #[arg(long, value_enum)]
    pub llm: Option<LlmProvider>,

    /// LLM model name (provider-specific)
    #[arg(long, env = "TAGCHECK_LLM_MODEL")]
    pub llm_model: Option<String>,

    /// Number of concurrent requests [default: from config]
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Disable prompt caching of the system prompt
    #[arg(long)]
    pub no_cache: bool,

    /// Score the predictions when the manifest has ground truth
    #[arg(long)]
    pub metrics: bool,
}

pub async fn execute(args: ClassifyArgs, config: &Config) -> anyhow::Result<()> {
    let input = super::expand_path(&args.input);
    super::require_exists(&input)?;
    let output = args
        .output
        .as_deref()
        .map(super::expand_path)
        .unwrap_or_else(|| default_output_path(&input));

    let options = classify_options(&args, config)?;
    let provider_name = args
        .llm
        .map(|p| p.to_string())
        .unwrap_or_else(|| config.classify.provider.clone());
    let provider = LlmProviderFactory::create(
        &provider_name,
        &config.llm,
        args.llm_model.as_deref(),
        Duration::from_millis(config.limits.llm_timeout_ms),
    )?;
    if !provider.is_available().await {
        anyhow::bail!(
            "LLM provider '{provider_name}' is not configured.\n\n  \
             Hint: Set its API key in the config file or environment."
        );
    }

    let taxonomy = Taxonomy::resolve(config.taxonomy_path().as_deref())?;
    tracing::debug!("Taxonomy has {} labels", taxonomy.len());

    let images_dir = args.images_dir.as_deref().map(super::expand_path);
    let items = load_items(&input, images_dir.as_deref(), config)?;
    if items.is_empty() {
        println!("No images to classify in {}", input.display());
        return Ok(());
    }
    let has_ground_truth = items.iter().any(|item| item.ground_truth.is_some());

    let classifier = Classifier::new(
        provider,
        ImageLoader::new(config.limits.clone()),
        &taxonomy,
        options,
    );
    tracing::info!(
        "Classifying {} images with {}",
        items.len(),
        classifier.provider_name()
    );

    let progress = create_progress_bar(items.len() as u64);
    let start = Instant::now();
    let (results, stats) = {
        let progress = progress.clone();
        classifier
            .classify_batch(items, move |result| {
                if result.outcome != Outcome::Success {
                    tracing::debug!("{}: {}", result.source, result.prediction);
                }
                progress.inc(1);
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    progress.set_message(format!("{:.1} img/sec", progress.position() as f64 / elapsed));
                }
            })
            .await
    };
    progress.finish_and_clear();

    write_classifications(
        &output,
        &results,
        &config.columns.ground_truth,
        &config.columns.predictions,
    )?;
    tracing::info!("Predictions written to {:?}", output);
    print_summary(&stats, start.elapsed(), &output);

    if args.metrics {
        if has_ground_truth {
            let report_path = default_report_path(&output);
            let report = metrics::evaluate(
                &output,
                &report_path,
                &MetricsSettings::from_config(config),
            )?;
            metrics::print_summary(&report, &report_path);
        } else {
            tracing::warn!(
                "--metrics ignored: input has no '{}' column",
                config.columns.ground_truth
            );
        }
    }

    Ok(())
}

fn classify_options(args: &ClassifyArgs, config: &Config) -> anyhow::Result<ClassifyOptions> {
    let mut options = ClassifyOptions::from_config(config);
    if let Some(parallel) = args.parallel {
        if parallel == 0 {
            anyhow::bail!("--parallel must be > 0");
        }
        options.parallel = parallel;
    }
    if args.no_cache {
        options.use_cache = false;
    }
    Ok(options)
}

/// Build the work list from a manifest CSV or an image directory.
fn load_items(
    input: &Path,
    images_dir: Option<&Path>,
    config: &Config,
) -> anyhow::Result<Vec<ClassifyItem>> {
    if input.is_dir() {
        let files = FileDiscovery::new(DIRECTORY_EXTENSIONS).discover(input);
        return Ok(files
            .into_iter()
            .enumerate()
            .map(|(index, file)| ClassifyItem {
                index,
                ground_truth: None,
                source: ImageSource::Local(file.path),
            })
            .collect());
    }

    let table = Table::read(input)?;
    let base_dir = images_dir.or_else(|| input.parent());
    Ok(load_classify_items(
        &table,
        &config.columns.image,
        &config.columns.ground_truth,
        base_dir,
    )?)
}

/// `manifest.csv` → `manifest_result.csv`; `imgs/` → `imgs_result.csv` beside it.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = if input.is_dir() {
        input.file_name()
    } else {
        input.file_stem()
    }
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "classify".to_string());
    input.with_file_name(format!("{stem}_result.csv"))
}

fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

fn print_summary(stats: &ClassifyStats, elapsed: Duration, output: &Path) {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        stats.total as f64 / secs
    } else {
        0.0
    };

    println!();
    println!("  Classification complete");
    println!("  ───────────────────────────");
    println!("  Succeeded:        {:>6}", stats.succeeded);
    if stats.content_filtered > 0 {
        println!("  Content filtered: {:>6}", stats.content_filtered);
    }
    if stats.not_an_image > 0 {
        println!("  Not an image:     {:>6}", stats.not_an_image);
    }
    if stats.unsupported > 0 {
        println!("  Unsupported:      {:>6}", stats.unsupported);
    }
    if stats.failed > 0 {
        println!("  Failed:           {:>6}", stats.failed);
    }
    println!("  Duration:         {:>6.1}s ({:.1} img/sec)", secs, rate);
    println!(
        "  Tokens in / out:  {} / {}",
        stats.input_tokens, stats.output_tokens
    );
    if stats.cache_write_tokens > 0 || stats.cache_read_tokens > 0 {
        println!(
            "  Cache write/read: {} / {}",
            stats.cache_write_tokens, stats.cache_read_tokens
        );
    }
    println!("  Output:           {}", output.display());
    println!();
}
