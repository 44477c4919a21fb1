//! The `tagcheck metrics` command.

use clap::Args;
use std::path::{Path, PathBuf};
use tagcheck_core::dataset::{load_observations, Table};
use tagcheck_core::metrics::default_report_path;
use tagcheck_core::{Config, DuplicatePolicy, MetricsReport};

/// Arguments for the `metrics` command.
#[derive(Args, Debug)]
pub struct MetricsArgs {
    /// Evaluation table (CSV with ground-truth and predictions columns)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Ground-truth column name [default: from config, `tag_gt`]
    #[arg(long)]
    pub ground_truth_col: Option<String>,

    /// Predictions column name [default: from config, `inference_result`]
    #[arg(long)]
    pub predictions_col: Option<String>,

    /// Report file (defaults to `<input>_metric.csv` next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Count every occurrence of a repeated predicted label
    #[arg(long)]
    pub per_occurrence: bool,
}

/// Column names and policy for one metrics run.
#[derive(Debug, Clone)]
pub struct MetricsSettings {
    pub ground_truth_col: String,
    pub predictions_col: String,
    pub policy: DuplicatePolicy,
}

impl MetricsSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ground_truth_col: config.columns.ground_truth.clone(),
            predictions_col: config.columns.predictions.clone(),
            policy: config.metrics.duplicate_policy,
        }
    }

    fn with_args(mut self, args: &MetricsArgs) -> Self {
        if let Some(col) = &args.ground_truth_col {
            self.ground_truth_col = col.clone();
        }
        if let Some(col) = &args.predictions_col {
            self.predictions_col = col.clone();
        }
        if args.per_occurrence {
            self.policy = DuplicatePolicy::PerOccurrence;
        }
        self
    }
}

pub fn execute(args: MetricsArgs, config: &Config) -> anyhow::Result<()> {
    let input = super::expand_path(&args.input);
    super::require_exists(&input)?;
    let output = args
        .output
        .as_deref()
        .map(super::expand_path)
        .unwrap_or_else(|| default_report_path(&input));
    let settings = MetricsSettings::from_config(config).with_args(&args);

    let report = evaluate(&input, &output, &settings)?;
    print_summary(&report, &output);
    Ok(())
}

/// Load `input`, compute the report and write it to `output`.
pub fn evaluate(
    input: &Path,
    output: &Path,
    settings: &MetricsSettings,
) -> anyhow::Result<MetricsReport> {
    let table = Table::read(input)?;
    let loaded = load_observations(&table, &settings.ground_truth_col, &settings.predictions_col)?;
    if loaded.skipped > 0 {
        tracing::warn!(
            "{} rows skipped for blank '{}'",
            loaded.skipped,
            settings.ground_truth_col
        );
    }
    tracing::debug!(
        "Computing metrics over {} observations ({:?})",
        loaded.observations.len(),
        settings.policy
    );

    let report = MetricsReport::compute(&loaded.observations, settings.policy);
    report.save(output)?;
    tracing::info!("Report written to {:?}", output);
    Ok(report)
}

pub fn print_summary(report: &MetricsReport, output: &Path) {
    println!();
    println!("  Metrics");
    println!("  ───────────────────────────");
    println!("  Observations:    {}", report.observations);
    println!("  Labels:          {}", report.rows.len());
    println!(
        "  TP / FP / FN:    {} / {} / {}",
        report.total_true_positives(),
        report.total_false_positives(),
        report.total_false_negatives()
    );
    println!("  Macro precision: {:.4}", report.macro_precision());
    println!("  Macro recall:    {:.4}", report.macro_recall());
    println!("  Report:          {}", output.display());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: &str) -> MetricsArgs {
        MetricsArgs {
            input: PathBuf::from(input),
            ground_truth_col: None,
            predictions_col: None,
            output: None,
            per_occurrence: false,
        }
    }

    #[test]
    fn flags_override_config_columns() {
        let mut a = args("eval.csv");
        a.ground_truth_col = Some("label".to_string());
        a.per_occurrence = true;

        let settings = MetricsSettings::from_config(&Config::default()).with_args(&a);
        assert_eq!(settings.ground_truth_col, "label");
        assert_eq!(settings.predictions_col, "inference_result");
        assert_eq!(settings.policy, DuplicatePolicy::PerOccurrence);
    }

    #[test]
    fn evaluate_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("results.csv");
        std::fs::write(&input, "tag_gt,inference_result\nA,B\nB,B\n").unwrap();
        let output = default_report_path(&input);

        let settings = MetricsSettings::from_config(&Config::default());
        let report = evaluate(&input, &output, &settings).unwrap();

        assert_eq!(report.rows.len(), 2);
        assert!(std::fs::read_to_string(output)
            .unwrap()
            .starts_with("Label,Precision,Recall,TP,FP,FN\n"));
    }

    #[test]
    fn evaluate_reports_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.csv");
        std::fs::write(&input, "x,y\n1,2\n").unwrap();

        let settings = MetricsSettings::from_config(&Config::default());
        let err = evaluate(&input, &dir.path().join("out.csv"), &settings).unwrap_err();
        assert!(err.to_string().contains("Available columns: [x, y]"));
    }
}
