//! Finalized metrics report and its CSV serialization.

use std::io::Write;
use std::path::{Path, PathBuf};

use super::engine::{compute_metrics_with, DuplicatePolicy, LabelReportRow, Observation};
use crate::error::DatasetError;

/// Immutable result of one metrics run.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    /// Per-label rows, ascending by label
    pub rows: Vec<LabelReportRow>,
    /// Number of observations the report was computed from
    pub observations: usize,
}

impl MetricsReport {
    /// Run the engine over `observations` and keep the totals alongside the rows.
    pub fn compute(observations: &[Observation], policy: DuplicatePolicy) -> Self {
        Self {
            rows: compute_metrics_with(observations, policy),
            observations: observations.len(),
        }
    }

    /// Unweighted mean of per-label precision (0 for an empty report).
    pub fn macro_precision(&self) -> f64 {
        self.mean_of(|r| r.precision)
    }

    /// Unweighted mean of per-label recall (0 for an empty report).
    pub fn macro_recall(&self) -> f64 {
        self.mean_of(|r| r.recall)
    }

    pub fn total_true_positives(&self) -> u64 {
        self.rows.iter().map(|r| r.true_positives).sum()
    }

    pub fn total_false_positives(&self) -> u64 {
        self.rows.iter().map(|r| r.false_positives).sum()
    }

    pub fn total_false_negatives(&self) -> u64 {
        self.rows.iter().map(|r| r.false_negatives).sum()
    }

    fn mean_of(&self, f: impl Fn(&LabelReportRow) -> f64) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        self.rows.iter().map(f).sum::<f64>() / self.rows.len() as f64
    }

    /// Serialize rows as CSV (`Label,Precision,Recall,TP,FP,FN`) to any writer.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        if self.rows.is_empty() {
            wtr.write_record(["Label", "Precision", "Recall", "TP", "FP", "FN"])?;
        }
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the CSV report to `path`, creating or truncating it.
    pub fn save(&self, path: &Path) -> Result<(), DatasetError> {
        let file = std::fs::File::create(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_csv(std::io::BufWriter::new(file))
            .map_err(|source| DatasetError::Csv {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Default report location: the input path with its extension replaced by
/// `_metric.csv` (`results.csv` → `results_metric.csv`).
pub fn default_report_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    input.with_file_name(format!("{stem}_metric.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MetricsReport {
        let data: Vec<Observation> = [("A", "B"), ("B", "B")]
            .into_iter()
            .map(Observation::from)
            .collect();
        MetricsReport::compute(&data, DuplicatePolicy::Deduplicate)
    }

    #[test]
    fn test_csv_layout() {
        let mut buffer = Vec::new();
        sample().write_csv(&mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Label,Precision,Recall,TP,FP,FN");
        assert_eq!(lines[1], "A,0.0,0.0,0,0,1");
        assert_eq!(lines[2], "B,0.5,1.0,1,1,0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_report_still_has_header() {
        let report = MetricsReport::compute(&[], DuplicatePolicy::Deduplicate);
        let mut buffer = Vec::new();
        report.write_csv(&mut buffer).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap().trim(),
            "Label,Precision,Recall,TP,FP,FN"
        );
        assert_eq!(report.macro_precision(), 0.0);
        assert_eq!(report.macro_recall(), 0.0);
    }

    #[test]
    fn test_macro_and_totals() {
        let report = sample();
        assert_eq!(report.observations, 2);
        assert_eq!(report.macro_precision(), 0.25);
        assert_eq!(report.macro_recall(), 0.5);
        assert_eq!(report.total_true_positives(), 1);
        assert_eq!(report.total_false_positives(), 1);
        assert_eq!(report.total_false_negatives(), 1);
    }

    #[test]
    fn test_default_report_path() {
        assert_eq!(
            default_report_path(Path::new("/data/results.csv")),
            PathBuf::from("/data/results_metric.csv")
        );
        assert_eq!(
            default_report_path(Path::new("eval.v2.xlsx")),
            PathBuf::from("eval.v2_metric.csv")
        );
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out_metric.csv");
        sample().save(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Label,Precision"));
    }
}
