//! Multi-label classification metrics against single-label ground truth.
//!
//! - **engine**: per-label TP/FP/FN accumulation and precision/recall
//! - **report**: the finalized report, summary figures and CSV output

pub mod engine;
pub mod report;

pub use engine::{
    compute_metrics, compute_metrics_with, parse_predictions, DuplicatePolicy, LabelReportRow,
    LabelStats, Observation,
};
pub use report::{default_report_path, MetricsReport};
