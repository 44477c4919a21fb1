//! tagcheck core - evaluation and data tooling for multi-label image tagging.
//!
//! The centre of the library is the per-label metrics engine: given
//! observations of a single ground-truth label and a comma-separated list of
//! predicted labels, it computes per-label precision, recall and raw
//! TP/FP/FN counts over the set of labels that appear as ground truth.
//!
//! Around it sit the tools that produce and curate those observations:
//!
//! ```text
//! manifest.csv → Classifier (vision LLM) → result.csv → metrics → result_metric.csv
//! images/      → audit (format mismatches, oversized files, largest images)
//! train.csv    → SFT JSONL export
//! ```
//!
//! # Usage
//!
//! ```rust
//! use tagcheck_core::metrics::{compute_metrics, Observation};
//!
//! let rows = compute_metrics(&[
//!     Observation::new("A", "B"),
//!     Observation::new("B", "B"),
//! ]);
//! assert_eq!(rows[1].label, "B");
//! assert_eq!(rows[1].precision, 0.5);
//! ```

// Module declarations
pub mod config;
pub mod dataset;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod taxonomy;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, DatasetError, PipelineError, PipelineResult, Result, TagcheckError};
pub use metrics::{
    compute_metrics, compute_metrics_with, DuplicatePolicy, LabelReportRow, MetricsReport,
    Observation,
};
pub use output::{OutputFormat, OutputWriter};
pub use taxonomy::Taxonomy;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
