//! Per-label precision/recall accumulation over multi-label predictions.
//!
//! Each observation has exactly one ground-truth label and a comma-separated
//! prediction string. A single pass updates per-label TP/FP/FN counters;
//! false positives are only counted for labels that occur as ground truth
//! somewhere in the evaluated set.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One evaluated instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// The single correct label for this instance
    pub ground_truth: String,
    /// Comma-separated predicted labels (may be empty)
    pub predicted_raw: String,
}

impl Observation {
    pub fn new(ground_truth: impl Into<String>, predicted_raw: impl Into<String>) -> Self {
        Self {
            ground_truth: ground_truth.into(),
            predicted_raw: predicted_raw.into(),
        }
    }
}

impl<G: Into<String>, P: Into<String>> From<(G, P)> for Observation {
    fn from((ground_truth, predicted_raw): (G, P)) -> Self {
        Self::new(ground_truth, predicted_raw)
    }
}

/// How repeated tokens inside one prediction string are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Count each distinct predicted label once per observation.
    #[default]
    Deduplicate,
    /// Count every occurrence. A wrong label listed twice adds two false
    /// positives; a correct label listed twice still adds one true positive.
    PerOccurrence,
}

/// Raw counters for one label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelStats {
    pub true_positives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
}

impl LabelStats {
    /// `tp / (tp + fp)`, or 0 when nothing was predicted as this label.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// `tp / (tp + fn)`, or 0 when the label never occurs as ground truth.
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// One row of the metrics report.
///
/// Field names serialize to the report's column headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelReportRow {
    #[serde(rename = "Label")]
    pub label: String,
    #[serde(rename = "Precision")]
    pub precision: f64,
    #[serde(rename = "Recall")]
    pub recall: f64,
    #[serde(rename = "TP")]
    pub true_positives: u64,
    #[serde(rename = "FP")]
    pub false_positives: u64,
    #[serde(rename = "FN")]
    pub false_negatives: u64,
}

impl LabelReportRow {
    fn new(label: &str, stats: LabelStats) -> Self {
        Self {
            label: label.to_string(),
            precision: stats.precision(),
            recall: stats.recall(),
            true_positives: stats.true_positives,
            false_positives: stats.false_positives,
            false_negatives: stats.false_negatives,
        }
    }
}

/// Split a prediction string on commas, trimming tokens and dropping empty ones.
///
/// Order and repeats are preserved.
pub fn parse_predictions(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Compute per-label metrics with the default [`DuplicatePolicy`].
pub fn compute_metrics(observations: &[Observation]) -> Vec<LabelReportRow> {
    compute_metrics_with(observations, DuplicatePolicy::default())
}

/// Compute per-label metrics, rows sorted ascending by label.
///
/// Every ground-truth label gets a row. Predicted labels that never occur as
/// ground truth are ignored entirely.
pub fn compute_metrics_with(
    observations: &[Observation],
    policy: DuplicatePolicy,
) -> Vec<LabelReportRow> {
    let known: HashSet<&str> = observations
        .iter()
        .map(|o| o.ground_truth.as_str())
        .collect();

    let mut stats: BTreeMap<&str, LabelStats> = BTreeMap::new();

    for observation in observations {
        let gt = observation.ground_truth.as_str();
        let mut predicted = parse_predictions(&observation.predicted_raw);
        if policy == DuplicatePolicy::Deduplicate {
            let mut seen = HashSet::with_capacity(predicted.len());
            predicted.retain(|label| seen.insert(*label));
        }

        let entry = stats.entry(gt).or_default();
        if predicted.contains(&gt) {
            entry.true_positives += 1;
        } else {
            entry.false_negatives += 1;
        }

        for label in predicted {
            if label != gt && known.contains(label) {
                stats.entry(label).or_default().false_positives += 1;
            }
        }
    }

    stats
        .into_iter()
        .map(|(label, s)| LabelReportRow::new(label, s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(pairs: &[(&str, &str)]) -> Vec<Observation> {
        pairs.iter().map(|&p| Observation::from(p)).collect()
    }

    fn row<'a>(rows: &'a [LabelReportRow], label: &str) -> &'a LabelReportRow {
        rows.iter()
            .find(|r| r.label == label)
            .unwrap_or_else(|| panic!("no row for {label}"))
    }

    #[test]
    fn test_parse_predictions_trims_and_drops_empty() {
        assert_eq!(parse_predictions(" A , B,,C, "), vec!["A", "B", "C"]);
        assert!(parse_predictions("").is_empty());
        assert!(parse_predictions(" , ,").is_empty());
        assert_eq!(parse_predictions("A,A"), vec!["A", "A"]);
    }

    #[test]
    fn test_perfect_prediction() {
        let rows = compute_metrics(&obs(&[("A", "A"), ("B", "B")]));
        assert_eq!(rows.len(), 2);
        for label in ["A", "B"] {
            let r = row(&rows, label);
            assert_eq!(
                (r.true_positives, r.false_positives, r.false_negatives),
                (1, 0, 0)
            );
            assert_eq!(r.precision, 1.0);
            assert_eq!(r.recall, 1.0);
        }
    }

    #[test]
    fn test_miss_and_extra() {
        let rows = compute_metrics(&obs(&[("A", "B"), ("B", "B")]));

        let a = row(&rows, "A");
        assert_eq!(
            (a.true_positives, a.false_positives, a.false_negatives),
            (0, 0, 1)
        );
        assert_eq!(a.precision, 0.0);
        assert_eq!(a.recall, 0.0);

        let b = row(&rows, "B");
        assert_eq!(
            (b.true_positives, b.false_positives, b.false_negatives),
            (1, 1, 0)
        );
        assert_eq!(b.precision, 0.5);
        assert_eq!(b.recall, 1.0);
    }

    #[test]
    fn test_empty_prediction_is_a_miss() {
        let rows = compute_metrics(&obs(&[("A", "")]));
        assert_eq!(rows.len(), 1);
        let a = &rows[0];
        assert_eq!(
            (a.true_positives, a.false_positives, a.false_negatives),
            (0, 0, 1)
        );
        assert_eq!(a.precision, 0.0);
        assert_eq!(a.recall, 0.0);
    }

    #[test]
    fn test_unknown_prediction_produces_no_row() {
        let rows = compute_metrics(&obs(&[("A", "A, C"), ("B", "B")]));
        assert!(rows.iter().all(|r| r.label != "C"));
        let a = row(&rows, "A");
        assert_eq!(
            (a.true_positives, a.false_positives, a.false_negatives),
            (1, 0, 0)
        );
        assert_eq!(row(&rows, "B").false_positives, 0);
    }

    #[test]
    fn test_rows_sorted_ascending() {
        let rows = compute_metrics(&obs(&[("c", "a"), ("a", "b"), ("b", ""), ("B", "")]));
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "a", "b", "c"]);
    }

    #[test]
    fn test_count_conservation() {
        let data = obs(&[
            ("A", "A"),
            ("A", "B"),
            ("A", ""),
            ("B", "A,B"),
            ("C", "A, B, X"),
            ("C", "C"),
        ]);
        let rows = compute_metrics(&data);
        for r in &rows {
            let expected = data.iter().filter(|o| o.ground_truth == r.label).count() as u64;
            assert_eq!(r.true_positives + r.false_negatives, expected, "{}", r.label);
        }
    }

    #[test]
    fn test_false_positive_only_row_has_zero_precision() {
        // B is known (ground truth once) but never correctly predicted.
        let rows = compute_metrics(&obs(&[("A", "B"), ("B", "")]));
        let b = row(&rows, "B");
        assert_eq!(
            (b.true_positives, b.false_positives, b.false_negatives),
            (0, 1, 1)
        );
        assert_eq!(b.precision, 0.0);
        assert_eq!(b.recall, 0.0);
    }

    #[test]
    fn test_deterministic_output() {
        let data = obs(&[("刀具", "刀具,爪刀"), ("爪刀", "刀具"), ("充电宝", "无")]);
        assert_eq!(compute_metrics(&data), compute_metrics(&data));
    }

    #[test]
    fn test_repeated_correct_label_counts_once() {
        for policy in [DuplicatePolicy::Deduplicate, DuplicatePolicy::PerOccurrence] {
            let rows = compute_metrics_with(&obs(&[("A", "A, A")]), policy);
            assert_eq!(rows[0].true_positives, 1);
            assert_eq!(rows[0].false_negatives, 0);
        }
    }

    #[test]
    fn test_repeated_wrong_label_deduplicated_by_default() {
        let data = obs(&[("A", "B, B"), ("B", "B")]);
        let rows = compute_metrics(&data);
        assert_eq!(row(&rows, "B").false_positives, 1);
        assert_eq!(row(&rows, "B").precision, 0.5);
    }

    #[test]
    fn test_repeated_wrong_label_per_occurrence() {
        let data = obs(&[("A", "B, B"), ("B", "B")]);
        let rows = compute_metrics_with(&data, DuplicatePolicy::PerOccurrence);
        let b = row(&rows, "B");
        assert_eq!(b.false_positives, 2);
        assert!((b.precision - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input() {
        assert!(compute_metrics(&[]).is_empty());
    }

    #[test]
    fn test_label_stats_zero_guard() {
        let stats = LabelStats::default();
        assert_eq!(stats.precision(), 0.0);
        assert_eq!(stats.recall(), 0.0);
    }

    #[test]
    fn test_duplicate_policy_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: DuplicatePolicy,
        }
        let w: Wrapper = toml::from_str("policy = \"per_occurrence\"").unwrap();
        assert_eq!(w.policy, DuplicatePolicy::PerOccurrence);
    }
}
