//! Loading metrics observations from an evaluation table.

use super::table::Table;
use crate::error::DatasetError;
use crate::metrics::Observation;

/// Observations read from a table, plus the rows that were rejected.
#[derive(Debug, Clone, Default)]
pub struct LoadedObservations {
    pub observations: Vec<Observation>,
    /// Rows skipped because their ground truth was blank
    pub skipped: usize,
}

/// Extract `(ground_truth, predictions)` observations from `table`.
///
/// Ground-truth values are trimmed; a row whose ground truth is empty after
/// trimming is skipped and counted rather than aggregated under an empty
/// label. Prediction strings are passed through untouched.
pub fn load_observations(
    table: &Table,
    ground_truth_col: &str,
    predictions_col: &str,
) -> Result<LoadedObservations, DatasetError> {
    let gt_idx = table.column(ground_truth_col)?;
    let pred_idx = table.column(predictions_col)?;

    let mut loaded = LoadedObservations::default();
    for (line, row) in table.rows().enumerate() {
        let ground_truth = row.get(gt_idx).trim();
        if ground_truth.is_empty() {
            tracing::warn!(
                "Skipping row {} of {:?}: empty '{}'",
                line + 2,
                table.path(),
                ground_truth_col
            );
            loaded.skipped += 1;
            continue;
        }
        loaded
            .observations
            .push(Observation::new(ground_truth, row.get(pred_idx)));
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes(), Path::new("eval.csv")).unwrap()
    }

    #[test]
    fn test_load_observations() {
        let t = table("image,tag_gt,inference_result\na.jpg,刀具,\"刀具,爪刀\"\nb.jpg,充电宝,\n");
        let loaded = load_observations(&t, "tag_gt", "inference_result").unwrap();
        assert_eq!(loaded.skipped, 0);
        assert_eq!(
            loaded.observations,
            vec![
                Observation::new("刀具", "刀具,爪刀"),
                Observation::new("充电宝", ""),
            ]
        );
    }

    #[test]
    fn test_blank_ground_truth_skipped() {
        let t = table("tag_gt,inference_result\n  ,A\nB,B\n,\n");
        let loaded = load_observations(&t, "tag_gt", "inference_result").unwrap();
        assert_eq!(loaded.skipped, 2);
        assert_eq!(loaded.observations, vec![Observation::new("B", "B")]);
    }

    #[test]
    fn test_ground_truth_trimmed() {
        let t = table("tag_gt,inference_result\n A ,A\n");
        let loaded = load_observations(&t, "tag_gt", "inference_result").unwrap();
        assert_eq!(loaded.observations[0].ground_truth, "A");
    }

    #[test]
    fn test_missing_prediction_column() {
        let t = table("tag_gt,result\nA,A\n");
        let err = load_observations(&t, "tag_gt", "inference_result").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("inference_result"));
        assert!(msg.contains("tag_gt, result"));
    }
}
