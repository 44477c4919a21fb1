//! Classification manifests in, evaluation tables out.
//!
//! A manifest lists images (file names relative to an images directory, or
//! URLs) with an optional ground-truth column. The classification output is
//! an evaluation table with the ground-truth and predictions columns named
//! as configured, so it can be fed straight back into `metrics`.

use std::path::Path;

use super::table::Table;
use crate::error::DatasetError;
use crate::llm::{Classification, ClassifyItem};
use crate::pipeline::ImageSource;

/// Column holding the resolved image path or URL in classification output.
pub const IMAGE_PATH_COLUMN: &str = "image_path";

/// Read classification items from `table`.
///
/// `image_col` is required; `ground_truth_col` is used when present. Rows
/// with an empty image cell are skipped.
pub fn load_classify_items(
    table: &Table,
    image_col: &str,
    ground_truth_col: &str,
    images_dir: Option<&Path>,
) -> Result<Vec<ClassifyItem>, DatasetError> {
    let image_idx = table.column(image_col)?;
    let gt_idx = table
        .has_column(ground_truth_col)
        .then(|| table.column(ground_truth_col))
        .transpose()?;

    let mut items = Vec::with_capacity(table.len());
    for (line, row) in table.rows().enumerate() {
        let image = row.get(image_idx).trim();
        if image.is_empty() {
            tracing::warn!("Skipping row {}: empty '{}'", line + 2, image_col);
            continue;
        }
        items.push(ClassifyItem {
            index: items.len(),
            ground_truth: gt_idx.map(|idx| row.get(idx).trim().to_string()),
            source: ImageSource::parse(image, images_dir),
        });
    }
    Ok(items)
}

/// Write results as CSV: ground truth, image path, prediction.
pub fn write_classifications(
    path: &Path,
    results: &[Classification],
    ground_truth_col: &str,
    predictions_col: &str,
) -> Result<(), DatasetError> {
    let csv_err = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer
        .write_record([ground_truth_col, IMAGE_PATH_COLUMN, predictions_col])
        .map_err(csv_err)?;
    for result in results {
        let image = result.source.to_string();
        writer
            .write_record([
                result.ground_truth.as_deref().unwrap_or(""),
                image.as_str(),
                result.prediction.as_str(),
            ])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}
