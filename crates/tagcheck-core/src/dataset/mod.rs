//! Tabular datasets: evaluation tables, classification manifests and SFT
//! exports.

pub mod manifest;
pub mod observations;
pub mod sft;
pub mod table;

pub use manifest::{load_classify_items, write_classifications, IMAGE_PATH_COLUMN};
pub use observations::{load_observations, LoadedObservations};
pub use sft::{check_images, export_sft, write_sft_dataset, ImageCheck, SftOptions, SftSummary};
pub use table::{Row, Table};
