//! Corpus audit: mislabeled extensions, oversized files, largest images.

use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::discovery::{DiscoveredFile, FileDiscovery};
use super::sniff::format_name;
use crate::config::AuditConfig;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A `.jpg` file whose content is something else.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionMismatch {
    pub path: PathBuf,
    /// Detected format, or `None` when the content was not recognized
    pub actual_format: Option<String>,
    /// Why detection failed, if it did
    pub error: Option<String>,
}

/// A file above the size threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LargeFile {
    pub path: PathBuf,
    pub size_mb: f64,
}

/// An image ranked by pixel count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageDimensions {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub pixels: u64,
}

/// Size statistics for a set of files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SizeAudit {
    pub large_files: Vec<LargeFile>,
    pub largest_by_pixels: Vec<ImageDimensions>,
    /// Images whose header could not be read
    pub unreadable: usize,
}

/// Full audit report for a directory.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub root: PathBuf,
    pub files_scanned: usize,
    pub total_bytes: u64,
    pub large_file_mb: f64,
    pub mismatches: Vec<ExtensionMismatch>,
    #[serde(flatten)]
    pub sizes: SizeAudit,
}

/// Run the full audit over `dir`.
pub fn audit_directory(dir: &Path, config: &AuditConfig) -> AuditReport {
    let files = FileDiscovery::new(&config.supported_formats).discover(dir);
    tracing::info!("Auditing {} files under {:?}", files.len(), dir);

    let mismatches = find_extension_mismatches(&files);
    let sizes = audit_sizes(&files, config.large_file_mb, config.top_dimensions);

    AuditReport {
        root: dir.to_path_buf(),
        files_scanned: files.len(),
        total_bytes: FileDiscovery::total_size(&files),
        large_file_mb: config.large_file_mb,
        mismatches,
        sizes,
    }
}

/// Files with a `.jpg` extension whose content is not JPEG.
pub fn find_extension_mismatches(files: &[DiscoveredFile]) -> Vec<ExtensionMismatch> {
    files
        .iter()
        .filter(|f| {
            f.path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("jpg"))
        })
        .filter_map(|f| match detect_format(&f.path) {
            Ok(Some(image::ImageFormat::Jpeg)) => None,
            Ok(Some(format)) => Some(ExtensionMismatch {
                path: f.path.clone(),
                actual_format: Some(format_name(format).to_string()),
                error: None,
            }),
            Ok(None) => Some(ExtensionMismatch {
                path: f.path.clone(),
                actual_format: None,
                error: Some("unrecognized content".to_string()),
            }),
            Err(e) => Some(ExtensionMismatch {
                path: f.path.clone(),
                actual_format: None,
                error: Some(e.to_string()),
            }),
        })
        .collect()
}

/// Guess the format from the leading bytes, ignoring the extension.
fn detect_format(path: &Path) -> std::io::Result<Option<image::ImageFormat>> {
    let mut header = Vec::with_capacity(64);
    std::fs::File::open(path)?.take(64).read_to_end(&mut header)?;
    Ok(image::guess_format(&header).ok())
}

/// Header-only dimension read; the content decides the decoder, not the extension.
fn read_dimensions(path: &Path) -> image::ImageResult<(u32, u32)> {
    image::ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()
}

/// Files above `large_mb` (MiB) and the `top_n` images by pixel count.
///
/// Dimensions come from image headers; files whose header cannot be read are
/// counted in `unreadable` and left out of the ranking.
pub fn audit_sizes(files: &[DiscoveredFile], large_mb: f64, top_n: usize) -> SizeAudit {
    let mut audit = SizeAudit::default();

    for file in files {
        let size_mb = file.size as f64 / BYTES_PER_MB;
        if size_mb > large_mb {
            audit.large_files.push(LargeFile {
                path: file.path.clone(),
                size_mb,
            });
        }

        match read_dimensions(&file.path) {
            Ok((width, height)) => audit.largest_by_pixels.push(ImageDimensions {
                path: file.path.clone(),
                width,
                height,
                pixels: width as u64 * height as u64,
            }),
            Err(e) => {
                tracing::debug!("Cannot read dimensions of {:?}: {}", file.path, e);
                audit.unreadable += 1;
            }
        }
    }

    audit
        .large_files
        .sort_by(|a, b| b.size_mb.total_cmp(&a.size_mb));
    audit
        .largest_by_pixels
        .sort_by(|a, b| b.pixels.cmp(&a.pixels).then_with(|| a.path.cmp(&b.path)));
    audit.largest_by_pixels.truncate(top_n);
    audit
}
