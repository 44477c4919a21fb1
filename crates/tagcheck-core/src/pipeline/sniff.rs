//! Content-based image format detection.
//!
//! File extensions in scraped product corpora are unreliable: `.jpg` files
//! turn out to be PNG, AVIF, or HTML error pages. Formats are therefore
//! decided from the leading bytes only.

use serde::Serialize;
use std::path::Path;

use crate::error::PipelineError;

/// Image formats that can be sent to a vision model as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl WireFormat {
    /// Short format name ("jpeg", "png", ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Jpeg => "jpeg",
            WireFormat::Png => "png",
            WireFormat::Gif => "gif",
            WireFormat::Webp => "webp",
        }
    }

    /// MIME type for API payloads.
    pub fn media_type(&self) -> &'static str {
        match self {
            WireFormat::Jpeg => "image/jpeg",
            WireFormat::Png => "image/png",
            WireFormat::Gif => "image/gif",
            WireFormat::Webp => "image/webp",
        }
    }

    /// Map a file extension to a wire format (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(WireFormat::Jpeg),
            "png" => Some(WireFormat::Png),
            "gif" => Some(WireFormat::Gif),
            "webp" => Some(WireFormat::Webp),
            _ => None,
        }
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of sniffing an image payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sniffed {
    /// Send the bytes unchanged
    Ready(WireFormat),
    /// Decodable, but must be re-encoded to JPEG first (AVIF, BMP, TIFF, ...)
    NeedsConversion(&'static str),
}

const HTML_MARKERS: [&str; 4] = ["<html", "<!doctype", "<head", "<body"];

/// Decide how to treat `bytes`, using only the first 16 bytes.
///
/// `path` is used for error context only.
pub fn sniff_bytes(bytes: &[u8], path: &Path) -> Result<Sniffed, PipelineError> {
    let header = &bytes[..bytes.len().min(16)];

    if header.starts_with(b"<!DOCTYPE") || header.starts_with(b"<html") {
        return Err(PipelineError::NotAnImage(path.to_path_buf()));
    }

    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Ok(Sniffed::Ready(WireFormat::Jpeg));
    }
    if header.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Ok(Sniffed::Ready(WireFormat::Png));
    }
    if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        return Ok(Sniffed::Ready(WireFormat::Gif));
    }
    if header.len() >= 12 && header.starts_with(b"RIFF") && &header[8..12] == b"WEBP" {
        return Ok(Sniffed::Ready(WireFormat::Webp));
    }
    if header.len() >= 12 && &header[4..12] == b"ftypavif" {
        return Ok(Sniffed::NeedsConversion("avif"));
    }

    let text = String::from_utf8_lossy(header).to_lowercase();
    if HTML_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Err(PipelineError::NotAnImage(path.to_path_buf()));
    }

    match image::guess_format(bytes) {
        Ok(format) => Ok(Sniffed::NeedsConversion(format_name(format))),
        Err(_) => Err(PipelineError::UnsupportedFormat {
            path: path.to_path_buf(),
            format: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("unknown")
                .to_string(),
        }),
    }
}

/// Convert an `image` crate format to a short name.
pub fn format_name(format: image::ImageFormat) -> &'static str {
    use image::ImageFormat;
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Tiff => "tiff",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Ico => "ico",
        ImageFormat::Pnm => "pnm",
        ImageFormat::Avif => "avif",
        ImageFormat::Tga => "tga",
        ImageFormat::Dds => "dds",
        ImageFormat::Hdr => "hdr",
        ImageFormat::OpenExr => "exr",
        ImageFormat::Farbfeld => "farbfeld",
        ImageFormat::Qoi => "qoi",
        _ => "unknown",
    }
}
