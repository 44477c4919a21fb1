//! Turning an image reference into bytes a vision model accepts.
//!
//! A reference is either a local path or an `http(s)` URL. Local files are
//! size-checked, sniffed and, when needed, converted to JPEG on the blocking
//! pool. Remote images are downloaded with a timeout and go through the same
//! sniffing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult};

use super::normalize::to_jpeg_bytes;
use super::sniff::{sniff_bytes, Sniffed, WireFormat};

/// Where an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Local(PathBuf),
    Remote(String),
}

impl ImageSource {
    /// Interpret a manifest cell. URLs are kept verbatim; relative paths are
    /// resolved against `base_dir` when given.
    pub fn parse(value: &str, base_dir: Option<&Path>) -> Self {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            return ImageSource::Remote(value.to_string());
        }
        let path = PathBuf::from(value);
        match base_dir {
            Some(base) if path.is_relative() => ImageSource::Local(base.join(path)),
            _ => ImageSource::Local(path),
        }
    }

    /// Path used in error messages and logs.
    pub fn display_path(&self) -> PathBuf {
        match self {
            ImageSource::Local(path) => path.clone(),
            ImageSource::Remote(url) => PathBuf::from(url),
        }
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSource::Local(path) => write!(f, "{}", path.display()),
            ImageSource::Remote(url) => f.write_str(url),
        }
    }
}

/// Image bytes ready to embed in a request.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub format: WireFormat,
    /// Original format when the bytes were re-encoded
    pub converted_from: Option<&'static str>,
}

/// Loads and normalizes images under configured limits.
#[derive(Clone)]
pub struct ImageLoader {
    client: reqwest::Client,
    limits: LimitsConfig,
}

impl ImageLoader {
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            limits,
        }
    }

    /// Load, sniff and normalize one image.
    pub async fn load(&self, source: &ImageSource) -> PipelineResult<PreparedImage> {
        let (bytes, path) = match source {
            ImageSource::Local(path) => (self.read_local(path).await?, path.clone()),
            ImageSource::Remote(url) => (self.fetch(url).await?, PathBuf::from(url)),
        };
        prepare_bytes(bytes, path).await
    }

    async fn read_local(&self, path: &Path) -> PipelineResult<Vec<u8>> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| PipelineError::FileNotFound(path.to_path_buf()))?;

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        tokio::fs::read(path).await.map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot read file: {e}"),
        })
    }

    async fn fetch(&self, url: &str) -> PipelineResult<Vec<u8>> {
        let fetch_err = |message: String| PipelineError::Fetch {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .timeout(Duration::from_millis(self.limits.fetch_timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::Timeout {
                        path: PathBuf::from(url),
                        stage: "fetch".to_string(),
                        timeout_ms: self.limits.fetch_timeout_ms,
                    }
                } else {
                    fetch_err(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if bytes.len() as u64 > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: PathBuf::from(url),
                size_mb: bytes.len() as u64 / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        Ok(bytes.to_vec())
    }
}

/// Sniff `bytes` and convert to JPEG when the format is not accepted as-is.
pub async fn prepare_bytes(bytes: Vec<u8>, path: PathBuf) -> PipelineResult<PreparedImage> {
    match sniff_bytes(&bytes, &path)? {
        Sniffed::Ready(format) => Ok(PreparedImage {
            bytes,
            format,
            converted_from: None,
        }),
        Sniffed::NeedsConversion(original) => {
            tracing::debug!("Converting {} image {:?} to JPEG", original, path);
            let blocking_path = path.clone();
            let jpeg = tokio::task::spawn_blocking(move || to_jpeg_bytes(&bytes, &blocking_path))
                .await
                .map_err(|e| PipelineError::Decode {
                    path,
                    message: format!("Task join error: {e}"),
                })??;
            Ok(PreparedImage {
                bytes: jpeg,
                format: WireFormat::Jpeg,
                converted_from: Some(original),
            })
        }
    }
}
