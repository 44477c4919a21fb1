//! Error types for tagcheck.
//!
//! Errors are grouped by where they arise (configuration, tabular datasets,
//! image/LLM pipeline) so messages carry the context needed to fix the input:
//! file paths, column names, HTTP status codes.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for tagcheck operations.
#[derive(Error, Debug)]
pub enum TagcheckError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tabular dataset errors
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Image or LLM pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding errors outside a specific dataset file
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while loading or writing tabular data.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// A required column is absent from the header row.
    #[error("Column '{column}' not found. Available columns: [{}]", available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// The file could not be parsed as CSV
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The file could not be opened or written
    #[error("Cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Image and LLM pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding or re-encoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Payload is recognizably not an image (HTML error pages and the like)
    #[error("File appears to be HTML/text, not an image: {0}")]
    NotAnImage(PathBuf),

    /// Unsupported or corrupted image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Downloading a remote image failed
    #[error("Failed to download {url}: {message}")]
    Fetch { url: String, message: String },

    /// LLM request failed
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        status_code: Option<u16>,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },
}

/// Convenience type alias for tagcheck results.
pub type Result<T> = std::result::Result<T, TagcheckError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
