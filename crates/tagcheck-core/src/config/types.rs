//! Sub-configuration structs with their defaults.

use crate::metrics::DuplicatePolicy;
use crate::taxonomy::PromptStyle;
use serde::{Deserialize, Serialize};

/// Column names used when reading tabular inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    /// Ground-truth label column
    pub ground_truth: String,

    /// Comma-separated prediction column
    pub predictions: String,

    /// Image file name (or URL) column in classification manifests
    pub image: String,

    /// Image file name column in SFT manifests
    pub filename: String,

    /// Label column in SFT manifests
    pub flag: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            ground_truth: "tag_gt".to_string(),
            predictions: "inference_result".to_string(),
            image: "image".to_string(),
            filename: "filename".to_string(),
            flag: "flag".to_string(),
        }
    }
}

/// Metrics engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// How repeated labels within one prediction are counted
    pub duplicate_policy: DuplicatePolicy,
}

/// Corpus audit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Files above this size (in MiB) are reported as large
    pub large_file_mb: f64,

    /// How many images to list in the by-dimensions ranking
    pub top_dimensions: usize,

    /// File extensions included in the audit
    pub supported_formats: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            large_file_mb: 1.0,
            top_dimensions: 20,
            supported_formats: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
        }
    }
}

/// LLM classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Default provider ("anthropic" or "openai")
    pub provider: String,

    /// Maximum concurrent LLM calls
    pub parallel: usize,

    /// Maximum tokens to generate per image
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum number of labels kept from one response
    pub max_labels: usize,

    /// Mark the system prompt as cacheable
    pub use_cache: bool,

    /// Optional taxonomy file (TOML); the built-in taxonomy is used otherwise
    pub taxonomy: Option<String>,

    /// System prompt style: "recall" (multi-label) or "precise"
    pub prompt_style: PromptStyle,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            parallel: 4,
            max_tokens: 150,
            temperature: 0.0,
            max_labels: 5,
            use_cache: true,
            taxonomy: None,
            prompt_style: PromptStyle::Recall,
        }
    }
}

/// Retry settings for transient failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Max retry attempts for transient failures
    pub retry_attempts: u32,

    /// Base delay between retries in milliseconds (doubles per attempt)
    pub retry_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum image file size in megabytes
    pub max_file_size_mb: u64,

    /// LLM call timeout in milliseconds
    pub llm_timeout_ms: u64,

    /// Remote image download timeout in milliseconds
    pub fetch_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 20,
            llm_timeout_ms: 60_000,
            fetch_timeout_ms: 30_000,
        }
    }
}

/// SFT dataset export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Bucket holding the training images
    pub bucket: String,

    /// Key prefix of the images inside the bucket
    pub prefix: String,

    /// Account id that owns the bucket
    pub bucket_owner: String,

    /// User turn text paired with every image
    pub user_prompt: String,

    /// System prompt style for exported records
    pub prompt_style: PromptStyle,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: "imgs".to_string(),
            bucket_owner: String::new(),
            user_prompt: "Please classify the item in this image according to the categories \
                          defined in the system."
                .to_string(),
            prompt_style: PromptStyle::Precise,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// LLM provider configurations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// Anthropic configuration
    pub anthropic: Option<AnthropicConfig>,

    /// OpenAI (or OpenAI-compatible) configuration
    pub openai: Option<OpenAiConfig>,
}

/// Anthropic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: "${ANTHROPIC_API_KEY}".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Chat Completions endpoint
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax); optional for custom endpoints
    pub api_key: String,

    /// Model name
    pub model: String,
}

/// Hosted OpenAI Chat Completions endpoint.
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

fn default_openai_endpoint() -> String {
    DEFAULT_OPENAI_ENDPOINT.to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_openai_endpoint(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}
