//! LLM provider trait and request/response types.
//!
//! Defines the interface that all vision providers implement, plus the
//! factory that creates the right provider from CLI flags and config.

use crate::config::{LlmConfig, DEFAULT_OPENAI_ENDPOINT};
use crate::error::PipelineError;
use crate::pipeline::{PreparedImage, WireFormat};
use async_trait::async_trait;
use base64::Engine;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base64-encoded image ready to send to an LLM API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// Wire format, used for the MIME type
    pub format: WireFormat,
}

impl ImageInput {
    pub fn from_bytes(bytes: &[u8], format: WireFormat) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            format,
        }
    }

    pub fn media_type(&self) -> &'static str {
        self.format.media_type()
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type(), self.data)
    }
}

impl From<&PreparedImage> for ImageInput {
    fn from(image: &PreparedImage) -> Self {
        Self::from_bytes(&image.bytes, image.format)
    }
}

/// A single-image classification request.
#[derive(Debug, Clone)]
pub struct ClassifyRequest {
    pub image: ImageInput,
    /// Image path or URL, for error reporting
    pub source: PathBuf,
    /// Shared across the whole batch; cacheable by providers that support it
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the provider to cache the system prompt
    pub use_cache: bool,
    /// Assistant-turn text the model continues from
    pub prefill: Option<String>,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Tokens written to the prompt cache by this request
    pub cache_write_tokens: u64,
    /// Tokens served from the prompt cache
    pub cache_read_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_write_tokens += other.cache_write_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
    }
}

/// The response from a classification call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Raw text generated after the prefill
    pub text: String,
    /// Model identifier used
    pub model: String,
    pub usage: TokenUsage,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all LLM providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn LlmProvider>` for dynamic dispatch).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging (e.g., "anthropic", "openai").
    fn name(&self) -> &str;

    /// Check whether the provider is configured.
    async fn is_available(&self) -> bool;

    /// Classify the image in `request`.
    async fn classify(&self, request: &ClassifyRequest) -> Result<LlmResponse, PipelineError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Map a reqwest failure for the image at `source` to a pipeline error,
/// keeping timeouts distinct.
pub(crate) fn request_error(
    provider: &str,
    source: &Path,
    err: reqwest::Error,
    timeout: Duration,
) -> PipelineError {
    if err.is_timeout() {
        PipelineError::Timeout {
            path: source.to_path_buf(),
            stage: "llm".to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        PipelineError::Llm {
            message: format!("{provider} request failed: {err}"),
            status_code: err.status().map(|s| s.as_u16()),
        }
    }
}

/// Factory that creates the appropriate provider from CLI flags and config.
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create an LLM provider based on provider name, config, and optional model override.
    ///
    /// # Arguments
    /// * `provider` - Provider identifier ("anthropic", "openai")
    /// * `config` - The full LLM config section
    /// * `model_override` - Optional model name that overrides the config default
    /// * `timeout` - Per-request timeout
    pub fn create(
        provider: &str,
        config: &LlmConfig,
        model_override: Option<&str>,
        timeout: Duration,
    ) -> Result<Box<dyn LlmProvider>, PipelineError> {
        match provider {
            "anthropic" => {
                let cfg = config.anthropic.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| PipelineError::Llm {
                    message: "Anthropic API key not set. Set ANTHROPIC_API_KEY env var."
                        .to_string(),
                    status_code: None,
                })?;
                let model = model_override.map(String::from).unwrap_or(cfg.model);
                Ok(Box::new(super::anthropic::AnthropicProvider::new(
                    &api_key, &model, timeout,
                )))
            }
            "openai" => {
                let cfg = config.openai.clone().unwrap_or_default();
                // Only the hosted endpoint needs a key.
                let api_key = match resolve_env_var(&cfg.api_key) {
                    Some(key) => key,
                    None if cfg.endpoint != DEFAULT_OPENAI_ENDPOINT => String::new(),
                    None => {
                        return Err(PipelineError::Llm {
                            message: "OpenAI API key not set. Set OPENAI_API_KEY env var."
                                .to_string(),
                            status_code: None,
                        })
                    }
                };
                let model = model_override.map(String::from).unwrap_or(cfg.model);
                Ok(Box::new(super::openai::OpenAiProvider::new(
                    &cfg.endpoint,
                    &api_key,
                    &model,
                    timeout,
                )))
            }
            other => Err(PipelineError::Llm {
                message: format!("Unknown LLM provider: {other}"),
                status_code: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiConfig;

    #[test]
    fn test_image_input_from_bytes_jpeg() {
        let input = ImageInput::from_bytes(&[0xFF, 0xD8, 0xFF], WireFormat::Jpeg);
        assert_eq!(input.media_type(), "image/jpeg");
        assert_eq!(input.data, "/9j/");
    }

    #[test]
    fn test_image_input_data_url() {
        let input = ImageInput::from_bytes(&[1, 2, 3], WireFormat::Png);
        assert_eq!(input.data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_usage_add() {
        let mut total = TokenUsage::default();
        total.add(&TokenUsage {
            input_tokens: 10,
            output_tokens: 2,
            cache_write_tokens: 100,
            cache_read_tokens: 0,
        });
        total.add(&TokenUsage {
            input_tokens: 10,
            output_tokens: 3,
            cache_write_tokens: 0,
            cache_read_tokens: 100,
        });
        assert_eq!(total.input_tokens, 20);
        assert_eq!(total.output_tokens, 5);
        assert_eq!(total.cache_write_tokens, 100);
        assert_eq!(total.cache_read_tokens, 100);
    }

    #[test]
    fn test_resolve_env_var() {
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        assert_eq!(resolve_env_var(""), None);
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_TAGCHECK_123}"), None);
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let result = LlmProviderFactory::create(
            "bedrock",
            &LlmConfig::default(),
            None,
            Duration::from_secs(1),
        );
        match result {
            Err(err) => assert!(err.to_string().contains("Unknown LLM provider: bedrock")),
            Ok(_) => panic!("Expected unknown provider error"),
        }
    }

    #[test]
    fn test_factory_with_literal_key() {
        let mut config = LlmConfig::default();
        config.openai = Some(crate::config::OpenAiConfig {
            api_key: "sk-test".to_string(),
            ..Default::default()
        });
        let provider = LlmProviderFactory::create(
            "openai",
            &config,
            Some("gpt-4o"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.timeout(), Duration::from_secs(5));
    }

    fn openai_config(endpoint: &str, api_key: &str) -> LlmConfig {
        LlmConfig {
            openai: Some(OpenAiConfig {
                endpoint: endpoint.to_string(),
                api_key: api_key.to_string(),
                model: "m".to_string(),
            }),
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn test_factory_allows_keyless_custom_openai_endpoint() {
        let config = openai_config("http://localhost:11434/v1/chat/completions", "");
        let provider =
            LlmProviderFactory::create("openai", &config, None, Duration::from_secs(5)).unwrap();
        assert_eq!(provider.name(), "openai");
        assert!(provider.is_available().await);
    }

    #[test]
    fn test_factory_requires_key_for_hosted_openai() {
        let config = openai_config(DEFAULT_OPENAI_ENDPOINT, "");
        let err = LlmProviderFactory::create("openai", &config, None, Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
