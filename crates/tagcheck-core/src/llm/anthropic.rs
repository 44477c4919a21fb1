//! Anthropic LLM provider using the Messages API.
//!
//! The system prompt is sent as a single text block marked for ephemeral
//! prompt caching, so every image in a batch after the first reads the
//! (large, unchanging) taxonomy prompt from the cache. An optional assistant
//! prefill is appended as the final message.

use super::provider::{request_error, ClassifyRequest, LlmProvider, LlmResponse, TokenUsage};
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Anthropic provider using the Messages API.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    fn build_body(&self, request: &ClassifyRequest) -> MessagesRequest {
        let mut messages = vec![Message {
            role: "user",
            content: vec![
                ContentBlock::Image {
                    source: ImageSource {
                        source_type: "base64",
                        media_type: request.image.media_type(),
                        data: request.image.data.clone(),
                    },
                },
                ContentBlock::Text {
                    text: request.user_prompt.clone(),
                },
            ],
        }];
        if let Some(prefill) = &request.prefill {
            messages.push(Message {
                role: "assistant",
                content: vec![ContentBlock::Text {
                    text: prefill.clone(),
                }],
            });
        }

        MessagesRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: Some(request.temperature),
            system: vec![SystemBlock {
                block_type: "text",
                text: request.system_prompt.clone(),
                cache_control: request.use_cache.then_some(CacheControl {
                    control_type: "ephemeral",
                }),
            }],
            messages,
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: Vec<SystemBlock>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct SystemBlock {
    #[serde(rename = "type")]
    block_type: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    control_type: &'static str,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "image")]
    Image { source: ImageSource },
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'static str,
    data: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseContent>,
    model: String,
    usage: Usage,
}

#[derive(Deserialize)]
struct ResponseContent {
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cache_write_tokens: usage.cache_creation_input_tokens.unwrap_or(0),
            cache_read_tokens: usage.cache_read_input_tokens.unwrap_or(0),
        }
    }
}

fn parse_response(resp: MessagesResponse) -> Result<(String, String, TokenUsage), PipelineError> {
    let text = resp
        .content
        .into_iter()
        .filter_map(|c| c.text)
        .collect::<Vec<_>>()
        .join("");

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(PipelineError::Llm {
            message: "Anthropic returned empty response, no text content generated".to_string(),
            status_code: None,
        });
    }
    Ok((text, resp.model, resp.usage.into()))
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn classify(&self, request: &ClassifyRequest) -> Result<LlmResponse, PipelineError> {
        let start = Instant::now();
        let body = self.build_body(request);

        let resp = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_error("anthropic", &request.source, e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Llm {
                message: format!("Anthropic HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let messages_resp: MessagesResponse =
            resp.json().await.map_err(|e| PipelineError::Llm {
                message: format!("Failed to parse Anthropic response: {e}"),
                status_code: None,
            })?;

        let (text, model, usage) = parse_response(messages_resp)?;
        let latency_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "anthropic: {}ms, in={} out={} cache_write={} cache_read={}",
            latency_ms,
            usage.input_tokens,
            usage.output_tokens,
            usage.cache_write_tokens,
            usage.cache_read_tokens
        );

        Ok(LlmResponse {
            text,
            model,
            usage,
            latency_ms,
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
