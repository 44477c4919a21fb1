//! OpenAI LLM provider using the Chat Completions API.
//!
//! Sends the taxonomy as a system message and the image as a data URL in the
//! user message. Works against any OpenAI-compatible endpoint. Prompt caching
//! is automatic on this API; cached prompt tokens are read back from usage.
//! Assistant prefill is not sent.

use super::provider::{request_error, ClassifyRequest, LlmProvider, LlmResponse, TokenUsage};
use crate::config::DEFAULT_OPENAI_ENDPOINT;
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// OpenAI provider using Chat Completions API.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            endpoint: endpoint.to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    fn build_body(&self, request: &ClassifyRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: vec![ChatContent::Text {
                        text: request.system_prompt.clone(),
                    }],
                },
                ChatMessage {
                    role: "user",
                    content: vec![
                        ChatContent::ImageUrl {
                            image_url: ImageUrl {
                                url: request.image.data_url(),
                            },
                        },
                        ChatContent::Text {
                            text: request.user_prompt.clone(),
                        },
                    ],
                },
            ],
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ChatContent>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: String,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    #[serde(default)]
    prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Deserialize)]
struct PromptTokensDetails {
    #[serde(default)]
    cached_tokens: u64,
}

impl From<ChatUsage> for TokenUsage {
    fn from(usage: ChatUsage) -> Self {
        Self {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            cache_write_tokens: 0,
            cache_read_tokens: usage
                .prompt_tokens_details
                .map(|d| d.cached_tokens)
                .unwrap_or(0),
        }
    }
}

fn parse_response(resp: ChatResponse) -> Result<(String, String, TokenUsage), PipelineError> {
    let text = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| PipelineError::Llm {
            message: "OpenAI returned empty choices array, no content generated".to_string(),
            status_code: None,
        })?;
    let usage = resp.usage.map(TokenUsage::from).unwrap_or_default();
    Ok((text.trim().to_string(), resp.model, usage))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    /// A key is required only by the hosted endpoint.
    async fn is_available(&self) -> bool {
        !self.api_key.is_empty() || self.endpoint != DEFAULT_OPENAI_ENDPOINT
    }

    async fn classify(&self, request: &ClassifyRequest) -> Result<LlmResponse, PipelineError> {
        let start = Instant::now();
        let body = self.build_body(request);

        let mut builder = self.client.post(&self.endpoint);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }
        let resp = builder
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_error("openai", &request.source, e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Llm {
                message: format!("OpenAI HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let chat_resp: ChatResponse = resp.json().await.map_err(|e| PipelineError::Llm {
            message: format!("Failed to parse OpenAI response: {e}"),
            status_code: None,
        })?;

        let (text, model, usage) = parse_response(chat_resp)?;
        let latency_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            "openai: {}ms, in={} out={} cached={}",
            latency_ms,
            usage.input_tokens,
            usage.output_tokens,
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
