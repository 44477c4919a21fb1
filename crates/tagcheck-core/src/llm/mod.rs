//! LLM integration for restricted-item image classification.
//!
//! Provides a provider abstraction over vision backends (Anthropic,
//! OpenAI-compatible) and a concurrent classification engine that labels
//! batches of images against the taxonomy.

pub(crate) mod anthropic;
pub mod classifier;
pub(crate) mod openai;
pub mod provider;
pub mod response;
pub mod retry;

pub use classifier::{
    Classification, ClassifyItem, ClassifyOptions, ClassifyStats, Classifier, Outcome,
};
pub use provider::{ClassifyRequest, ImageInput, LlmProvider, LlmProviderFactory, LlmResponse, TokenUsage};
pub use response::{parse_result, ParsedResult, CONTENT_FILTERED};
pub use retry::RetryPolicy;
