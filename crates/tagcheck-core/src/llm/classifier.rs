//! Concurrent image classification engine.
//!
//! The classifier takes a manifest of images and asks a vision model for
//! taxonomy labels, in parallel with bounded concurrency (semaphore). Each
//! result is handed to a callback as it completes so the CLI can report
//! progress; the returned results are in manifest order.

use super::provider::{ClassifyRequest, ImageInput, LlmProvider, TokenUsage};
use super::response::{is_content_filtered, parse_result, ParsedResult, CONTENT_FILTERED};
use super::retry::RetryPolicy;
use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline::{ImageLoader, ImageSource};
use crate::taxonomy::{render_prompt, render_user_prompt, PromptStyle, Taxonomy, PREFILL};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Configuration for the classification engine.
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    /// Maximum concurrent requests
    pub parallel: usize,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    pub retry: RetryPolicy,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Labels kept per prediction
    pub max_labels: usize,
    /// Request prompt caching for the system prompt
    pub use_cache: bool,
    pub prompt_style: PromptStyle,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            parallel: 4,
            timeout_ms: 60_000,
            retry: RetryPolicy {
                max_retries: 3,
                base_delay_ms: 1000,
            },
            max_tokens: 150,
            temperature: 0.0,
            max_labels: 5,
            use_cache: true,
            prompt_style: PromptStyle::Recall,
        }
    }
}

impl ClassifyOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            parallel: config.classify.parallel,
            timeout_ms: config.limits.llm_timeout_ms,
            retry: RetryPolicy::from(&config.pipeline),
            max_tokens: config.classify.max_tokens,
            temperature: config.classify.temperature,
            max_labels: config.classify.max_labels,
            use_cache: config.classify.use_cache,
            prompt_style: config.classify.prompt_style,
        }
    }
}

/// One manifest row to classify.
#[derive(Debug, Clone)]
pub struct ClassifyItem {
    /// Position in the manifest
    pub index: usize,
    pub ground_truth: Option<String>,
    pub source: ImageSource,
}

/// How a single classification ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    ContentFiltered,
    NotAnImage,
    Unsupported,
    Failed,
}

impl Outcome {
    fn from_error(error: &PipelineError) -> Self {
        match error {
            PipelineError::NotAnImage(_) => Outcome::NotAnImage,
            PipelineError::UnsupportedFormat { .. } | PipelineError::Decode { .. } => {
                Outcome::Unsupported
            }
            other if is_content_filtered(&other.to_string()) => Outcome::ContentFiltered,
            _ => Outcome::Failed,
        }
    }
}

/// Result of classifying one image.
#[derive(Debug, Clone)]
pub struct Classification {
    pub index: usize,
    pub ground_truth: Option<String>,
    pub source: ImageSource,
    /// Value for the predictions column: labels, `CONTENT_FILTERED`, raw
    /// reply text, or `ERROR: <message>`
    pub prediction: String,
    pub outcome: Outcome,
    pub usage: TokenUsage,
}

/// Aggregate counters for a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassifyStats {
    pub total: usize,
    pub succeeded: usize,
    pub content_filtered: usize,
    pub not_an_image: usize,
    pub unsupported: usize,
    /// Other failures (network, auth, timeouts, missing files)
    pub failed: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_write_tokens: u64,
    pub cache_read_tokens: u64,
}

impl ClassifyStats {
    pub fn record(&mut self, result: &Classification) {
        self.total += 1;
        match result.outcome {
            Outcome::Success => self.succeeded += 1,
            Outcome::ContentFiltered => self.content_filtered += 1,
            Outcome::NotAnImage => self.not_an_image += 1,
            Outcome::Unsupported => self.unsupported += 1,
            Outcome::Failed => self.failed += 1,
        }
        self.input_tokens += result.usage.input_tokens;
        self.output_tokens += result.usage.output_tokens;
        self.cache_write_tokens += result.usage.cache_write_tokens;
        self.cache_read_tokens += result.usage.cache_read_tokens;
    }

    /// Every outcome other than a parsed success.
    pub fn errors(&self) -> usize {
        self.total - self.succeeded
    }
}

/// Concurrent classification engine.
pub struct Classifier {
    provider: Arc<dyn LlmProvider>,
    loader: ImageLoader,
    system_prompt: Arc<str>,
    user_prompt: Arc<str>,
    options: ClassifyOptions,
}

impl Classifier {
    pub fn new(
        provider: Box<dyn LlmProvider>,
        loader: ImageLoader,
        taxonomy: &Taxonomy,
        options: ClassifyOptions,
    ) -> Self {
        let system_prompt = render_prompt(taxonomy, options.max_labels, options.prompt_style);
        let user_prompt = render_user_prompt(options.prompt_style, options.max_labels);
        Self {
            provider: Arc::from(provider),
            loader,
            system_prompt: Arc::from(system_prompt),
            user_prompt: Arc::from(user_prompt),
            options,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Classify a batch of images.
    ///
    /// Spawns one tokio task per image, bounded by a semaphore. Calls
    /// `on_result` for each completed classification. Returns the results in
    /// manifest order together with aggregate statistics.
    pub async fn classify_batch<F>(
        &self,
        items: Vec<ClassifyItem>,
        on_result: F,
    ) -> (Vec<Classification>, ClassifyStats)
    where
        F: Fn(&Classification) + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.options.parallel.max(1)));
        let on_result = Arc::new(on_result);
        let mut handles = Vec::with_capacity(items.len());

        for item in items {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::warn!("Classification semaphore closed unexpectedly, stopping batch");
                    break;
                }
            };

            let provider = self.provider.clone();
            let loader = self.loader.clone();
            let prompts = (self.system_prompt.clone(), self.user_prompt.clone());
            let options = self.options.clone();
            let on_result = on_result.clone();
            let fallback = (item.index, item.ground_truth.clone(), item.source.clone());

            let handle = tokio::spawn(async move {
                let result =
                    classify_single(provider.as_ref(), &loader, &prompts, item, &options).await;
                drop(permit); // Release concurrency permit before callback
                on_result(&result);
                result
            });

            handles.push((fallback, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut stats = ClassifyStats::default();

        for ((index, ground_truth, source), handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Classification task panicked: {e}");
                    Classification {
                        index,
                        ground_truth,
                        source,
                        prediction: format!("ERROR: task failed: {e}"),
                        outcome: Outcome::Failed,
                        usage: TokenUsage::default(),
                    }
                }
            };
            stats.record(&result);
            results.push(result);
        }

        results.sort_by_key(|r| r.index);
        (results, stats)
    }
}

/// Load, classify and parse a single image with retry logic.
async fn classify_single(
    provider: &dyn LlmProvider,
    loader: &ImageLoader,
    (system_prompt, user_prompt): &(Arc<str>, Arc<str>),
    item: ClassifyItem,
    options: &ClassifyOptions,
) -> Classification {
    let label = item.source.to_string();

    let outcome = async {
        let image = options
            .retry
            .run(&label, || loader.load(&item.source))
            .await?;
        if let Some(original) = image.converted_from {
            tracing::debug!("{} converted from {} to jpeg", label, original);
        }

        let request = ClassifyRequest {
            image: ImageInput::from(&image),
            source: item.source.display_path(),
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            use_cache: options.use_cache,
            prefill: Some(PREFILL.to_string()),
        };

        let request = &request;
        let timeout_ms = options.timeout_ms;
        let path = item.source.display_path();
        options
            .retry
            .run(&label, || {
                let path = path.clone();
                async move {
                    let timeout = Duration::from_millis(timeout_ms);
                    match tokio::time::timeout(timeout, provider.classify(request)).await {
                        Ok(result) => result,
                        Err(_) => Err(PipelineError::Timeout {
                            path,
                            stage: "llm".to_string(),
                            timeout_ms,
                        }),
                    }
                }
            })
            .await
    }
    .await;

    match outcome {
        Ok(response) => {
            let parsed = parse_result(&response.text, options.max_labels);
            let outcome = match parsed {
                ParsedResult::ContentFiltered => Outcome::ContentFiltered,
                _ => Outcome::Success,
            };
            tracing::debug!("{} -> {:?} ({}ms)", label, parsed, response.latency_ms);
            Classification {
                index: item.index,
                ground_truth: item.ground_truth,
                source: item.source,
                prediction: parsed.into_prediction(),
                outcome,
                usage: response.usage,
            }
        }
        Err(e) => {
            let outcome = Outcome::from_error(&e);
            let prediction = if outcome == Outcome::ContentFiltered {
                CONTENT_FILTERED.to_string()
            } else {
                format!("ERROR: {e}")
            };
            tracing::warn!("{}: {}", label, e);
            Classification {
                index: item.index,
                ground_truth: item.ground_truth,
                source: item.source,
                prediction,
                outcome,
                usage: TokenUsage::default(),
            }
        }
    }
}
