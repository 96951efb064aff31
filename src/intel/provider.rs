//! The model seam: one vision-capable completion call.
//!
//! The pipeline must not hardcode the oracle's protocol, model name, or
//! prompt transport — it depends on the [`ChatModel`] trait and nothing
//! else. [`EdgequakeModel`] is the production implementation, adapting the
//! `edgequake-llm` provider family (OpenAI, Anthropic, Gemini, Ollama, …);
//! the test suite injects scripted fakes through the same trait.

use std::sync::Arc;

use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};

use crate::error::{ModelCallError, PipelineError};
use crate::model::PageImage;

/// One oracle request: an optional system instruction, the prompt, and the
/// page images carrying the primary evidence when present.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub images: Vec<PageImage>,
    pub max_tokens: usize,
}

/// The oracle's reply plus token accounting for the audit trail.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// A vision-capable completion backend.
///
/// Implementations must be stateless apart from connection handles so one
/// instance can be shared across concurrent pipeline runs.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply, ModelCallError>;
}

/// Production [`ChatModel`] backed by an `edgequake-llm` provider.
pub struct EdgequakeModel {
    provider: Arc<dyn LLMProvider>,
}

impl EdgequakeModel {
    /// Wrap a pre-constructed provider. Useful when the host needs custom
    /// middleware (caching, rate limiting) around the raw provider.
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Create a named provider with an explicit model, reading the matching
    /// API key from the environment.
    pub fn named(provider_name: &str, model: &str) -> Result<Self, PipelineError> {
        let provider =
            ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
                PipelineError::Internal(format!(
                    "LLM provider '{provider_name}' is not configured: {e}"
                ))
            })?;
        Ok(Self { provider })
    }

    /// Auto-detect a provider from the environment (`OPENAI_API_KEY`,
    /// `ANTHROPIC_API_KEY`, …).
    pub fn from_env() -> Result<Self, PipelineError> {
        let (provider, _embedding) = ProviderFactory::from_env().map_err(|e| {
            PipelineError::Internal(format!(
                "no LLM provider could be auto-detected from environment: {e}"
            ))
        })?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl ChatModel for EdgequakeModel {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelReply, ModelCallError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage::system(system.as_str()));
        }

        if request.images.is_empty() {
            messages.push(ChatMessage::user(request.prompt.as_str()));
        } else {
            // Vision-first: the images are the primary evidence, attached to
            // the same user turn as the prompt text.
            let images: Vec<ImageData> = request
                .images
                .iter()
                .map(|page| {
                    ImageData::new(page.data.clone(), page.mime_type.as_str())
                        .with_detail("high")
                })
                .collect();
            messages.push(ChatMessage::user_with_images(request.prompt.as_str(), images));
        }

        let options = CompletionOptions {
            // Deterministic transcription, not creativity.
            temperature: Some(0.0),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelCallError::Transport(e.to_string()))?;

        Ok(ModelReply {
            text: response.content,
            input_tokens: response.prompt_tokens as usize,
            output_tokens: response.completion_tokens as usize,
        })
    }
}
