//! Language model access and the response gateway
//!
//! Provides:
//! - A `LanguageModel` trait with a Gemini `generateContent` client
//! - An explicit handle that is either ready or unavailable with a reason
//! - A gateway that turns every model failure into the fixed fallback text

use crate::config::LanguageModelConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Returned whenever the model cannot produce an answer
pub const FALLBACK_RESPONSE: &str =
    "I'm sorry, I'm having trouble processing your request right now. Please try again later.";

const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Trait for text generation
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Fixed sampling parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(AppError::ExternalService {
                message: format!("Prompt blocked: {}", reason),
            });
        }

        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            AppError::ExternalService {
                message: "Response contained no candidates".to_string(),
            }
        })?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::ExternalService {
                message: format!(
                    "Response contained no text (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
            });
        }

        Ok(text)
    }
}

/// Gemini REST client
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    generation: GenerationConfig,
}

impl GeminiClient {
    /// Create a new client; fails only if the HTTP client cannot be built
    pub fn new(config: &LanguageModelConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            generation: GenerationConfig::default(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: self.generation,
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ExternalService {
                message: format!("Language model request failed: {}", e.without_url()),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService {
                message: format!("Language model API error {}: {}", status, body),
            });
        }

        let parsed: GenerateResponse =
            response.json().await.map_err(|e| AppError::ExternalService {
                message: format!("Failed to parse language model response: {}", e),
            })?;

        parsed.into_text()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// The language model capability, decided once at startup
#[derive(Clone)]
pub enum ModelHandle {
    Ready(Arc<dyn LanguageModel>),
    Unavailable { reason: String },
}

impl ModelHandle {
    /// Build a Gemini handle, or an unavailable one when no key is configured
    pub fn from_config(config: &LanguageModelConfig) -> Self {
        let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
            warn!("No language model API key configured, chat answers will use the fallback");
            return ModelHandle::Unavailable {
                reason: "no API key configured".to_string(),
            };
        };

        match GeminiClient::new(config, api_key) {
            Ok(client) => {
                info!(model = %config.model, "Language model client ready");
                ModelHandle::Ready(Arc::new(client))
            }
            Err(e) => {
                error!(error = %e, "Failed to build language model client");
                ModelHandle::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelHandle::Ready(_))
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelHandle::Ready(model) => f.debug_tuple("Ready").field(&model.model_name()).finish(),
            ModelHandle::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Sends prompts to the model; never fails
#[derive(Clone, Debug)]
pub struct ResponseGateway {
    handle: ModelHandle,
}

impl ResponseGateway {
    pub fn new(handle: ModelHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    /// One attempt, no retries. Every failure yields `FALLBACK_RESPONSE`.
    pub async fn dispatch(&self, prompt: &str) -> String {
        let model = match &self.handle {
            ModelHandle::Ready(model) => model,
            ModelHandle::Unavailable { reason } => {
                debug!(reason = %reason, "Language model unavailable");
                crate::metrics::record_fallback("unavailable");
                return FALLBACK_RESPONSE.to_string();
            }
        };

        let start = Instant::now();
        let result = model.generate(prompt).await;
        let elapsed = start.elapsed().as_secs_f64();
        crate::metrics::record_model_call(elapsed, model.model_name(), result.is_ok());

        match result {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, model = model.model_name(), "Language model call failed");
                crate::metrics::record_fallback("error");
                FALLBACK_RESPONSE.to_string()
            }
        }
    }
}
