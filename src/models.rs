use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::LengthBounds;
use crate::settings::ClientSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub content_type_description: String,
    pub tone_description: String,
    pub length: LengthBounds,
}

/// Outcome of one generation call. Both arms carry displayable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    Success(String),
    Failure(String),
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success(_))
    }

    pub fn text(&self) -> &str {
        match self {
            GenerationResult::Success(t) | GenerationResult::Failure(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            GenerationResult::Success(t) | GenerationResult::Failure(t) => t,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Error occurred: request timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("API Error: {status} - {body}")]
    Provider { status: u16, body: String },
    #[error("Error occurred: {0}")]
    Transport(String),
}

impl From<GenerationError> for GenerationResult {
    fn from(e: GenerationError) -> Self {
        GenerationResult::Failure(e.to_string())
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Exactly one attempt; failures come back as `GenerationResult::Failure`.
    async fn generate(&self, req: &GenerationRequest) -> GenerationResult;
}

pub fn system_prompt(req: &GenerationRequest) -> String {
    format!(
        "You are a professional content writer.\n\
         Your task is to create {} type content.\n\
         Tone: {}\n\
         Length: Must be between {}-{} words.",
        req.content_type_description,
        req.tone_description,
        req.length.min_words(),
        req.length.max_words(),
    )
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice { message: ChatChoiceMessage }

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage { content: Option<String> }

/// OpenAI-compatible chat-completion client (Groq by default).
#[derive(Clone)]
pub struct ChatCompletionClient {
    settings: ClientSettings,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl ChatCompletionClient {
    pub fn new(settings: ClientSettings, api_key: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to create HTTP client: {}", e))?;
        info!(endpoint = %settings.endpoint, model = %settings.model, "generation client initialized");
        Ok(Self { settings, api_key, http })
    }

    fn classify(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout { secs: self.settings.timeout_secs }
        } else {
            GenerationError::Transport(e.to_string())
        }
    }

    async fn try_generate(&self, req: &GenerationRequest) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt(req) },
                ChatMessage { role: "user", content: req.topic.clone() },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        // sent even when empty so a missing key surfaces as the provider's 401
        let key = self.api_key.as_deref().unwrap_or_default();
        let resp = self
            .http
            .post(&self.settings.endpoint)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.classify(e))?;
        if status != StatusCode::OK {
            return Err(GenerationError::Provider { status: status.as_u16(), body: text });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::Transport(format!("malformed response body: {}", e)))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::Transport("response contained no completion".into()))
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionClient {
    async fn generate(&self, req: &GenerationRequest) -> GenerationResult {
        debug!(topic_len = req.topic.len(), bounds = %req.length, "sending chat completion request");
        match self.try_generate(req).await {
            Ok(text) => {
                debug!(chars = text.len(), "chat completion succeeded");
                GenerationResult::Success(text)
            }
            Err(e) => {
                warn!(error = %e, "chat completion failed");
                e.into()
            }
        }
    }
}
