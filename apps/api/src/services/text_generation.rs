use crate::config::Config;
use crate::services::outcome::{ProviderError, ProviderResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Instruction used to turn a reading request into catalog search terms.
pub const KEYWORD_INSTRUCTION: &str = "Convert natural language book requests into optimal \
Google Books API search terms. Extract genres, themes, keywords, authors. Return only search keywords.";
pub const KEYWORD_MAX_TOKENS: u32 = 40;

/// Instruction used to summarise the themes of a reading request.
pub const THEME_INSTRUCTION: &str = "Extract the main themes or topics from the user prompt as a \
short comma-separated list. Do not include the prompt itself.";
pub const THEME_MAX_TOKENS: u32 = 32;

const TEMPERATURE: f32 = 0.2;

/// Free-text completion from a system instruction and one user message.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(
        &self,
        instruction: &str,
        message: &str,
        max_tokens: u32,
    ) -> ProviderResult<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text generation through the OpenAI chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(config: &Config) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            endpoint: format!(
                "{}/chat/completions",
                config.openai_base_url.trim_end_matches('/')
            ),
            model: config.chat_model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiChat {
    async fn complete(
        &self,
        instruction: &str,
        message: &str,
        max_tokens: u32,
    ) -> ProviderResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Configuration("Missing OpenAI API key".to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instruction,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
            max_tokens,
            temperature: TEMPERATURE,
        };

        debug!("Sending chat completion request to {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("OpenAI chat error: {} {}", status, error_text);
            return Err(ProviderError::ServiceUnavailable(format!(
                "OpenAI chat error: {}",
                status
            )));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                ProviderError::ServiceUnavailable("OpenAI returned an empty completion".to_string())
            })
    }
}
