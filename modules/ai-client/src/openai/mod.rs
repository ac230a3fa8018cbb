mod client;
pub(crate) mod types;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::traits::{ChatModel, Message};
use client::OpenAiClient;
use types::ChatRequest;

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";

// =============================================================================
// OpenAi Agent
// =============================================================================

/// Chat model served over the OpenAI wire format. Point `base_url` at any
/// compatible provider.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_API_URL.to_string(),
            temperature: None,
            max_tokens: Some(4096),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn client(&self) -> OpenAiClient {
        OpenAiClient::new(self.http.clone(), &self.api_key, &self.base_url)
    }

    fn request(&self, messages: Vec<Message>) -> ChatRequest {
        ChatRequest::new(&self.model, messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
    }

    /// System prompt plus one user turn.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        self.chat(vec![Message::system(system), Message::user(user)])
            .await
    }
}

// =============================================================================
// ChatModel Implementation
// =============================================================================

#[async_trait]
impl ChatModel for OpenAi {
    async fn chat(&self, messages: Vec<Message>) -> Result<String> {
        let request = self.request(messages);
        self.client()
            .chat(&request)
            .await?
            .into_text()
            .ok_or_else(|| anyhow!("No response from {}", self.model))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
