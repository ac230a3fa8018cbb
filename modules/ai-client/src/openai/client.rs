use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use super::types::{ChatRequest, ChatResponse};
use crate::util::{join_url, truncate_to_char_boundary};

pub(crate) struct OpenAiClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, api_key: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            http,
            base_url: base_url.to_string(),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = join_url(&self.base_url, "chat/completions");

        debug!(model = %request.model, messages = request.messages.len(), "Chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!(
                "Chat API error ({}): {}",
                status,
                truncate_to_char_boundary(&error_text, 500)
            ));
        }

        let chat_response: ChatResponse = response.json().await?;
        if let Some(usage) = &chat_response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                finish_reason = chat_response
                    .choices
                    .first()
                    .and_then(|c| c.finish_reason.as_deref())
                    .unwrap_or("unknown"),
                "Chat response"
            );
        }
        Ok(chat_response)
    }
}
