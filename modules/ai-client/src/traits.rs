use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

// =============================================================================
// Message Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// =============================================================================
// ChatModel Trait
// =============================================================================

/// A model that answers a conversation with a single text reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, messages: Vec<Message>) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
