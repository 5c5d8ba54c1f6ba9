//! Provider-neutral request and response model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Non-text content travels as parts; only text parts reach [`MessageContent::text`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Text parts joined by newlines.
    pub fn text(&self) -> String {
        let parts = match self {
            MessageContent::Text(text) => return text.clone(),
            MessageContent::Parts(parts) => parts,
        };
        let texts: Vec<&str> = parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ImageUrl { .. } => None,
            })
            .collect();
        texts.join("\n")
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

/// One role-tagged entry of a conversation sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Error,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub finish_reason: FinishReason,
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Generated text, trimmed; empty when the model returned nothing.
    pub fn text(&self) -> String {
        self.content
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    }
}

/// "Messages in, text out" capability used by the memory pipeline.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_content_keeps_only_text() {
        let content = MessageContent::Parts(vec![
            ContentPart::Text {
                text: "look at this".to_string(),
            },
            ContentPart::ImageUrl {
                url: "https://example.com/cat.png".to_string(),
            },
            ContentPart::Text {
                text: "and this".to_string(),
            },
        ]);
        assert_eq!(content.text(), "look at this\nand this");
    }

    #[test]
    fn plain_content_serializes_as_string() {
        let message = Message::user("hello");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn response_text_is_trimmed() {
        let response = CompletionResponse {
            content: Some("  summary \n".to_string()),
            finish_reason: FinishReason::Stop,
            usage: None,
        };
        assert_eq!(response.text(), "summary");

        let empty = CompletionResponse {
            content: None,
            finish_reason: FinishReason::Stop,
            usage: None,
        };
        assert_eq!(empty.text(), "");
    }
}
