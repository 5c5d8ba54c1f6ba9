//! Append-only conversation messages.

use mnemo_storage::time_utils;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single persisted conversation turn. Never mutated once saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Unix timestamp in milliseconds
    pub created_at: i64,
}

impl ConversationMessage {
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("msg-{}", uuid::Uuid::new_v4()),
            session_id: session_id.into(),
            user_id: user_id.into(),
            role,
            content: content.into(),
            created_at: time_utils::now_ms(),
        }
    }

    pub fn user(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(user_id, session_id, MessageRole::User, content)
    }

    pub fn assistant(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(user_id, session_id, MessageRole::Assistant, content)
    }
}

impl From<&ConversationMessage> for mnemo_ai::Message {
    fn from(message: &ConversationMessage) -> Self {
        let role = match message.role {
            MessageRole::User => mnemo_ai::Role::User,
            MessageRole::Assistant => mnemo_ai::Role::Assistant,
            MessageRole::System => mnemo_ai::Role::System,
        };
        mnemo_ai::Message::new(role, message.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let message = ConversationMessage::assistant("alice", "s1", "hello");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(message.id.starts_with("msg-"));
    }

    #[test]
    fn test_into_llm_message() {
        let message = ConversationMessage::user("alice", "s1", "hi");
        let llm: mnemo_ai::Message = (&message).into();
        assert_eq!(llm.role, mnemo_ai::Role::User);
        assert_eq!(llm.content.text(), "hi");
    }
}
