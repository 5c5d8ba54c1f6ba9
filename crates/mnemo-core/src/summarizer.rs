//! Session summary generation.

use crate::error::MemoryResult;
use crate::models::ConversationMessage;
use async_trait::async_trait;
use mnemo_ai::{CompletionRequest, LlmClient, Message};
use std::sync::Arc;
use tracing::debug;

pub const SUMMARY_PROMPT: &str = include_str!("templates/summary_prompt.md");
pub const INCREMENTAL_SUMMARY_PROMPT: &str =
    include_str!("templates/incremental_summary_prompt.md");

/// Messages considered when no summary exists yet.
pub const FULL_WINDOW: usize = 20;
/// Messages considered when updating an existing summary.
pub const INCREMENTAL_WINDOW: usize = 10;

/// Produces a session summary from recent messages.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    /// How many recent messages the generator wants for the given mode.
    fn window(&self, has_existing: bool) -> usize {
        if has_existing {
            INCREMENTAL_WINDOW
        } else {
            FULL_WINDOW
        }
    }

    /// Return the new summary. Never returns an empty string in place of a
    /// non-empty `existing` summary.
    async fn generate(
        &self,
        messages: &[ConversationMessage],
        existing: Option<&str>,
    ) -> MemoryResult<String>;
}

/// [`SummaryGenerator`] backed by an [`LlmClient`].
pub struct LlmSummaryGenerator {
    llm: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl LlmSummaryGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            max_tokens: 800,
        }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

fn format_conversation(messages: &[ConversationMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep at most the last `window` messages.
fn recent(messages: &[ConversationMessage], window: usize) -> &[ConversationMessage] {
    &messages[messages.len().saturating_sub(window)..]
}

#[async_trait]
impl SummaryGenerator for LlmSummaryGenerator {
    async fn generate(
        &self,
        messages: &[ConversationMessage],
        existing: Option<&str>,
    ) -> MemoryResult<String> {
        let existing = existing.map(str::trim).filter(|s| !s.is_empty());
        if messages.is_empty() {
            return Ok(existing.unwrap_or_default().to_string());
        }

        let request = match existing {
            Some(summary) => {
                let conversation = format_conversation(recent(messages, INCREMENTAL_WINDOW));
                let prompt = format!(
                    "## Current Summary\n\n{}\n\n## Recent Messages\n\n{}",
                    summary, conversation
                );
                CompletionRequest::new(vec![
                    Message::system(INCREMENTAL_SUMMARY_PROMPT),
                    Message::user(prompt),
                ])
            }
            None => {
                let conversation = format_conversation(recent(messages, FULL_WINDOW));
                let prompt = format!("## Conversation\n\n{}", conversation);
                CompletionRequest::new(vec![Message::system(SUMMARY_PROMPT), Message::user(prompt)])
            }
        }
        .with_max_tokens(self.max_tokens);

        let generated = self.llm.complete(request).await?.text();
        if generated.is_empty() {
            debug!(incremental = existing.is_some(), "Summary generator returned empty output");
            return Ok(existing.unwrap_or_default().to_string());
        }
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_ai::{MockLlmClient, MockStep};

    fn conversation(count: usize) -> Vec<ConversationMessage> {
        (0..count)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationMessage::user("alice", "s1", format!("question {i}"))
                } else {
                    ConversationMessage::assistant("alice", "s1", format!("answer {i}"))
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_empty_messages_keep_existing() {
        let llm = Arc::new(MockLlmClient::new("mock"));
        let generator = LlmSummaryGenerator::new(llm.clone());

        assert_eq!(generator.generate(&[], Some("old summary")).await.unwrap(), "old summary");
        assert_eq!(generator.generate(&[], Some("")).await.unwrap(), "");
        assert_eq!(generator.generate(&[], None).await.unwrap(), "");
        assert_eq!(llm.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_full_generation_uses_last_twenty() {
        let llm = Arc::new(MockLlmClient::from_steps(
            "mock",
            vec![MockStep::text("  Alice asked many questions.  ")],
        ));
        let generator = LlmSummaryGenerator::new(llm.clone());

        let summary = generator.generate(&conversation(25), None).await.unwrap();
        assert_eq!(summary, "Alice asked many questions.");

        let requests = llm.requests().await;
        assert_eq!(requests[0].messages[0].content.text(), SUMMARY_PROMPT);
        let prompt = requests[0].messages[1].content.text();
        assert!(!prompt.contains("question 4\n"));
        assert!(prompt.contains("user: question 6"));
        assert!(prompt.contains("assistant: answer 23"));
    }

    #[tokio::test]
    async fn test_incremental_generation_uses_last_ten() {
        let llm = Arc::new(MockLlmClient::from_steps(
            "mock",
            vec![MockStep::text("Updated summary.")],
        ));
        let generator = LlmSummaryGenerator::new(llm.clone());

        let summary = generator
            .generate(&conversation(25), Some("Earlier summary."))
            .await
            .unwrap();
        assert_eq!(summary, "Updated summary.");

        let requests = llm.requests().await;
        assert_eq!(
            requests[0].messages[0].content.text(),
            INCREMENTAL_SUMMARY_PROMPT
        );
        let prompt = requests[0].messages[1].content.text();
        assert!(prompt.contains("Earlier summary."));
        assert!(prompt.contains("user: question 16"));
        assert!(!prompt.contains("answer 13"));
    }

    #[tokio::test]
    async fn test_blank_existing_degrades_to_full() {
        let llm = Arc::new(MockLlmClient::from_steps("mock", vec![MockStep::text("Fresh.")]));
        let generator = LlmSummaryGenerator::new(llm.clone());

        generator.generate(&conversation(3), Some("  ")).await.unwrap();
        let requests = llm.requests().await;
        assert_eq!(requests[0].messages[0].content.text(), SUMMARY_PROMPT);
    }

    #[tokio::test]
    async fn test_empty_output_keeps_existing() {
        let llm = Arc::new(MockLlmClient::from_steps("mock", vec![MockStep::text("   ")]));
        let generator = LlmSummaryGenerator::new(llm);

        let summary = generator
            .generate(&conversation(4), Some("Keep me."))
            .await
            .unwrap();
        assert_eq!(summary, "Keep me.");
    }

    #[test]
    fn test_window_sizes() {
        let generator = LlmSummaryGenerator::new(Arc::new(MockLlmClient::new("mock")));
        assert_eq!(generator.window(false), 20);
        assert_eq!(generator.window(true), 10);
    }
}
