//! Memory analyzer: turns a user message into memory operations.
//!
//! The language model receives the user's current memories (id + text) and
//! the new message, and answers with a JSON array of operations. Parsing is
//! lenient about Markdown fences and surrounding prose but strict about the
//! array itself.

use crate::error::{MemoryError, MemoryResult};
use crate::models::{AnalyzerOperation, UserMemory};
use async_trait::async_trait;
use mnemo_ai::{CompletionRequest, LlmClient, Message};
use std::sync::Arc;
use tracing::debug;

pub const MEMORY_ANALYSIS_PROMPT: &str = include_str!("templates/memory_analysis_prompt.md");

const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Derives memory operations from one message.
#[async_trait]
pub trait MemoryAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        message: &str,
        existing: &[UserMemory],
    ) -> MemoryResult<Vec<AnalyzerOperation>>;
}

/// [`MemoryAnalyzer`] backed by an [`LlmClient`].
pub struct LlmMemoryAnalyzer {
    llm: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl LlmMemoryAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(&self, message: &str, existing: &[UserMemory]) -> CompletionRequest {
        let memories = if existing.is_empty() {
            "(none)".to_string()
        } else {
            existing
                .iter()
                .map(|m| format!("- [{}] {}", m.id, m.memory))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let prompt = format!(
            "## Existing Memories\n\n{}\n\n## New Message\n\n{}",
            memories, message
        );

        CompletionRequest::new(vec![
            Message::system(MEMORY_ANALYSIS_PROMPT),
            Message::user(prompt),
        ])
        .with_temperature(0.0)
        .with_max_tokens(self.max_tokens)
    }
}

#[async_trait]
impl MemoryAnalyzer for LlmMemoryAnalyzer {
    async fn analyze(
        &self,
        message: &str,
        existing: &[UserMemory],
    ) -> MemoryResult<Vec<AnalyzerOperation>> {
        let request = self.build_request(message, existing);
        let response = self.llm.complete(request).await?;
        parse_operations(&response.text())
    }
}

/// Parse the model output into operations.
///
/// Empty output means no change. Elements that are not a known operation or
/// that carry empty fields are skipped.
pub fn parse_operations(output: &str) -> MemoryResult<Vec<AnalyzerOperation>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let values = extract_array(trimmed).ok_or_else(|| {
        MemoryError::Generation(format!(
            "analyzer output has no JSON array of operations: {}",
            preview(trimmed)
        ))
    })?;

    let mut operations = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<AnalyzerOperation>(value.clone()) {
            Ok(op) if op.is_valid() => operations.push(op),
            Ok(op) => debug!(?op, "Skipping analyzer operation with empty fields"),
            Err(e) => debug!(%value, error = %e, "Skipping unrecognized analyzer operation"),
        }
    }
    Ok(operations)
}

/// Prefer a fenced block; otherwise take the first `[` that opens an
/// operation array. Bracketed prose such as `[1]` holds no objects and is
/// skipped.
fn extract_array(output: &str) -> Option<Vec<serde_json::Value>> {
    let fenced = fenced_block(output)
        .and_then(|block| serde_json::from_str::<Vec<serde_json::Value>>(block.trim()).ok());
    if fenced.is_some() {
        return fenced;
    }

    output.match_indices('[').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&output[start..])
            .into_iter::<Vec<serde_json::Value>>()
            .next()
            .and_then(Result::ok)
            .filter(|values| values.is_empty() || values.iter().any(|v| v.is_object()))
    })
}

fn fenced_block(output: &str) -> Option<&str> {
    let start = output.find("```")? + 3;
    let body = &output[start..];
    let body = body
        .strip_prefix("json")
        .or_else(|| body.strip_prefix("JSON"))
        .unwrap_or(body);
    let end = body.find("```")?;
    Some(&body[..end])
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 200;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX_CHARS).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_ai::{MockLlmClient, MockStep, Role};

    #[test]
    fn test_parse_plain_array() {
        let ops = parse_operations(
            r#"[{"op":"create","memory":"likes tea"},{"op":"update","id":"m2","memory":"lives in Oslo"},{"op":"delete","id":"m1"}]"#,
        )
        .unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(
            ops[1],
            AnalyzerOperation::Update {
                id: "m2".to_string(),
                memory: "lives in Oslo".to_string()
            }
        );
    }

    #[test]
    fn test_parse_fenced_output_with_prose() {
        let output = "Here are the changes:\n```json\n[{\"op\": \"create\", \"memory\": \"has a dog\"}]\n```\nDone.";
        let ops = parse_operations(output).unwrap();
        assert_eq!(
            ops,
            vec![AnalyzerOperation::Create {
                memory: "has a dog".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_ignores_brackets_in_prose() {
        let output = "Based on the note [1] above, one change:\n[{\"op\":\"create\",\"memory\":\"likes tea\"}]\nSee [docs].";
        let ops = parse_operations(output).unwrap();
        assert_eq!(
            ops,
            vec![AnalyzerOperation::Create {
                memory: "likes tea".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_prefers_fenced_block() {
        let output = "Per [the rules], here you go:\n```json\n[{\"op\": \"delete\", \"id\": \"m4\"}]\n```\n[ignore me]";
        let ops = parse_operations(output).unwrap();
        assert_eq!(
            ops,
            vec![AnalyzerOperation::Delete {
                id: "m4".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_empty_and_noop() {
        assert!(parse_operations("").unwrap().is_empty());
        assert!(parse_operations("  []  ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_skips_invalid_elements() {
        let ops = parse_operations(
            r#"[{"op":"create","memory":""},{"op":"rename","id":"m1"},{"op":"delete","id":"m3"}]"#,
        )
        .unwrap();
        assert_eq!(
            ops,
            vec![AnalyzerOperation::Delete {
                id: "m3".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_garbage_is_generation_error() {
        let err = parse_operations("I could not decide.").unwrap_err();
        assert!(matches!(err, MemoryError::Generation(_)));

        let err = parse_operations("[not json]").unwrap_err();
        assert!(matches!(err, MemoryError::Generation(_)));
    }

    #[tokio::test]
    async fn test_prompt_lists_existing_memories() {
        let llm = Arc::new(MockLlmClient::from_steps(
            "mock",
            vec![MockStep::text(r#"[{"op":"delete","id":"m1"}]"#)],
        ));
        let analyzer = LlmMemoryAnalyzer::new(llm.clone());
        let existing = vec![UserMemory::new("alice", "likes coffee").with_id("m1")];

        let ops = analyzer
            .analyze("I stopped drinking coffee", &existing)
            .await
            .unwrap();
        assert_eq!(
            ops,
            vec![AnalyzerOperation::Delete {
                id: "m1".to_string()
            }]
        );

        let requests = llm.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].role, Role::System);
        let prompt = requests[0].messages[1].content.text();
        assert!(prompt.contains("- [m1] likes coffee"));
        assert!(prompt.contains("I stopped drinking coffee"));
    }

    #[tokio::test]
    async fn test_llm_error_maps_to_generation() {
        let llm = Arc::new(MockLlmClient::from_steps(
            "mock",
            vec![MockStep::error("service unavailable")],
        ));
        let analyzer = LlmMemoryAnalyzer::new(llm);

        let err = analyzer.analyze("hello", &[]).await.unwrap_err();
        assert!(matches!(err, MemoryError::Generation(_)));
    }
}
