//! Scripted client for tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{AiError, Result};

use super::{CompletionRequest, CompletionResponse, FinishReason, LlmClient, TokenUsage};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Error(String),
    Panic(String),
}

/// One scripted answer, optionally delayed.
#[derive(Debug, Clone)]
pub struct MockStep {
    reply: Reply,
    delay: Duration,
}

impl MockStep {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(Reply::Text(content.into()))
    }

    /// Fail the call with [`AiError::Llm`].
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Reply::Error(message.into()))
    }

    /// Panic inside `complete`.
    pub fn panic(message: impl Into<String>) -> Self {
        Self::new(Reply::Panic(message.into()))
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay = Duration::from_millis(delay_ms);
        self
    }
}

#[derive(Default)]
struct MockState {
    script: VecDeque<MockStep>,
    requests: Vec<CompletionRequest>,
}

/// [`LlmClient`] that answers from a script and records every request.
///
/// Once the script runs out every call returns empty content.
pub struct MockLlmClient {
    model: String,
    state: Mutex<MockState>,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self::from_steps(model, Vec::new())
    }

    pub fn from_steps(model: impl Into<String>, steps: Vec<MockStep>) -> Self {
        Self {
            model: model.into(),
            state: Mutex::new(MockState {
                script: steps.into(),
                requests: Vec::new(),
            }),
        }
    }

    /// Requests received so far, in call order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.state.lock().await.requests.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.state.lock().await.requests.len()
    }
}

fn response(content: Option<String>) -> CompletionResponse {
    let completion_tokens = content.as_ref().map_or(0, |c| c.len() as u32);
    CompletionResponse {
        content,
        finish_reason: FinishReason::Stop,
        usage: Some(TokenUsage {
            prompt_tokens: 1,
            completion_tokens,
            total_tokens: 1 + completion_tokens,
        }),
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let step = {
            let mut state = self.state.lock().await;
            state.requests.push(request);
            state.script.pop_front()
        };
        let Some(step) = step else {
            return Ok(response(None));
        };

        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        match step.reply {
            Reply::Text(content) => Ok(response(Some(content))),
            Reply::Error(message) => Err(AiError::Llm(message)),
            Reply::Panic(message) => panic!("{message}"),
        }
    }
}
