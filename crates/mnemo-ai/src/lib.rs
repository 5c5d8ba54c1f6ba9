//! Mnemo AI - text-generation client abstraction.
//!
//! The memory pipeline treats the language model as an opaque
//! "messages in, text out" capability. This crate provides:
//! - [`LlmClient`] trait and the role-tagged [`Message`] model
//! - [`OpenAIClient`] for OpenAI-compatible chat completion endpoints
//! - [`MockLlmClient`] for deterministic tests

pub mod error;
pub mod llm;

mod http_client;

pub use error::{AiError, Result};
pub use llm::{
    CompletionRequest, CompletionResponse, ContentPart, FinishReason, LlmClient, LlmRetryConfig,
    Message, MessageContent, MockLlmClient, MockStep, OpenAIClient, Role, TokenUsage,
};
