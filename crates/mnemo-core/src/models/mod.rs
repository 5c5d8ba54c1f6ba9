//! Data models for the memory pipeline.

pub mod memory;
pub mod message;
pub mod task;

pub use memory::{AnalyzerOperation, SessionSummary, UserMemory};
pub use message::{ConversationMessage, MessageRole};
pub use task::MemoryTask;
