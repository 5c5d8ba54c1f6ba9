//! Mnemo Core - adaptive memory pipeline.
//!
//! Maintains long-lived memory for users of a conversational assistant:
//! durable facts extracted from user messages and a rolling summary per
//! session. [`MemoryManager`] is the entry point; analysis and summarization
//! run on a bounded background dispatcher unless synchronous processing is
//! configured.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod performance;
pub mod storage;
pub mod summarizer;
pub mod trigger;

pub use analyzer::{LlmMemoryAnalyzer, MemoryAnalyzer};
pub use config::{MemoryConfig, RetrievalMode, SummaryTriggerConfig, TriggerStrategy};
pub use error::{MemoryError, MemoryResult};
pub use manager::{ApplyReport, MemoryManager};
pub use models::{
    AnalyzerOperation, ConversationMessage, MemoryTask, MessageRole, SessionSummary, UserMemory,
};
pub use performance::QueueStatsSnapshot;
pub use storage::{MemoryBackend, MemoryOrder, RedbBackend};
pub use summarizer::{LlmSummaryGenerator, SummaryGenerator};
pub use trigger::{PendingSummary, SummaryTrigger, TriggerState, session_key};
