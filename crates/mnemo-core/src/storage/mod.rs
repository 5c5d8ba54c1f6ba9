//! Storage layer with typed wrappers around mnemo-storage.
//!
//! The pipeline depends only on the [`MemoryBackend`] capability trait.
//! [`RedbBackend`] is the embedded implementation built from the typed
//! wrappers in this module.

pub mod memory;
pub mod message;
mod redb_backend;
pub mod summary;

use crate::error::MemoryResult;
use crate::models::{ConversationMessage, SessionSummary, UserMemory};
use async_trait::async_trait;

pub use memory::{MemoryOrder, UserMemoryStorage};
pub use message::MessageStorage;
pub use redb_backend::RedbBackend;
pub use summary::SessionSummaryStorage;

/// Persistence capability consumed by the memory pipeline.
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    // ============== User Memories ==============

    async fn add_user_memory(&self, memory: UserMemory) -> MemoryResult<UserMemory>;

    async fn get_user_memory(
        &self,
        user_id: &str,
        memory_id: &str,
    ) -> MemoryResult<Option<UserMemory>>;

    async fn get_user_memories(
        &self,
        user_id: &str,
        limit: Option<usize>,
        order: MemoryOrder,
    ) -> MemoryResult<Vec<UserMemory>>;

    /// Replace an existing memory. Fails with `NotFound` if the user does not own it.
    async fn update_user_memory(&self, memory: UserMemory) -> MemoryResult<UserMemory>;

    async fn delete_user_memory(&self, user_id: &str, memory_id: &str) -> MemoryResult<bool>;

    /// Bulk delete. IDs not owned by the user are ignored.
    async fn delete_user_memories(&self, user_id: &str, memory_ids: &[String])
    -> MemoryResult<u32>;

    async fn clear_user_memories(&self, user_id: &str) -> MemoryResult<u32>;

    async fn search_user_memories(
        &self,
        user_id: &str,
        query: &str,
        limit: Option<usize>,
    ) -> MemoryResult<Vec<UserMemory>>;

    // ============== Session Summaries ==============

    /// A miss is `Ok(None)`, never an error.
    async fn get_session_summary(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> MemoryResult<Option<SessionSummary>>;

    /// Create or replace the summary for `(session_id, user_id)`.
    async fn save_session_summary(&self, summary: SessionSummary) -> MemoryResult<SessionSummary>;

    // ============== Conversation Messages ==============

    async fn save_message(&self, message: &ConversationMessage) -> MemoryResult<()>;

    /// Oldest first; with `limit`, the most recent `limit` messages.
    async fn get_messages(
        &self,
        user_id: &str,
        session_id: &str,
        limit: Option<usize>,
    ) -> MemoryResult<Vec<ConversationMessage>>;

    async fn count_messages(&self, user_id: &str, session_id: &str) -> MemoryResult<u64>;

    /// Administrative removal of a session's message log.
    async fn delete_session_messages(&self, user_id: &str, session_id: &str)
    -> MemoryResult<u32>;

    // ============== Lifecycle ==============

    async fn health(&self) -> MemoryResult<()>;

    async fn close(&self) -> MemoryResult<()>;
}
