use super::{
    MemoryBackend, MemoryOrder, MessageStorage, SessionSummaryStorage, UserMemoryStorage,
};
use crate::error::{MemoryError, MemoryResult, require_non_empty};
use crate::models::{ConversationMessage, SessionSummary, UserMemory};
use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// [`MemoryBackend`] backed by the embedded redb database.
pub struct RedbBackend {
    storage: mnemo_storage::Storage,
    memories: UserMemoryStorage,
    summaries: SessionSummaryStorage,
    messages: MessageStorage,
    closed: AtomicBool,
}

impl RedbBackend {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> MemoryResult<Self> {
        let path = path.as_ref();
        let storage = mnemo_storage::Storage::new(path)
            .with_context(|| format!("Failed to open memory database at {}", path.display()))?;
        info!(path = %path.display(), "Memory backend opened");
        Ok(Self::from_storage(storage))
    }

    pub fn from_storage(storage: mnemo_storage::Storage) -> Self {
        Self {
            memories: storage.memories.clone().into(),
            summaries: storage.summaries.clone().into(),
            messages: storage.messages.clone().into(),
            storage,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> MemoryResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MemoryError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryBackend for RedbBackend {
    async fn add_user_memory(&self, memory: UserMemory) -> MemoryResult<UserMemory> {
        self.ensure_open()?;
        require_non_empty("user_id", &memory.user_id)?;
        require_non_empty("memory", &memory.memory)?;

        self.memories
            .put(&memory)
            .context("Failed to add user memory")?;
        debug!(user_id = %memory.user_id, memory_id = %memory.id, "User memory added");
        Ok(memory)
    }

    async fn get_user_memory(
        &self,
        user_id: &str,
        memory_id: &str,
    ) -> MemoryResult<Option<UserMemory>> {
        self.ensure_open()?;
        Ok(self
            .memories
            .get(user_id, memory_id)
            .context("Failed to load user memory")?)
    }

    async fn get_user_memories(
        &self,
        user_id: &str,
        limit: Option<usize>,
        order: MemoryOrder,
    ) -> MemoryResult<Vec<UserMemory>> {
        self.ensure_open()?;
        Ok(self
            .memories
            .list(user_id, limit, order)
            .context("Failed to list user memories")?)
    }

    async fn update_user_memory(&self, memory: UserMemory) -> MemoryResult<UserMemory> {
        self.ensure_open()?;
        require_non_empty("memory", &memory.memory)?;

        let exists = self
            .memories
            .exists(&memory.user_id, &memory.id)
            .context("Failed to check user memory")?;
        if !exists {
            return Err(MemoryError::NotFound(format!(
                "memory {} for user {}",
                memory.id, memory.user_id
            )));
        }

        self.memories
            .put(&memory)
            .context("Failed to update user memory")?;
        debug!(user_id = %memory.user_id, memory_id = %memory.id, "User memory updated");
        Ok(memory)
    }

    async fn delete_user_memory(&self, user_id: &str, memory_id: &str) -> MemoryResult<bool> {
        self.ensure_open()?;
        Ok(self
            .memories
            .delete(user_id, memory_id)
            .context("Failed to delete user memory")?)
    }

    async fn delete_user_memories(
        &self,
        user_id: &str,
        memory_ids: &[String],
    ) -> MemoryResult<u32> {
        self.ensure_open()?;
        Ok(self
            .memories
            .delete_many(user_id, memory_ids)
            .context("Failed to delete user memories")?)
    }

    async fn clear_user_memories(&self, user_id: &str) -> MemoryResult<u32> {
        self.ensure_open()?;
        Ok(self
            .memories
            .clear(user_id)
            .context("Failed to clear user memories")?)
    }

    async fn search_user_memories(
        &self,
        user_id: &str,
        query: &str,
        limit: Option<usize>,
    ) -> MemoryResult<Vec<UserMemory>> {
        self.ensure_open()?;
        Ok(self
            .memories
            .search(user_id, query, limit)
            .context("Failed to search user memories")?)
    }

    async fn get_session_summary(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> MemoryResult<Option<SessionSummary>> {
        self.ensure_open()?;
        Ok(self
            .summaries
            .get(session_id, user_id)
            .context("Failed to load session summary")?)
    }

    async fn save_session_summary(&self, summary: SessionSummary) -> MemoryResult<SessionSummary> {
        self.ensure_open()?;
        Ok(self
            .summaries
            .save(&summary)
            .context("Failed to save session summary")?)
    }

    async fn save_message(&self, message: &ConversationMessage) -> MemoryResult<()> {
        self.ensure_open()?;
        Ok(self
            .messages
            .append(message)
            .context("Failed to save message")?)
    }

    async fn get_messages(
        &self,
        user_id: &str,
        session_id: &str,
        limit: Option<usize>,
    ) -> MemoryResult<Vec<ConversationMessage>> {
        self.ensure_open()?;
        Ok(self
            .messages
            .list(user_id, session_id, limit)
            .context("Failed to load messages")?)
    }

    async fn count_messages(&self, user_id: &str, session_id: &str) -> MemoryResult<u64> {
        self.ensure_open()?;
        Ok(self
            .messages
            .count(user_id, session_id)
            .context("Failed to count messages")?)
    }

    async fn delete_session_messages(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> MemoryResult<u32> {
        self.ensure_open()?;
        let deleted = self
            .messages
            .delete_session(user_id, session_id)
            .context("Failed to delete session messages")?;
        info!(user_id, session_id, deleted, "Session messages deleted");
        Ok(deleted)
    }

    async fn health(&self) -> MemoryResult<()> {
        self.ensure_open()?;
        Ok(self
            .storage
            .health_check()
            .context("Memory database health check failed")?)
    }

    async fn close(&self) -> MemoryResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("Memory backend already closed");
        } else {
            info!("Memory backend closed");
        }
        Ok(())
    }
}
