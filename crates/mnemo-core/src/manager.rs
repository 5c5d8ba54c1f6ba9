//! Memory manager: the entry point of the adaptive memory pipeline.
//!
//! ```text
//! process_user_message ──► save ──► MemoryAnalysis ──┐
//!                                                    ├─► dispatcher (async) or inline (sync)
//! process_assistant_message ─► save ─► trigger? ─► SummaryUpdate ┘
//!                                                    │
//!                     analyzer / summarizer ◄────────┘
//!                              │
//!                  apply operations / upsert summary
//! ```
//!
//! Background work is best-effort: its failures are logged and never reach
//! the caller. Direct CRUD operations propagate storage errors.

use crate::analyzer::{LlmMemoryAnalyzer, MemoryAnalyzer};
use crate::config::{MemoryConfig, RetrievalMode};
use crate::error::{MemoryError, MemoryResult, require_non_empty};
use crate::models::{AnalyzerOperation, ConversationMessage, MemoryTask, SessionSummary, UserMemory};
use crate::performance::{AsyncDispatcher, DispatcherConfig, QueueStatsSnapshot, TaskExecutor};
use crate::storage::{MemoryBackend, MemoryOrder};
use crate::summarizer::{LlmSummaryGenerator, SummaryGenerator};
use crate::trigger::{PendingSummary, SummaryTrigger, session_key};
use async_trait::async_trait;
use mnemo_ai::LlmClient;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of applying analyzer operations to a user's memories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub created: u32,
    pub updated: u32,
    pub deleted: u32,
    /// Updates whose target memory does not exist
    pub skipped: u32,
    pub failed: u32,
}

fn memory_order(mode: RetrievalMode) -> MemoryOrder {
    match mode {
        RetrievalMode::LastN | RetrievalMode::Semantic => MemoryOrder::RecentlyUpdated,
        RetrievalMode::FirstN => MemoryOrder::EarliestCreated,
    }
}

/// State shared between the manager and the dispatcher workers.
struct Pipeline {
    config: RwLock<MemoryConfig>,
    storage: Arc<dyn MemoryBackend>,
    analyzer: Arc<dyn MemoryAnalyzer>,
    summarizer: Arc<dyn SummaryGenerator>,
    trigger: SummaryTrigger,
}

impl Pipeline {
    fn config(&self) -> MemoryConfig {
        self.config.read().clone()
    }

    async fn run_memory_analysis(&self, user_id: &str, message: &str) -> MemoryResult<()> {
        let config = self.config();
        let existing = self
            .storage
            .get_user_memories(
                user_id,
                Some(config.memory_limit),
                memory_order(config.retrieval),
            )
            .await?;

        let operations = self.analyzer.analyze(message, &existing).await?;
        if operations.is_empty() {
            debug!(user_id, "Analyzer produced no memory operations");
            return Ok(());
        }

        let report = self.apply_operations(user_id, message, operations).await;
        info!(
            user_id,
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            skipped = report.skipped,
            failed = report.failed,
            "Applied memory operations"
        );
        Ok(())
    }

    /// Apply operations one by one; deletes go out as a single bulk call.
    async fn apply_operations(
        &self,
        user_id: &str,
        input: &str,
        operations: Vec<AnalyzerOperation>,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();
        let mut delete_ids = Vec::new();

        for op in operations {
            match op {
                AnalyzerOperation::Create { memory } => {
                    let memory = UserMemory::new(user_id, memory).with_input(input);
                    match self.storage.add_user_memory(memory).await {
                        Ok(_) => report.created += 1,
                        Err(e) => {
                            warn!(user_id, error = %e, "Failed to create memory");
                            report.failed += 1;
                        }
                    }
                }
                AnalyzerOperation::Update { id, memory } => {
                    match self.update_existing(user_id, &id, memory).await {
                        Ok(true) => report.updated += 1,
                        Ok(false) => {
                            warn!(user_id, memory_id = %id, "Skipping update of unknown memory");
                            report.skipped += 1;
                        }
                        Err(e) => {
                            warn!(user_id, memory_id = %id, error = %e, "Failed to update memory");
                            report.failed += 1;
                        }
                    }
                }
                AnalyzerOperation::Delete { id } => delete_ids.push(id),
            }
        }

        if !delete_ids.is_empty() {
            match self.storage.delete_user_memories(user_id, &delete_ids).await {
                Ok(deleted) => report.deleted = deleted,
                Err(e) => {
                    warn!(user_id, count = delete_ids.len(), error = %e, "Failed to delete memories");
                    report.failed += delete_ids.len() as u32;
                }
            }
        }

        report
    }

    async fn update_existing(&self, user_id: &str, id: &str, text: String) -> MemoryResult<bool> {
        let Some(mut memory) = self.storage.get_user_memory(user_id, id).await? else {
            return Ok(false);
        };
        memory.set_memory(text);
        self.storage.update_user_memory(memory).await?;
        Ok(true)
    }

    async fn run_summary_update(
        &self,
        user_id: &str,
        session_id: &str,
        pending: PendingSummary<'_>,
    ) -> MemoryResult<()> {
        let existing = self.storage.get_session_summary(session_id, user_id).await?;
        let existing_text = existing
            .as_ref()
            .map(|s| s.summary.as_str())
            .filter(|s| !s.trim().is_empty());

        let window = self.summarizer.window(existing_text.is_some());
        let messages = self
            .storage
            .get_messages(user_id, session_id, Some(window))
            .await?;

        let generated = self.summarizer.generate(&messages, existing_text).await?;
        let generated = generated.trim();

        if generated.is_empty() || Some(generated) == existing_text.map(str::trim) {
            debug!(user_id, session_id, "Session summary unchanged");
        } else {
            self.storage
                .save_session_summary(SessionSummary::new(session_id, user_id, generated))
                .await?;
            info!(
                user_id,
                session_id,
                incremental = existing_text.is_some(),
                messages = messages.len(),
                "Session summary updated"
            );
        }

        pending.finish();
        Ok(())
    }
}

#[async_trait]
impl TaskExecutor for Pipeline {
    async fn execute(&self, task: &MemoryTask) -> MemoryResult<()> {
        match task {
            MemoryTask::MemoryAnalysis { user_id, message } => {
                self.run_memory_analysis(user_id, message).await
            }
            MemoryTask::SummaryUpdate {
                user_id,
                session_id,
            } => {
                let key = session_key(user_id, session_id);
                let pending = self.trigger.pending_summary(&key);
                self.run_summary_update(user_id, session_id, pending).await
            }
        }
    }
}

/// Orchestrates message persistence, memory analysis and session summaries.
///
/// Safe to share between tasks (`Arc<MemoryManager>`).
pub struct MemoryManager {
    pipeline: Arc<Pipeline>,
    dispatcher: Mutex<Option<AsyncDispatcher>>,
    /// Fixed at construction; `close` empties `dispatcher` but not this.
    asynchronous: bool,
    closed: AtomicBool,
}

impl MemoryManager {
    /// Create a manager whose analyzer and summarizer use `llm`.
    ///
    /// With `async_processing` enabled this starts the dispatcher workers and
    /// must be called inside a tokio runtime.
    pub fn new(
        config: MemoryConfig,
        storage: Arc<dyn MemoryBackend>,
        llm: Arc<dyn LlmClient>,
    ) -> MemoryResult<Self> {
        let analyzer = Arc::new(LlmMemoryAnalyzer::new(llm.clone()));
        let summarizer = Arc::new(LlmSummaryGenerator::new(llm));
        Self::with_components(config, storage, analyzer, summarizer)
    }

    pub fn with_components(
        config: MemoryConfig,
        storage: Arc<dyn MemoryBackend>,
        analyzer: Arc<dyn MemoryAnalyzer>,
        summarizer: Arc<dyn SummaryGenerator>,
    ) -> MemoryResult<Self> {
        let pipeline = Arc::new(Pipeline {
            trigger: SummaryTrigger::new(config.summary_trigger.clone()),
            config: RwLock::new(config.clone()),
            storage,
            analyzer,
            summarizer,
        });

        let dispatcher = if config.async_processing {
            if tokio::runtime::Handle::try_current().is_err() {
                return Err(MemoryError::validation(
                    "async processing requires a running tokio runtime",
                ));
            }
            Some(AsyncDispatcher::start(
                pipeline.clone(),
                DispatcherConfig {
                    pool_size: config.async_worker_pool_size,
                    task_timeout: config.task_timeout(),
                    ..DispatcherConfig::default()
                },
            ))
        } else {
            None
        };

        info!(
            async_processing = config.async_processing,
            workers = config.async_worker_pool_size,
            user_memories = config.enable_user_memories,
            session_summary = config.enable_session_summary,
            "Memory manager started"
        );

        Ok(Self {
            pipeline,
            dispatcher: Mutex::new(dispatcher),
            asynchronous: config.async_processing,
            closed: AtomicBool::new(false),
        })
    }

    // ============== Message Processing ==============

    /// Persist a user message and schedule memory analysis.
    ///
    /// Fails with [`MemoryError::Closed`] once `close` has started.
    pub async fn process_user_message(
        &self,
        user_id: &str,
        session_id: &str,
        text: &str,
    ) -> MemoryResult<()> {
        validate_message_args(user_id, session_id, text)?;
        self.ensure_open()?;

        let message = ConversationMessage::user(user_id, session_id, text);
        self.pipeline.storage.save_message(&message).await?;

        let analyze = self.pipeline.config.read().enable_user_memories;
        if analyze {
            self.dispatch(MemoryTask::MemoryAnalysis {
                user_id: user_id.to_string(),
                message: text.to_string(),
            })
            .await;
        }
        Ok(())
    }

    /// Persist an assistant message and regenerate the session summary when due.
    pub async fn process_assistant_message(
        &self,
        user_id: &str,
        session_id: &str,
        text: &str,
    ) -> MemoryResult<()> {
        validate_message_args(user_id, session_id, text)?;
        self.ensure_open()?;

        let message = ConversationMessage::assistant(user_id, session_id, text);
        self.pipeline.storage.save_message(&message).await?;

        let summarize = self.pipeline.config.read().enable_session_summary;
        if !summarize {
            return Ok(());
        }

        // Counted after persisting so the new message is included.
        let count = match self.pipeline.storage.count_messages(user_id, session_id).await {
            Ok(count) => count,
            Err(e) => {
                warn!(user_id, session_id, error = %e, "Failed to count messages for summary trigger");
                return Ok(());
            }
        };

        let key = session_key(user_id, session_id);
        if self.pipeline.trigger.should_trigger(&key, count) {
            let task = MemoryTask::SummaryUpdate {
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
            };
            if !self.dispatch(task).await {
                self.pipeline.trigger.clear_pending(&key);
            }
        }
        Ok(())
    }

    /// Hand a task to the dispatcher, or run it inline in synchronous mode.
    ///
    /// Returns `false` when the task was dropped.
    async fn dispatch(&self, task: MemoryTask) -> bool {
        if self.asynchronous {
            return match self.dispatcher.lock().as_ref() {
                Some(dispatcher) => dispatcher.submit(task),
                None => {
                    warn!(task = %task, "Memory manager closing, dropping task");
                    false
                }
            };
        }

        if let Err(e) = self.pipeline.execute(&task).await {
            warn!(task = %task, error = %e, "Memory task failed");
        }
        true
    }

    fn ensure_open(&self) -> MemoryResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MemoryError::Closed);
        }
        Ok(())
    }

    // ============== User Memories ==============

    /// Memories in the configured retrieval order; `limit` defaults to `memory_limit`.
    pub async fn get_user_memories(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> MemoryResult<Vec<UserMemory>> {
        require_non_empty("user_id", user_id)?;
        let (default_limit, retrieval) = {
            let config = self.pipeline.config.read();
            (config.memory_limit, config.retrieval)
        };
        self.pipeline
            .storage
            .get_user_memories(
                user_id,
                Some(limit.unwrap_or(default_limit)),
                memory_order(retrieval),
            )
            .await
    }

    pub async fn add_user_memory(
        &self,
        user_id: &str,
        memory: &str,
        input: Option<&str>,
    ) -> MemoryResult<UserMemory> {
        require_non_empty("user_id", user_id)?;
        require_non_empty("memory", memory)?;

        let mut new_memory = UserMemory::new(user_id, memory.trim());
        if let Some(input) = input {
            new_memory = new_memory.with_input(input);
        }
        self.pipeline.storage.add_user_memory(new_memory).await
    }

    pub async fn update_user_memory(
        &self,
        user_id: &str,
        memory_id: &str,
        memory: &str,
    ) -> MemoryResult<UserMemory> {
        require_non_empty("user_id", user_id)?;
        require_non_empty("memory_id", memory_id)?;
        require_non_empty("memory", memory)?;

        let mut existing = self
            .pipeline
            .storage
            .get_user_memory(user_id, memory_id)
            .await?
            .ok_or_else(|| {
                MemoryError::NotFound(format!("memory {memory_id} for user {user_id}"))
            })?;
        existing.set_memory(memory.trim());
        self.pipeline.storage.update_user_memory(existing).await
    }

    pub async fn delete_user_memory(&self, user_id: &str, memory_id: &str) -> MemoryResult<bool> {
        require_non_empty("user_id", user_id)?;
        require_non_empty("memory_id", memory_id)?;
        self.pipeline
            .storage
            .delete_user_memory(user_id, memory_id)
            .await
    }

    pub async fn clear_user_memories(&self, user_id: &str) -> MemoryResult<u32> {
        require_non_empty("user_id", user_id)?;
        let cleared = self.pipeline.storage.clear_user_memories(user_id).await?;
        info!(user_id, cleared, "User memories cleared");
        Ok(cleared)
    }

    pub async fn search_user_memories(
        &self,
        user_id: &str,
        query: &str,
        limit: Option<usize>,
    ) -> MemoryResult<Vec<UserMemory>> {
        require_non_empty("user_id", user_id)?;
        require_non_empty("query", query)?;
        self.pipeline
            .storage
            .search_user_memories(user_id, query, limit)
            .await
    }

    /// Apply analyzer operations directly, bypassing the analyzer.
    pub async fn apply_analyzer_operations(
        &self,
        user_id: &str,
        input: &str,
        operations: Vec<AnalyzerOperation>,
    ) -> MemoryResult<ApplyReport> {
        require_non_empty("user_id", user_id)?;
        let operations = operations.into_iter().filter(|op| op.is_valid()).collect();
        Ok(self
            .pipeline
            .apply_operations(user_id, input, operations)
            .await)
    }

    // ============== Summaries and Messages ==============

    pub async fn get_session_summary(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> MemoryResult<Option<SessionSummary>> {
        require_non_empty("user_id", user_id)?;
        require_non_empty("session_id", session_id)?;
        self.pipeline
            .storage
            .get_session_summary(session_id, user_id)
            .await
    }

    /// Store a message without triggering any background work.
    pub async fn save_message(&self, message: &ConversationMessage) -> MemoryResult<()> {
        validate_message_args(&message.user_id, &message.session_id, &message.content)?;
        self.pipeline.storage.save_message(message).await
    }

    pub async fn get_messages(
        &self,
        user_id: &str,
        session_id: &str,
        limit: Option<usize>,
    ) -> MemoryResult<Vec<ConversationMessage>> {
        require_non_empty("user_id", user_id)?;
        require_non_empty("session_id", session_id)?;
        self.pipeline
            .storage
            .get_messages(user_id, session_id, limit)
            .await
    }

    /// Administrative: remove a session's messages and its trigger state.
    pub async fn delete_session_messages(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> MemoryResult<u32> {
        require_non_empty("user_id", user_id)?;
        require_non_empty("session_id", session_id)?;
        let deleted = self
            .pipeline
            .storage
            .delete_session_messages(user_id, session_id)
            .await?;
        self.pipeline
            .trigger
            .mark_summary_updated(&session_key(user_id, session_id));
        Ok(deleted)
    }

    // ============== Configuration and Lifecycle ==============

    pub fn get_config(&self) -> MemoryConfig {
        self.pipeline.config()
    }

    /// Replace the configuration. Pool size changes apply to the next manager.
    pub fn update_config(&self, config: MemoryConfig) {
        self.pipeline.trigger.set_config(config.summary_trigger.clone());
        *self.pipeline.config.write() = config;
        debug!("Memory configuration updated");
    }

    /// Evict trigger state idle for longer than `max_age`.
    pub fn cleanup_trigger_states(&self, max_age: Duration) -> usize {
        let removed = self.pipeline.trigger.cleanup(max_age);
        if removed > 0 {
            debug!(removed, "Evicted stale summary trigger states");
        }
        removed
    }

    /// Dispatcher counters, `None` in synchronous mode or after close.
    pub fn dispatcher_stats(&self) -> Option<QueueStatsSnapshot> {
        self.dispatcher.lock().as_ref().map(AsyncDispatcher::stats)
    }

    pub async fn health(&self) -> MemoryResult<()> {
        self.ensure_open()?;
        self.pipeline.storage.health().await
    }

    /// Stop intake, drain background work, then close storage.
    pub async fn close(&self) -> MemoryResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            warn!("Memory manager already closed");
            return Ok(());
        }

        let dispatcher = self.dispatcher.lock().take();
        if let Some(dispatcher) = dispatcher {
            let stats = dispatcher.stop().await;
            info!(
                completed = stats.completed,
                failed = stats.failed,
                timed_out = stats.timed_out,
                dropped = stats.dropped,
                "Memory dispatcher drained"
            );
        }

        self.pipeline.storage.close().await?;
        info!("Memory manager closed");
        Ok(())
    }
}

fn validate_message_args(user_id: &str, session_id: &str, text: &str) -> MemoryResult<()> {
    require_non_empty("user_id", user_id)?;
    require_non_empty("session_id", session_id)?;
    require_non_empty("text", text)
}
