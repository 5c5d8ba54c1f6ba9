//! User memories, session summaries and analyzer operations.

use mnemo_storage::time_utils;
use serde::{Deserialize, Serialize};

/// A durable fact about a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMemory {
    /// Assigned once at creation, never changed
    pub id: String,
    pub user_id: String,
    /// The fact itself
    pub memory: String,
    /// The message the fact was derived from, if any
    #[serde(default)]
    pub input: Option<String>,
    /// Unix timestamp in milliseconds
    pub created_at: i64,
    /// Unix timestamp in milliseconds
    pub updated_at: i64,
}

impl UserMemory {
    pub fn new(user_id: impl Into<String>, memory: impl Into<String>) -> Self {
        let now = time_utils::now_ms();
        Self {
            id: format!("mem-{}", uuid::Uuid::new_v4()),
            user_id: user_id.into(),
            memory: memory.into(),
            input: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a memory with a specific ID (for imports/testing)
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Replace the fact text and bump `updated_at`.
    pub fn set_memory(&mut self, memory: impl Into<String>) {
        self.memory = memory.into();
        self.updated_at = time_utils::now_ms().max(self.updated_at);
    }
}

/// Rolling digest of one session, at most one per `(session_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: String,
    pub summary: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SessionSummary {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        let now = time_utils::now_ms();
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            summary: summary.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// One mutation derived by the analyzer from a single message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AnalyzerOperation {
    Create { memory: String },
    Update { id: String, memory: String },
    Delete { id: String },
}

impl AnalyzerOperation {
    /// Operations with an empty id or empty memory text cannot be applied.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Create { memory } => !memory.trim().is_empty(),
            Self::Update { id, memory } => !id.trim().is_empty() && !memory.trim().is_empty(),
            Self::Delete { id } => !id.trim().is_empty(),
        }
    }
}
