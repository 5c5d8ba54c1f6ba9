//! Background work items for the dispatcher.

use std::fmt;

/// Fire-and-forget background task. Outcomes are logged, never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryTask {
    /// Derive memory operations from one user message.
    MemoryAnalysis { user_id: String, message: String },
    /// Regenerate the rolling summary of a session.
    SummaryUpdate { user_id: String, session_id: String },
}

impl MemoryTask {
    pub fn kind(&self) -> &'static str {
        match self {
            MemoryTask::MemoryAnalysis { .. } => "memory_analysis",
            MemoryTask::SummaryUpdate { .. } => "summary_update",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            MemoryTask::MemoryAnalysis { user_id, .. } => user_id,
            MemoryTask::SummaryUpdate { user_id, .. } => user_id,
        }
    }
}

impl fmt::Display for MemoryTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryTask::MemoryAnalysis { user_id, .. } => {
                write!(f, "{}({})", self.kind(), user_id)
            }
            MemoryTask::SummaryUpdate {
                user_id,
                session_id,
            } => write!(f, "{}({}:{})", self.kind(), user_id, session_id),
        }
    }
}
