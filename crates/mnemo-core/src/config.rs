//! Memory pipeline configuration.
//!
//! All fields have serde defaults so a partial TOML table (or none at all)
//! yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How memories are selected when loaded for context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetrievalMode {
    /// Most recently updated first
    #[default]
    LastN,
    /// Earliest created first
    FirstN,
    /// Vector similarity. Not supported; treated as `LastN`.
    Semantic,
}

/// Strategy used to decide when a session summary is regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerStrategy {
    Always,
    #[serde(alias = "ByMessages")]
    ByMessageCount,
    ByTimeInterval,
    #[default]
    Smart,
}

/// Summary trigger thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryTriggerConfig {
    pub strategy: TriggerStrategy,
    /// Messages since the last summary needed by the count condition
    pub message_threshold: u64,
    /// Seconds since the last summary needed by the time condition
    pub min_interval_secs: u64,
    /// `Smart`: burst override fires at `burst_multiplier * message_threshold` messages
    pub burst_multiplier: u64,
    /// `Smart`: minimum seconds since the last summary for the burst override
    pub burst_min_interval_secs: u64,
    /// `Smart`: idle override fires after this many seconds
    pub idle_interval_secs: u64,
    /// `Smart`: minimum new messages for the idle override
    pub idle_min_messages: u64,
}

impl Default for SummaryTriggerConfig {
    fn default() -> Self {
        Self {
            strategy: TriggerStrategy::Smart,
            message_threshold: 10,
            min_interval_secs: 600,
            burst_multiplier: 2,
            burst_min_interval_secs: 30,
            idle_interval_secs: 3600,
            idle_min_messages: 2,
        }
    }
}

impl SummaryTriggerConfig {
    pub fn new(strategy: TriggerStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_message_threshold(mut self, threshold: u64) -> Self {
        self.message_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval_secs = interval.as_secs();
        self
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub fn burst_min_interval(&self) -> Duration {
        Duration::from_secs(self.burst_min_interval_secs)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_secs)
    }

    pub fn burst_threshold(&self) -> u64 {
        self.message_threshold.saturating_mul(self.burst_multiplier)
    }
}

/// Memory manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Extract durable facts from user messages
    pub enable_user_memories: bool,
    /// Maintain a rolling summary per session
    pub enable_session_summary: bool,
    pub retrieval: RetrievalMode,
    /// Maximum memories handed to the analyzer and returned by default
    pub memory_limit: usize,
    /// Run analysis and summaries on the background dispatcher
    pub async_processing: bool,
    pub async_worker_pool_size: usize,
    /// Per-task timeout for background work
    pub task_timeout_secs: u64,
    pub summary_trigger: SummaryTriggerConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enable_user_memories: true,
            enable_session_summary: true,
            retrieval: RetrievalMode::LastN,
            memory_limit: 30,
            async_processing: true,
            async_worker_pool_size: 5,
            task_timeout_secs: 30,
            summary_trigger: SummaryTriggerConfig::default(),
        }
    }
}

impl MemoryConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    /// Run background work inline instead of on the dispatcher.
    #[must_use]
    pub fn synchronous(mut self) -> Self {
        self.async_processing = false;
        self
    }

    #[must_use]
    pub fn with_summary_trigger(mut self, trigger: SummaryTriggerConfig) -> Self {
        self.summary_trigger = trigger;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MemoryConfig::default();
        assert!(config.enable_user_memories);
        assert!(config.enable_session_summary);
        assert_eq!(config.retrieval, RetrievalMode::LastN);
        assert_eq!(config.memory_limit, 30);
        assert_eq!(config.async_worker_pool_size, 5);
        assert_eq!(config.task_timeout(), Duration::from_secs(30));
        assert_eq!(config.summary_trigger.strategy, TriggerStrategy::Smart);
        assert_eq!(config.summary_trigger.message_threshold, 10);
        assert_eq!(config.summary_trigger.min_interval(), Duration::from_secs(600));
        assert_eq!(config.summary_trigger.burst_threshold(), 20);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: MemoryConfig = serde_json::from_str(
            r#"{"async_processing": false, "summary_trigger": {"strategy": "ByMessages"}}"#,
        )
        .unwrap();

        assert!(!config.async_processing);
        assert_eq!(config.memory_limit, 30);
        assert_eq!(
            config.summary_trigger.strategy,
            TriggerStrategy::ByMessageCount
        );
        assert_eq!(config.summary_trigger.message_threshold, 10);
    }
}
