//! Summary trigger decision engine.
//!
//! Decides when a session summary should be regenerated. Per-session
//! counters live in a session-keyed table owned by [`SummaryTrigger`] behind
//! its own lock, independent of the manager's configuration lock.
//!
//! ```text
//! check(count) ──► TriggerState { since, total, last_summary_time, pending }
//!                       │
//!                       ▼
//!        strategy(since, elapsed) ──► bool (pending = true)
//!                       │ summary written
//!                       ▼
//!            mark_summary_updated(key): since = 0, last = now, pending = false
//! ```
//!
//! A session that already has a summary in flight does not trigger again
//! until that summary is marked or released, except under `Always`.

use crate::config::{SummaryTriggerConfig, TriggerStrategy};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Build the trigger-state key for a session.
pub fn session_key(user_id: &str, session_id: &str) -> String {
    format!("{user_id}:{session_id}")
}

/// Per-session summary bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerState {
    pub last_summary_time: Instant,
    pub messages_since_last_summary: u64,
    pub total_messages: u64,
    /// A summary was requested and has not been marked or released yet.
    pub pending: bool,
}

/// Strategy evaluation over trigger state.
pub struct SummaryTrigger {
    config: RwLock<SummaryTriggerConfig>,
    states: Mutex<HashMap<String, TriggerState>>,
}

impl SummaryTrigger {
    pub fn new(config: SummaryTriggerConfig) -> Self {
        Self {
            config: RwLock::new(config),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> SummaryTriggerConfig {
        self.config.read().clone()
    }

    /// Replace the thresholds. Existing session state is kept.
    pub fn set_config(&self, config: SummaryTriggerConfig) {
        *self.config.write() = config;
    }

    /// Report the session's current message count and decide whether to summarize.
    pub fn should_trigger(&self, key: &str, message_count: u64) -> bool {
        self.should_trigger_at(key, message_count, Instant::now())
    }

    /// Same as [`Self::should_trigger`] with an explicit clock reading.
    pub fn should_trigger_at(&self, key: &str, message_count: u64, now: Instant) -> bool {
        let config = self.config();
        let mut states = self.states.lock();

        let Some(state) = states.get_mut(key) else {
            // First sighting: sessions with existing history may trigger at once.
            let triggered = config.strategy == TriggerStrategy::Always
                || message_count >= config.message_threshold;
            states.insert(
                key.to_string(),
                TriggerState {
                    last_summary_time: now,
                    messages_since_last_summary: message_count,
                    total_messages: message_count,
                    pending: triggered,
                },
            );
            debug!(key, message_count, triggered, "Initialized summary trigger state");
            return triggered;
        };

        let delta = message_count.saturating_sub(state.total_messages);
        state.total_messages += delta;
        state.messages_since_last_summary += delta;

        if state.pending && config.strategy != TriggerStrategy::Always {
            debug!(
                key,
                since = state.messages_since_last_summary,
                "Summary already pending, not triggering"
            );
            return false;
        }

        let elapsed = now.saturating_duration_since(state.last_summary_time);
        let triggered = evaluate(&config, state.messages_since_last_summary, elapsed);
        state.pending = triggered;
        debug!(
            key,
            since = state.messages_since_last_summary,
            elapsed_secs = elapsed.as_secs(),
            triggered,
            "Evaluated summary trigger"
        );
        triggered
    }

    /// Reset the counter after a summary was written. Unknown keys are ignored.
    pub fn mark_summary_updated(&self, key: &str) {
        self.mark_summary_updated_at(key, Instant::now());
    }

    pub fn mark_summary_updated_at(&self, key: &str, now: Instant) {
        if let Some(state) = self.states.lock().get_mut(key) {
            state.messages_since_last_summary = 0;
            state.last_summary_time = now;
            state.pending = false;
        }
    }

    /// Re-arm a session whose requested summary was never written.
    ///
    /// Counters are kept, so the next check re-evaluates the strategy.
    pub fn clear_pending(&self, key: &str) {
        if let Some(state) = self.states.lock().get_mut(key) {
            state.pending = false;
        }
    }

    /// Start tracking a requested summary; see [`PendingSummary`].
    pub fn pending_summary<'a>(&'a self, key: &'a str) -> PendingSummary<'a> {
        PendingSummary {
            trigger: self,
            key,
            finished: false,
        }
    }

    /// Snapshot of one session's state.
    pub fn state(&self, key: &str) -> Option<TriggerState> {
        self.states.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }

    /// Drop states whose last summary is older than `max_age`. Returns the number removed.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        self.cleanup_at(max_age, Instant::now())
    }

    pub fn cleanup_at(&self, max_age: Duration, now: Instant) -> usize {
        let mut states = self.states.lock();
        let before = states.len();
        states.retain(|_, state| now.saturating_duration_since(state.last_summary_time) <= max_age);
        before - states.len()
    }
}

/// Releases a session's pending flag unless the summary was marked.
///
/// Dropping it on an error, a panic or a timed-out future re-arms the
/// trigger for that session.
pub struct PendingSummary<'a> {
    trigger: &'a SummaryTrigger,
    key: &'a str,
    finished: bool,
}

impl PendingSummary<'_> {
    /// The summary is stored (or deliberately unchanged): reset the counters.
    pub fn finish(mut self) {
        self.trigger.mark_summary_updated(self.key);
        self.finished = true;
    }
}

impl Drop for PendingSummary<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(key = self.key, "Summary not written, re-arming trigger");
            self.trigger.clear_pending(self.key);
        }
    }
}

fn evaluate(config: &SummaryTriggerConfig, since: u64, elapsed: Duration) -> bool {
    let count_ready = since >= config.message_threshold;
    let time_ready = elapsed >= config.min_interval();

    match config.strategy {
        TriggerStrategy::Always => true,
        TriggerStrategy::ByMessageCount => count_ready,
        TriggerStrategy::ByTimeInterval => time_ready,
        TriggerStrategy::Smart => {
            let burst =
                since >= config.burst_threshold() && elapsed >= config.burst_min_interval();
            let idle = elapsed > config.idle_interval() && since >= config.idle_min_messages;
            (count_ready && time_ready) || burst || idle
        }
    }
}
