use crate::models::MemoryTask;
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Task queued for execution.
#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub task: MemoryTask,
    pub submitted_at: Instant,
}

/// How a dequeued task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed,
    TimedOut,
}

/// Queue statistics counters.
#[derive(Debug, Default)]
pub struct QueueStats {
    pub pending_count: AtomicUsize,
    pub running_count: AtomicUsize,
    pub completed_count: AtomicU64,
    pub failed_count: AtomicU64,
    pub timed_out_count: AtomicU64,
    pub dropped_count: AtomicU64,
    pub total_wait_time_ms: AtomicU64,
    pub total_exec_time_ms: AtomicU64,
}

/// Queue configuration.
#[derive(Clone, Debug)]
pub struct TaskQueueConfig {
    /// Maximum queued (not yet running) tasks.
    pub capacity: usize,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self { capacity: 10 }
    }
}

/// Bounded FIFO queue of background tasks.
///
/// Submission never blocks: when the queue is full or closed the task is
/// handed back to the caller and counted as dropped.
pub struct TaskQueue {
    queue: ArrayQueue<QueuedTask>,
    closed: AtomicBool,
    stats: QueueStats,
}

impl TaskQueue {
    pub fn new(config: TaskQueueConfig) -> Self {
        Self {
            queue: ArrayQueue::new(config.capacity.max(1)),
            closed: AtomicBool::new(false),
            stats: QueueStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Submit a task to the queue.
    pub fn submit(&self, task: MemoryTask) -> Result<(), QueueError> {
        if self.is_closed() {
            self.stats.dropped_count.fetch_add(1, Ordering::Relaxed);
            return Err(QueueError::Closed(task));
        }

        // Count before pushing so a concurrent pop never sees pending underflow.
        self.stats.pending_count.fetch_add(1, Ordering::Relaxed);
        let queued = QueuedTask {
            task,
            submitted_at: Instant::now(),
        };
        match self.queue.push(queued) {
            Ok(()) => Ok(()),
            Err(rejected) => {
                self.stats.pending_count.fetch_sub(1, Ordering::Relaxed);
                self.stats.dropped_count.fetch_add(1, Ordering::Relaxed);
                Err(QueueError::QueueFull(rejected.task))
            }
        }
    }

    /// Pop the oldest task.
    pub fn pop(&self) -> Option<QueuedTask> {
        self.queue.pop()
    }

    /// Stop accepting submissions. Already queued tasks remain poppable.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark a popped task as running.
    pub fn mark_running(&self, wait_time: Duration) {
        self.stats.pending_count.fetch_sub(1, Ordering::Relaxed);
        self.stats.running_count.fetch_add(1, Ordering::Relaxed);
        self.stats
            .total_wait_time_ms
            .fetch_add(wait_time.as_millis() as u64, Ordering::Relaxed);
    }

    /// Mark a running task as finished.
    pub fn mark_finished(&self, outcome: TaskOutcome, exec_time: Duration) {
        self.stats
            .total_exec_time_ms
            .fetch_add(exec_time.as_millis() as u64, Ordering::Relaxed);
        self.stats.running_count.fetch_sub(1, Ordering::Relaxed);
        let counter = match outcome {
            TaskOutcome::Completed => &self.stats.completed_count,
            TaskOutcome::Failed => &self.stats.failed_count,
            TaskOutcome::TimedOut => &self.stats.timed_out_count,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot queue stats.
    pub fn get_stats(&self) -> QueueStatsSnapshot {
        let completed = self.stats.completed_count.load(Ordering::Relaxed);
        let failed = self.stats.failed_count.load(Ordering::Relaxed);
        let timed_out = self.stats.timed_out_count.load(Ordering::Relaxed);
        let finished = completed + failed + timed_out;

        QueueStatsSnapshot {
            pending: self.stats.pending_count.load(Ordering::Relaxed),
            running: self.stats.running_count.load(Ordering::Relaxed),
            completed,
            failed,
            timed_out,
            dropped: self.stats.dropped_count.load(Ordering::Relaxed),
            avg_exec_time_ms: average(&self.stats.total_exec_time_ms, finished),
            avg_wait_time_ms: average(&self.stats.total_wait_time_ms, finished),
        }
    }
}

fn average(total: &AtomicU64, count: u64) -> u64 {
    let total = total.load(Ordering::Relaxed);
    if count > 0 { total / count } else { 0 }
}

#[derive(Debug)]
pub enum QueueError {
    QueueFull(MemoryTask),
    Closed(MemoryTask),
}

impl QueueError {
    pub fn into_task(self) -> MemoryTask {
        match self {
            QueueError::QueueFull(task) | QueueError::Closed(task) => task,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStatsSnapshot {
    pub pending: usize,
    pub running: usize,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub dropped: u64,
    pub avg_exec_time_ms: u64,
    pub avg_wait_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_queue(capacity: usize) -> TaskQueue {
        TaskQueue::new(TaskQueueConfig { capacity })
    }

    fn analysis(message: &str) -> MemoryTask {
        MemoryTask::MemoryAnalysis {
            user_id: "alice".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn fifo_order() {
        let queue = test_queue(4);
        queue.submit(analysis("first")).unwrap();
        queue.submit(analysis("second")).unwrap();

        assert_eq!(queue.pop().unwrap().task, analysis("first"));
        assert_eq!(queue.pop().unwrap().task, analysis("second"));
        assert!(queue.pop().is_none(), "queue should be empty");
    }

    #[test]
    fn queue_full_drops_and_counts() {
        let queue = test_queue(2);
        queue.submit(analysis("t1")).unwrap();
        queue.submit(analysis("t2")).unwrap();

        let result = queue.submit(analysis("t3"));
        match result {
            Err(QueueError::QueueFull(task)) => assert_eq!(task, analysis("t3")),
            other => panic!("expected QueueFull, got: {:?}", other),
        }

        let stats = queue.get_stats();
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn closed_queue_rejects_but_drains() {
        let queue = test_queue(4);
        queue.submit(analysis("t1")).unwrap();
        queue.close();

        assert!(matches!(
            queue.submit(analysis("t2")),
            Err(QueueError::Closed(_))
        ));
        assert!(queue.pop().is_some());
        assert_eq!(queue.get_stats().dropped, 1);
    }

    #[test]
    fn rejected_task_is_returned() {
        let queue = test_queue(1);
        queue.submit(analysis("kept")).unwrap();

        let rejected = queue.submit(analysis("spill")).unwrap_err().into_task();
        assert_eq!(rejected, analysis("spill"));
        assert_eq!(rejected.user_id(), "alice");

        queue.close();
        let summary = MemoryTask::SummaryUpdate {
            user_id: "bob".to_string(),
            session_id: "s9".to_string(),
        };
        let rejected = queue.submit(summary.clone()).unwrap_err().into_task();
        assert_eq!(rejected, summary);
        assert_eq!(rejected.user_id(), "bob");
    }

    #[test]
    fn outcome_counters() {
        let queue = test_queue(4);
        for name in ["a", "b", "c"] {
            queue.submit(analysis(name)).unwrap();
        }

        for outcome in [
            TaskOutcome::Completed,
            TaskOutcome::Failed,
            TaskOutcome::TimedOut,
        ] {
            queue.pop().unwrap();
            queue.mark_running(Duration::from_millis(3));
            queue.mark_finished(outcome, Duration::from_millis(9));
        }

        let stats = queue.get_stats();
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.running, 0);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.avg_exec_time_ms, 9);
        assert_eq!(stats.avg_wait_time_ms, 3);
    }

    #[test]
    fn fresh_queue_stats_all_zero() {
        let queue = test_queue(8);
        assert_eq!(queue.get_stats(), QueueStatsSnapshot::default());
        assert_eq!(queue.capacity(), 8);
    }
}
