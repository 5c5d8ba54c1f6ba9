use crate::models::MemoryTask;
use crate::performance::{
    QueueError, QueueStatsSnapshot, TaskExecutor, TaskQueue, TaskQueueConfig, WorkerPool,
    WorkerPoolConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Dispatcher configuration.
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub pool_size: usize,
    pub task_timeout: Duration,
    pub idle_sleep: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pool_size: 5,
            task_timeout: Duration::from_secs(30),
            idle_sleep: Duration::from_millis(10),
        }
    }
}

impl DispatcherConfig {
    /// Queue capacity is twice the pool size.
    pub fn queue_capacity(&self) -> usize {
        self.pool_size.max(1) * 2
    }
}

/// Fire-and-forget executor for [`MemoryTask`]s.
///
/// Workers run on their own tokio tasks, so dropping the caller's future
/// never cancels submitted work.
pub struct AsyncDispatcher {
    queue: Arc<TaskQueue>,
    pool: WorkerPool,
}

impl AsyncDispatcher {
    /// Create the queue and start the workers. Must be called inside a tokio runtime.
    pub fn start(executor: Arc<dyn TaskExecutor>, config: DispatcherConfig) -> Self {
        let queue = Arc::new(TaskQueue::new(TaskQueueConfig {
            capacity: config.queue_capacity(),
        }));
        let mut pool = WorkerPool::new(
            queue.clone(),
            executor,
            WorkerPoolConfig {
                worker_count: config.pool_size.max(1),
                idle_sleep: config.idle_sleep,
                task_timeout: config.task_timeout,
            },
        );
        pool.start();
        Self { queue, pool }
    }

    /// Enqueue without blocking. Returns `false` if the task was dropped.
    pub fn submit(&self, task: MemoryTask) -> bool {
        let Err(err) = self.queue.submit(task) else {
            return true;
        };
        let reason = match &err {
            QueueError::QueueFull(_) => "task queue full",
            QueueError::Closed(_) => "dispatcher stopped",
        };
        let task = err.into_task();
        warn!(
            task = %task,
            user_id = task.user_id(),
            capacity = self.queue.capacity(),
            reason,
            "Dropping memory task"
        );
        false
    }

    pub fn stats(&self) -> QueueStatsSnapshot {
        self.queue.get_stats()
    }

    /// Stop intake and wait until queued and running tasks are finished.
    pub async fn stop(mut self) -> QueueStatsSnapshot {
        self.pool.stop().await;
        self.queue.get_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MemoryError, MemoryResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Behaviour is picked by the message text; `gate` holds tasks until released.
    struct ScriptedExecutor {
        gate: Arc<Semaphore>,
        executed: AtomicUsize,
    }

    impl ScriptedExecutor {
        fn open() -> Arc<Self> {
            Arc::new(Self {
                gate: Arc::new(Semaphore::new(Semaphore::MAX_PERMITS)),
                executed: AtomicUsize::new(0),
            })
        }

        fn blocked() -> Arc<Self> {
            Arc::new(Self {
                gate: Arc::new(Semaphore::new(0)),
                executed: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TaskExecutor for ScriptedExecutor {
        async fn execute(&self, task: &MemoryTask) -> MemoryResult<()> {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| MemoryError::Generation(e.to_string()))?;
            self.executed.fetch_add(1, Ordering::SeqCst);

            match task {
                MemoryTask::MemoryAnalysis { message, .. } if message == "panic" => {
                    panic!("executor blew up")
                }
                MemoryTask::MemoryAnalysis { message, .. } if message == "fail" => {
                    Err(MemoryError::Generation("scripted failure".to_string()))
                }
                MemoryTask::MemoryAnalysis { message, .. } if message == "slow" => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                }
                _ => Ok(()),
            }
        }
    }

    fn analysis(message: &str) -> MemoryTask {
        MemoryTask::MemoryAnalysis {
            user_id: "alice".to_string(),
            message: message.to_string(),
        }
    }

    fn config(pool_size: usize) -> DispatcherConfig {
        DispatcherConfig {
            pool_size,
            task_timeout: Duration::from_millis(200),
            idle_sleep: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn overflow_is_dropped_without_blocking() {
        let executor = ScriptedExecutor::blocked();
        let dispatcher = AsyncDispatcher::start(executor.clone(), config(1));

        // Current-thread runtime: workers cannot run until we yield.
        let accepted = (0..10).filter(|i| dispatcher.submit(analysis(&format!("t{i}")))).count();
        assert_eq!(accepted, 2);
        assert_eq!(dispatcher.stats().dropped, 8);

        executor.gate.add_permits(Semaphore::MAX_PERMITS / 2);
        let stats = dispatcher.stop().await;
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.pending, 0);
        assert_eq!(executor.executed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_and_panics_do_not_stop_workers() {
        let executor = ScriptedExecutor::open();
        let dispatcher = AsyncDispatcher::start(executor.clone(), config(2));

        assert!(dispatcher.submit(analysis("panic")));
        assert!(dispatcher.submit(analysis("fail")));
        assert!(dispatcher.submit(analysis("ok")));

        let stats = dispatcher.stop().await;
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.running, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_task_times_out() {
        let executor = ScriptedExecutor::open();
        let dispatcher = AsyncDispatcher::start(executor.clone(), config(1));

        assert!(dispatcher.submit(analysis("slow")));
        assert!(dispatcher.submit(analysis("ok")));

        let stats = dispatcher.stop().await;
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.completed, 1);
    }

    #[tokio::test]
    async fn submit_after_stop_is_dropped() {
        let executor = ScriptedExecutor::open();
        let dispatcher = AsyncDispatcher::start(executor.clone(), config(2));
        let queue = dispatcher.queue.clone();

        dispatcher.stop().await;
        assert!(matches!(
            queue.submit(analysis("late")),
            Err(QueueError::Closed(_))
        ));
        assert_eq!(queue.get_stats().dropped, 1);
    }
}
