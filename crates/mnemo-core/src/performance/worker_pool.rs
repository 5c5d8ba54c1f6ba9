use crate::error::MemoryResult;
use crate::models::MemoryTask;
use crate::performance::{QueuedTask, TaskOutcome, TaskQueue};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Worker pool configuration.
#[derive(Clone, Debug)]
pub struct WorkerPoolConfig {
    /// Number of workers.
    pub worker_count: usize,
    /// Idle sleep interval.
    pub idle_sleep: Duration,
    /// Upper bound on a single task's execution.
    pub task_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 5,
            idle_sleep: Duration::from_millis(10),
            task_timeout: Duration::from_secs(30),
        }
    }
}

#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    async fn execute(&self, task: &MemoryTask) -> MemoryResult<()>;
}

/// Worker pool.
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    executor: Arc<dyn TaskExecutor>,
    config: WorkerPoolConfig,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<TaskQueue>,
        executor: Arc<dyn TaskExecutor>,
        config: WorkerPoolConfig,
    ) -> Self {
        Self {
            queue,
            executor,
            config,
            handles: Vec::new(),
        }
    }

    /// Start all workers. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        info!(count = self.config.worker_count, "Starting worker pool");
        for worker_id in 0..self.config.worker_count {
            let queue = self.queue.clone();
            let executor = self.executor.clone();
            let config = self.config.clone();
            let handle = tokio::spawn(async move {
                Self::worker_loop(worker_id, queue, executor, config).await;
            });
            self.handles.push(handle);
        }
    }

    /// Close intake, drain the queue and wait for every worker to exit.
    pub async fn stop(&mut self) {
        info!("Stopping worker pool");
        self.queue.close();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task terminated abnormally");
            }
        }
    }

    async fn worker_loop(
        worker_id: usize,
        queue: Arc<TaskQueue>,
        executor: Arc<dyn TaskExecutor>,
        config: WorkerPoolConfig,
    ) {
        debug!(worker_id, "Worker started");
        loop {
            match queue.pop() {
                Some(queued) => {
                    Self::process_one(worker_id, &queue, &executor, &config, queued).await
                }
                None if queue.is_closed() => break,
                None => tokio::time::sleep(config.idle_sleep).await,
            }
        }
        debug!(worker_id, "Worker shutting down");
    }

    async fn process_one(
        worker_id: usize,
        queue: &TaskQueue,
        executor: &Arc<dyn TaskExecutor>,
        config: &WorkerPoolConfig,
        queued: QueuedTask,
    ) {
        let task = queued.task;
        let wait_time = queued.submitted_at.elapsed();
        queue.mark_running(wait_time);

        let started = Instant::now();
        let run = AssertUnwindSafe(executor.execute(&task)).catch_unwind();
        let outcome = match tokio::time::timeout(config.task_timeout, run).await {
            Ok(Ok(Ok(()))) => {
                debug!(worker_id, task = %task, wait_ms = wait_time.as_millis() as u64, "Task completed");
                TaskOutcome::Completed
            }
            Ok(Ok(Err(e))) => {
                warn!(worker_id, task = %task, error = %e, "Task failed");
                TaskOutcome::Failed
            }
            Ok(Err(panic)) => {
                error!(worker_id, task = %task, panic = panic_message(&*panic), "Task panicked");
                TaskOutcome::Failed
            }
            Err(_) => {
                warn!(
                    worker_id,
                    task = %task,
                    timeout_secs = config.task_timeout.as_secs_f64(),
                    "Task timed out"
                );
                TaskOutcome::TimedOut
            }
        };
        queue.mark_finished(outcome, started.elapsed());
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
