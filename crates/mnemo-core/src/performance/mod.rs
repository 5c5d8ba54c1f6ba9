//! Background execution: bounded task queue, worker pool and the dispatcher
//! that ties them together.

mod dispatcher;
mod task_queue;
mod worker_pool;

pub use dispatcher::{AsyncDispatcher, DispatcherConfig};
pub use task_queue::{
    QueueError, QueueStatsSnapshot, QueuedTask, TaskOutcome, TaskQueue, TaskQueueConfig,
};
pub use worker_pool::{TaskExecutor, WorkerPool, WorkerPoolConfig};
