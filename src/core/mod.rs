//! Tasks, task pools and the containers they are built on.

pub mod error;
pub mod list;
pub mod mempool;
pub mod task;
pub mod task_pool;

pub use error::{clear_errno, last_errno, AppResult, TaskError, TaskResult};
pub use list::List;
pub use mempool::{BlockId, Mempool};
pub use task::{Period, Task, TaskConfig, TaskContext, STOP_TIMEOUT_CAP};
pub use task_pool::{PoolStats, TaskPool, WorkFn, WorkItem, MAX_WORKERS};
