//! Exclusive lock.
//!
//! The engine locks with `parking_lot`'s mutex: no poisoning, eventual
//! fairness and a timed acquire (`try_lock_for`) for bounded critical
//! sections. The task pool keeps one per list it owns.
//!
//! ```
//! use prometheus_taskpool::Mutex;
//! use std::time::Duration;
//!
//! let queue = Mutex::new(Vec::new());
//! queue.lock().push("job");
//!
//! let guard = queue.try_lock_for(Duration::from_millis(10)).expect("uncontended");
//! assert_eq!(guard.len(), 1);
//! ```

pub use parking_lot::{Mutex, MutexGuard};
