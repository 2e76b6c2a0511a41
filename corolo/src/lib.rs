//! A small cooperative task runtime.
//!
//! Computations are written as ordinary `async` blocks and wrapped in one of
//! the task handles in [`task`]. A task is not owned by any executor: it runs
//! on whatever thread resumes it, and moves between threads by awaiting
//! [`Schedule::schedule`] on one of the queues in [`runtime`]. Plain threads
//! get results back with [`JoinableTask::join`] or [`sync_wait`].
//!
//! ```
//! use corolo::runtime::Schedule;
//! use corolo::runtime::pinned::PinnedQueue;
//! use corolo::runtime::pool::WorkerPool;
//! use corolo::{SharedTask, Task};
//!
//! # fn main() -> anyhow::Result<()> {
//! let pool = WorkerPool::new(2)?;
//! let ui = PinnedQueue::new();
//!
//! let config = SharedTask::new({
//!     let pool = pool.handle();
//!     async move {
//!         pool.schedule().await;
//!         vec!["a", "b"]
//!     }
//! });
//!
//! let mut render = Task::new({
//!     let ui = ui.clone();
//!     async move {
//!         let config = config.await;
//!         ui.schedule().await;
//!         config.len()
//!     }
//! });
//!
//! ui.pump(&render);
//! assert_eq!(render.take_result(), Some(2));
//! # Ok(())
//! # }
//! ```
//!
//! [`Schedule::schedule`]: runtime::Schedule::schedule

pub mod runtime;

pub mod sync;

mod sync_wait;
pub use sync_wait::{sync_wait, try_sync_wait};

pub mod task;
pub use task::{JoinableTask, SharedTask, Task};

mod utils;

#[cfg(test)]
mod test_utils;
