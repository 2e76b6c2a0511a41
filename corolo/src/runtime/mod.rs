//! Scheduler queues.
//!
//! A task moves onto a scheduler by awaiting [`Schedule::schedule`]. The
//! awaiting frame is suspended, its [`Continuation`] handed to the queue, and
//! it resumes on whichever thread the queue resumes it from:
//!
//! - [`pool::WorkerPool`]: a fixed set of worker threads sharing one FIFO
//!   queue;
//! - [`pinned::PinnedQueue`]: a single thread that drains its queue only
//!   while it pumps.
//!
//! There is no ambient scheduler. Handles are passed to the tasks that need
//! them.

mod builder;
pub use builder::Builder;
pub(crate) use builder::PoolConfig;

pub mod pinned;

pub mod pool;

mod schedule;
pub use schedule::{Continuation, Schedule, ScheduleOp};
