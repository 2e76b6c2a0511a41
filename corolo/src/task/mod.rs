//! Asynchronous computations and the handles used to retrieve their output.
//!
//! - [`Task`]: single owner, starts eagerly, awaited or joined once.
//! - [`JoinableTask`]: a [`Task`] a plain thread blocks on.
//! - [`SharedTask`]: reference counted, starts on first await, awaited by any
//!   number of handles.
//!
//! Tasks are not bound to a scheduler. A body moves between threads by
//! awaiting [`Schedule::schedule`] on a worker pool or a pinned queue, and is
//! resumed wherever it is woken.
//!
//! [`Schedule::schedule`]: crate::runtime::Schedule::schedule

mod core;

mod error;
pub use self::error::{JoinError, SharedPanic};

pub(crate) mod frame;

pub mod id;
pub use self::id::{Id, id, try_id};

mod join;
pub use self::join::JoinableTask;

mod shared;
pub use self::shared::SharedTask;

mod state;

#[allow(clippy::module_inception)]
mod task;
pub use self::task::Task;

pub(crate) mod trampoline;


/// Something a thread can wait on until it reports completion, e.g. with
/// [`PinnedQueue::pump`].
///
/// [`PinnedQueue::pump`]: crate::runtime::pinned::PinnedQueue::pump
pub trait Finished {
    fn is_finished(&self) -> bool;
}

impl<F: Finished + ?Sized> Finished for &F {
    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}

impl<F: Finished + ?Sized> Finished for std::sync::Arc<F> {
    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}
