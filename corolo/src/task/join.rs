use crate::task::core::Core;
use crate::task::{Finished, Id, JoinError};
use std::fmt;
use std::sync::Arc;

/// A task that plain threads block on.
///
/// Created by [`Task::joinable`]. The body starts immediately, like any other
/// [`Task`], and releases a semaphore when it completes. A joinable task
/// cannot be awaited:
///
/// ```compile_fail
/// # async fn doc() {
/// let task = corolo::Task::joinable(async { 1 });
/// let _ = task.await;
/// # }
/// ```
///
/// [`Task`]: crate::task::Task
/// [`Task::joinable`]: crate::task::Task::joinable
pub struct JoinableTask<T> {
    core: Arc<Core<T>>,
}

impl<T> JoinableTask<T> {
    pub(crate) fn new(core: Arc<Core<T>>) -> JoinableTask<T> {
        JoinableTask { core }
    }

    pub fn id(&self) -> Id {
        self.core.id()
    }

    pub fn is_finished(&self) -> bool {
        self.core.is_complete()
    }

    /// Blocks until the body completes and returns its output, re-raising a
    /// panic from the body.
    #[track_caller]
    pub fn join(self) -> T {
        self.try_join().unwrap_or_else(|err| err.resume_unwind())
    }

    /// Blocks until the body completes.
    pub fn try_join(self) -> Result<T, JoinError> {
        self.core.wait();
        self.core.take_output()
    }
}

impl<T> Finished for JoinableTask<T> {
    fn is_finished(&self) -> bool {
        JoinableTask::is_finished(self)
    }
}

impl<T> fmt::Debug for JoinableTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinableTask")
            .field("id", &self.id())
            .field("finished", &self.is_finished())
            .finish()
    }
}
