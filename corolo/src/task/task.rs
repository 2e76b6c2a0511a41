use crate::task::core::{self, Core};
use crate::task::{Finished, Id, JoinError, JoinableTask};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A single-owner handle to an eagerly started asynchronous computation.
///
/// The body starts running on the calling thread as soon as the task is
/// created, up to its first suspension point. Awaiting the task yields the
/// body's output; a plain thread can block on it with [`Task::join`].
///
/// A `Task` is not `Clone`. Its output is moved out exactly once, either by
/// awaiting the task or through [`Task::take_result`]. To share an output
/// between several awaiters use [`SharedTask`].
///
/// Dropping a `Task` does not stop the body. If it is suspended somewhere (a
/// scheduler queue, another task), it runs to completion and its output is
/// dropped.
///
/// # Panics
///
/// A panic inside the body is captured and re-raised wherever the output is
/// retrieved. [`Task::try_join`] hands it back as a [`JoinError`] instead.
///
/// # Examples
///
/// ```
/// use corolo::Task;
///
/// let answer = Task::new(async {
///     let half = Task::new(async { 21 }).await;
///     half * 2
/// });
///
/// assert!(answer.is_finished());
/// assert_eq!(answer.join(), 42);
/// ```
///
/// [`SharedTask`]: crate::task::SharedTask
pub struct Task<T = ()> {
    core: Arc<Core<T>>,
}

impl<T: Send + 'static> Task<T> {
    /// Creates a task and runs `future` until it first suspends.
    pub fn new<F>(future: F) -> Task<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        Task {
            core: core::spawn(future, false),
        }
    }

    /// Creates a task that plain threads block on instead of awaiting.
    pub fn joinable<F>(future: F) -> JoinableTask<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        JoinableTask::new(core::spawn(future, true))
    }

    /// Blocks the calling thread until the task completes and returns its
    /// output, re-raising a panic from the body.
    ///
    /// Must not be called from a thread the body needs in order to make
    /// progress, e.g. the owner of a [`PinnedQueue`] it is scheduled onto.
    ///
    /// [`PinnedQueue`]: crate::runtime::pinned::PinnedQueue
    #[track_caller]
    pub fn join(self) -> T {
        self.try_join().unwrap_or_else(|err| err.resume_unwind())
    }

    /// Blocks the calling thread until the task completes.
    ///
    /// # Panics
    ///
    /// Panics if the output was already moved out.
    #[track_caller]
    pub fn try_join(self) -> Result<T, JoinError> {
        if self.core.is_complete() {
            return self.core.take_output();
        }

        Task::joinable(TryJoin(self)).join()
    }
}

impl<T> Task<T> {
    /// Returns the [`Id`] of this task.
    pub fn id(&self) -> Id {
        self.core.id()
    }

    /// Returns `true` once the body has returned or panicked.
    pub fn is_finished(&self) -> bool {
        self.core.is_complete()
    }

    /// Moves the output out without blocking.
    ///
    /// Returns `None` while the task is still running and on every call after
    /// the output was moved out.
    pub fn take_result(&mut self) -> Option<T> {
        self.core
            .try_take_output()
            .map(|res| res.unwrap_or_else(|err| err.resume_unwind()))
    }
}

impl<T> Future for Task<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        self.core
            .poll_output(cx)
            .map(|res| res.unwrap_or_else(|err| err.resume_unwind()))
    }
}

impl<T> Finished for Task<T> {
    fn is_finished(&self) -> bool {
        Task::is_finished(self)
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Awaits a task without re-raising its panic, so `try_join` can wrap a plain
/// task in a joinable one.
struct TryJoin<T>(Task<T>);

impl<T> Future for TryJoin<T> {
    type Output = Result<T, JoinError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.core.poll_output(cx)
    }
}
