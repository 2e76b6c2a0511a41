use crate::task::trampoline;
use futures::task::AtomicWaker;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

/// A queue of suspended tasks that some thread resumes.
///
/// Implementors only provide [`enqueue`](Schedule::enqueue): every
/// continuation handed over must eventually be [resumed](Continuation::resume)
/// on a thread of the scheduler's choosing, or [closed](Continuation::close)
/// if the scheduler stopped accepting work in the meantime.
pub trait Schedule: Clone + Send + Sync + Unpin + 'static {
    /// Hands a suspended task over to the scheduler.
    fn enqueue(&self, continuation: Continuation);

    /// Returns `true` once the scheduler stopped accepting work.
    fn is_shutdown(&self) -> bool {
        false
    }

    /// Suspends the awaiting task and resumes it on this scheduler.
    ///
    /// The returned future is never ready on its first poll.
    ///
    /// # Panics
    ///
    /// Awaiting it panics if the scheduler has shut down.
    fn schedule(&self) -> ScheduleOp<Self> {
        ScheduleOp {
            scheduler: self.clone(),
            pending: None,
        }
    }
}

/// The resume half of a task suspended on a scheduler.
pub struct Continuation {
    inner: Arc<Resume>,
}

struct Resume {
    resumed: AtomicBool,
    closed: AtomicBool,
    waker: AtomicWaker,
}

impl Continuation {
    /// Resumes the suspended task on the calling thread.
    pub fn resume(self) {
        self.inner.resumed.store(true, Ordering::Release);
        self.inner.waker.wake();
    }

    /// Hands the continuation back to the awaiting task without resuming it
    /// on the scheduler. The task wakes on the calling thread and its
    /// [`ScheduleOp`] panics.
    pub fn close(self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.waker.wake();
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("resumed", &self.inner.resumed.load(Ordering::Relaxed))
            .field("closed", &self.inner.closed.load(Ordering::Relaxed))
            .finish()
    }
}

/// Future returned by [`Schedule::schedule`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct ScheduleOp<S> {
    scheduler: S,
    pending: Option<Arc<Resume>>,
}

impl<S: Schedule> Future for ScheduleOp<S> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        if let Some(resume) = &this.pending {
            resume.waker.register(cx.waker());
            assert!(
                !resume.closed.load(Ordering::Acquire),
                "cannot schedule onto a scheduler that has shut down"
            );
            if resume.resumed.load(Ordering::Acquire) {
                return Poll::Ready(());
            }
            return Poll::Pending;
        }

        assert!(
            !this.scheduler.is_shutdown(),
            "cannot schedule onto a scheduler that has shut down"
        );

        let resume = Arc::new(Resume {
            resumed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            waker: AtomicWaker::new(),
        });
        resume.waker.register(cx.waker());
        this.pending = Some(resume.clone());

        // Enqueued once this task has suspended, so the scheduler's thread
        // resumes it rather than us polling it again.
        let scheduler = this.scheduler.clone();
        trampoline::defer(move || scheduler.enqueue(Continuation { inner: resume }));

        Poll::Pending
    }
}

impl<S> fmt::Debug for ScheduleOp<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleOp")
            .field("enqueued", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}
