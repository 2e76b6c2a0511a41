use crate::sync::BinarySemaphore;
use crate::task::frame::Frame;
use crate::task::state::{Attach, Notify, State};
use crate::task::{Id, JoinError};
use futures::FutureExt;
use std::cell::UnsafeCell;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Shared between a task body and the single handle that retrieves its
/// output.
pub(crate) struct Core<T> {
    id: Id,

    state: State,

    /// Written once by the body before `COMPLETE` is published, taken once by
    /// the handle after observing it.
    output: UnsafeCell<Option<Result<T, JoinError>>>,

    /// Owned by the handle while `CONTINUATION` is clear and by the body
    /// while it is set.
    continuation: UnsafeCell<Option<Waker>>,

    /// Only present for joinable tasks, released once the output is written.
    completion: Option<BinarySemaphore>,
}

// Safety: the output and continuation slots are handed back and forth through
// `State`, so at most one side writes a slot at a time.
unsafe impl<T: Send> Send for Core<T> {}
unsafe impl<T: Send> Sync for Core<T> {}

/// Builds a task around `future` and runs it until its first suspension
/// point. The returned core receives the output.
pub(crate) fn spawn<F>(future: F, joinable: bool) -> Arc<Core<F::Output>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let id = Id::next();
    let core = Arc::new(Core {
        id,
        state: State::new(),
        output: UnsafeCell::new(None),
        continuation: UnsafeCell::new(None),
        completion: joinable.then(|| BinarySemaphore::new(false)),
    });

    let producer = core.clone();
    let body = AssertUnwindSafe(future).catch_unwind().map(move |res| {
        let res = res.map_err(|payload| {
            let err = JoinError::panic(id, payload);
            tracing::debug!(task.id = %id, error = %err, "task body panicked");
            err
        });

        producer.complete(res);
    });

    Frame::new(id, body.boxed()).start();
    core
}

impl<T> Core<T> {
    pub(crate) fn id(&self) -> Id {
        self.id
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    fn complete(&self, res: Result<T, JoinError>) {
        // Safety: the body is the only writer and nobody reads the slot
        // before `COMPLETE` is published below.
        unsafe {
            *self.output.get() = Some(res);
        }

        let notify = self.state.transition_to_complete();

        if let Some(completion) = &self.completion {
            completion.release();
        }

        if notify == Notify::Continuation {
            // Safety: `CONTINUATION` was set when we completed and can no
            // longer be cleared, so the handle won't touch the slot again.
            let continuation = unsafe { &*self.continuation.get() };
            if let Some(waker) = continuation {
                waker.wake_by_ref();
            }
        }
    }

    /// Registers `cx` as the continuation or returns the output if the task
    /// already completed. Must only be called by the owning handle.
    pub(crate) fn poll_output(&self, cx: &mut Context<'_>) -> Poll<Result<T, JoinError>> {
        let snapshot = self.state.load();

        if !snapshot.is_complete() {
            if snapshot.has_continuation() {
                // Safety: shared reads are fine while the body owns the slot.
                let same = unsafe { &*self.continuation.get() }
                    .as_ref()
                    .is_some_and(|waker| waker.will_wake(cx.waker()));

                if same {
                    return Poll::Pending;
                }
            }

            if self.state.unset_continuation().is_ok() {
                // Safety: `CONTINUATION` is clear, the slot is ours.
                unsafe {
                    *self.continuation.get() = Some(cx.waker().clone());
                }

                if self.state.set_continuation() == Attach::Suspended {
                    return Poll::Pending;
                }
            }
        }

        Poll::Ready(self.take_output())
    }

    /// Takes the output once the task completed.
    ///
    /// # Panics
    ///
    /// Panics if the output was already taken.
    #[track_caller]
    pub(crate) fn take_output(&self) -> Result<T, JoinError> {
        self.try_take_output()
            .unwrap_or_else(|| panic!("output of task {} was already retrieved", self.id))
    }

    /// Returns `None` if the task is still running or the output was already
    /// taken.
    pub(crate) fn try_take_output(&self) -> Option<Result<T, JoinError>> {
        if !self.state.is_complete() {
            return None;
        }

        // Safety: `COMPLETE` was observed with acquire ordering and only the
        // owning handle takes the output.
        unsafe { (*self.output.get()).take() }
    }

    /// Blocks the calling thread until the body completes. Only available on
    /// joinable tasks.
    pub(crate) fn wait(&self) {
        let completion = self
            .completion
            .as_ref()
            .unwrap_or_else(|| panic!("task {} is not joinable", self.id));

        completion.acquire();
    }
}
