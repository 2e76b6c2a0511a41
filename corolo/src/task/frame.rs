use crate::task::Id;
use crate::task::id::TaskIdGuard;
use crate::task::trampoline;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering::*};
use std::task::{Context, Poll, Wake, Waker};

const INITIAL: u8 = 0;
const IDLE: u8 = 1;
const RUNNING: u8 = 2;
const NOTIFIED: u8 = 3;
const COMPLETE: u8 = 4;

/// The suspended body of a task.
///
/// A frame is its own waker: waking it resumes the body on the waking thread
/// through the [`trampoline`]. Wakes that arrive while the body is being
/// polled are folded into one extra poll once it returns. Frames are only
/// kept alive by the wakers handed out to whatever they are waiting on, so a
/// body that is never woken again is dropped with its last waker.
pub(crate) struct Frame {
    id: Id,
    state: AtomicU8,
    future: Mutex<Option<BoxFuture<'static, ()>>>,
}

impl Frame {
    pub(crate) fn new(id: Id, future: BoxFuture<'static, ()>) -> Arc<Frame> {
        Arc::new(Frame {
            id,
            state: AtomicU8::new(INITIAL),
            future: Mutex::new(Some(future)),
        })
    }

    /// Runs the body up to its first suspension point on the calling thread.
    pub(crate) fn start(self: &Arc<Self>) {
        let res = self.state.compare_exchange(INITIAL, RUNNING, AcqRel, Acquire);
        assert!(res.is_ok(), "task {} started twice", self.id);

        tracing::trace!(task.id = %self.id, "starting task");
        trampoline::run_now(self);
    }

    /// Polls the body until it either completes or suspends without a pending
    /// notification. The caller must have moved the frame to `RUNNING`.
    pub(crate) fn run(self: &Arc<Self>) {
        let _id_guard = TaskIdGuard::enter(self.id);
        let mark = trampoline::deferred_mark();
        let waker = Waker::from(self.clone());
        let mut cx = Context::from_waker(&waker);

        loop {
            let mut slot = self.future.lock();
            let Some(future) = slot.as_mut() else {
                self.state.store(COMPLETE, Release);
                return;
            };

            if let Poll::Ready(()) = future.as_mut().poll(&mut cx) {
                *slot = None;
                drop(slot);

                self.state.store(COMPLETE, Release);
                tracing::trace!(task.id = %self.id, "task complete");
                trampoline::run_deferred(mark);
                return;
            }
            drop(slot);

            match self.state.compare_exchange(RUNNING, IDLE, AcqRel, Acquire) {
                Ok(_) => {
                    // From here on another thread may own the frame.
                    trampoline::run_deferred(mark);
                    return;
                }
                Err(NOTIFIED) => {
                    // Woken during the poll. Nobody else will resume us.
                    self.state.store(RUNNING, Release);
                }
                Err(actual) => unreachable!("unexpected frame state {actual}"),
            }
        }
    }

    fn schedule(self: &Arc<Self>) -> bool {
        let mut curr = self.state.load(Acquire);
        loop {
            let next = match curr {
                IDLE => RUNNING,
                RUNNING => NOTIFIED,
                _ => return false,
            };

            match self.state.compare_exchange(curr, next, AcqRel, Acquire) {
                Ok(_) => return next == RUNNING,
                Err(actual) => curr = actual,
            }
        }
    }
}

impl Wake for Frame {
    fn wake(self: Arc<Self>) {
        if self.schedule() {
            trampoline::resume(self);
        }
    }

    fn wake_by_ref(self: &Arc<Self>) {
        if self.schedule() {
            trampoline::resume(self.clone());
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("state", &self.state.load(Relaxed))
            .finish_non_exhaustive()
    }
}
