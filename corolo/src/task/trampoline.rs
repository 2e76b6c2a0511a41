//! Per-thread resume loop.
//!
//! Waking a frame resumes it on the waking thread. If that thread is already
//! polling a frame (a task completing and waking its awaiter, a waiter list
//! being flushed), the woken frame is queued instead and the outermost loop
//! picks it up once the current poll returns. Chains of completions therefore
//! run iteratively and never nest `poll` calls.
//!
//! Work that would let another thread resume a frame (handing its
//! continuation to a scheduler queue) is deferred until that frame has
//! suspended, so the frame is never woken while still being polled here.

use crate::task::frame::Frame;
use crate::utils::ScopeGuard;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::Arc;

struct Trampoline {
    draining: Cell<bool>,
    queue: RefCell<VecDeque<Arc<Frame>>>,
    deferred: RefCell<Vec<Box<dyn FnOnce()>>>,
}

thread_local! {
    static TRAMPOLINE: Trampoline = const {
        Trampoline {
            draining: Cell::new(false),
            queue: RefCell::new(VecDeque::new()),
            deferred: RefCell::new(Vec::new()),
        }
    };
}

impl Trampoline {
    fn drain(&self) {
        loop {
            // The borrow ends before `run`, which may push onto the queue.
            let Some(next) = self.queue.borrow_mut().pop_front() else {
                break;
            };
            next.run();
        }
    }
}

/// Resumes `frame` on the current thread, now or as soon as the current
/// resume loop gets to it.
pub(crate) fn resume(frame: Arc<Frame>) {
    TRAMPOLINE.with(|t| {
        t.queue.borrow_mut().push_back(frame);

        if t.draining.replace(true) {
            return;
        }

        let _guard = ScopeGuard::new(|| t.draining.set(false));
        t.drain();
    })
}

/// Polls `frame` immediately, even if the current thread is in the middle of
/// polling another frame. Anything it wakes is deferred until it suspends.
pub(crate) fn run_now(frame: &Arc<Frame>) {
    TRAMPOLINE.with(|t| {
        if t.draining.replace(true) {
            frame.run();
            return;
        }

        let _guard = ScopeGuard::new(|| t.draining.set(false));
        frame.run();
        t.drain();
    })
}

/// Runs `f` once the frame currently being polled has suspended, or right
/// away when called outside of a frame (e.g. from a foreign executor).
pub(crate) fn defer(f: impl FnOnce() + 'static) {
    TRAMPOLINE.with(|t| {
        if t.draining.get() {
            t.deferred.borrow_mut().push(Box::new(f));
        } else {
            f();
        }
    })
}

/// Number of deferred actions pending on this thread. A frame only runs the
/// actions pushed after the mark it took before polling.
pub(crate) fn deferred_mark() -> usize {
    TRAMPOLINE.with(|t| t.deferred.borrow().len())
}

/// Runs what the frame that just suspended deferred.
pub(crate) fn run_deferred(mark: usize) {
    let deferred = TRAMPOLINE.with(|t| {
        let mut deferred = t.deferred.borrow_mut();
        let mark = mark.min(deferred.len());
        deferred.split_off(mark)
    });

    for f in deferred {
        f();
    }
}

/// Whether the current thread is polling a task.
pub(crate) fn is_draining() -> bool {
    TRAMPOLINE.with(|t| t.draining.get())
}
