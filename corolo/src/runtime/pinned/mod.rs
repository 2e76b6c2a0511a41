//! A queue drained by a single thread.

use crate::runtime::{Continuation, Schedule};
use crate::task::{Finished, trampoline};
#[cfg(test)]
use crate::utils::scheduler::{Call, Method, Tracker};
use crate::utils::ScopeGuard;
use crossbeam_queue::SegQueue;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread, ThreadId};
use std::time::Duration;

#[cfg(test)]
mod tests;

/// How long an idle pump parks before re-checking its exit condition.
const DEFAULT_PARK_TIMEOUT: Duration = Duration::from_micros(100);

/// A queue whose tasks only ever resume on the thread that created it.
///
/// Any thread can schedule onto the queue. The owner thread resumes queued
/// tasks while it [pumps](PinnedQueue::pump), which makes this the place for
/// work that must stay on one thread (e.g. a renderer or a non-`Send` API
/// hidden behind the owner thread).
///
/// ```
/// use corolo::Task;
/// use corolo::runtime::Schedule;
/// use corolo::runtime::pinned::PinnedQueue;
///
/// let queue = PinnedQueue::new();
/// let task = Task::new({
///     let queue = queue.clone();
///     async move {
///         queue.schedule().await;
///         std::thread::current().id()
///     }
/// });
///
/// // Nothing resumes the task until the owner pumps.
/// assert!(!task.is_finished());
/// queue.pump(&task);
/// assert_eq!(task.join(), std::thread::current().id());
/// ```
#[derive(Clone)]
pub struct PinnedQueue {
    inner: Arc<Inner>,
}

struct Inner {
    owner: Thread,
    queue: SegQueue<Continuation>,
    pumping: AtomicBool,
    park_timeout: Duration,

    #[cfg(test)]
    tracker: Tracker,
}

impl Default for PinnedQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PinnedQueue {
    /// Creates a queue owned by the calling thread.
    pub fn new() -> PinnedQueue {
        Self::with_park_timeout(DEFAULT_PARK_TIMEOUT)
    }

    /// Creates a queue owned by the calling thread whose pump parks at most
    /// `park_timeout` at a time while idle.
    pub fn with_park_timeout(park_timeout: Duration) -> PinnedQueue {
        PinnedQueue {
            inner: Arc::new(Inner {
                owner: thread::current(),
                queue: SegQueue::new(),
                pumping: AtomicBool::new(false),
                park_timeout,

                #[cfg(test)]
                tracker: Tracker::new(),
            }),
        }
    }

    pub fn owner(&self) -> ThreadId {
        self.inner.owner.id()
    }

    pub fn is_owner(&self) -> bool {
        thread::current().id() == self.owner()
    }

    /// Number of tasks waiting for the owner to pump.
    pub fn len(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.is_empty()
    }

    /// Resumes queued tasks on the owner thread until `until` is finished,
    /// parking while the queue is empty. Returns the number of tasks resumed.
    ///
    /// # Panics
    ///
    /// Panics when called from a thread other than the owner, from inside a
    /// running task, or from inside another pump.
    #[track_caller]
    pub fn pump<F: Finished + ?Sized>(&self, until: &F) -> usize {
        let _pumping = self.enter_pump();
        tracing::trace!(queued = self.len(), "pump started");

        let mut resumed = 0;
        while !until.is_finished() {
            match self.inner.queue.pop() {
                Some(continuation) => {
                    self.resume(continuation);
                    resumed += 1;
                }
                None => thread::park_timeout(self.inner.park_timeout),
            }
        }

        self.finish_pump(resumed)
    }

    /// Resumes whatever is queued right now, without blocking. Tasks queued
    /// while draining are left for the next pump.
    #[track_caller]
    pub fn pump_pending(&self) -> usize {
        let _pumping = self.enter_pump();

        let mut resumed = 0;
        for _ in 0..self.len() {
            let Some(continuation) = self.inner.queue.pop() else {
                break;
            };

            self.resume(continuation);
            resumed += 1;
        }

        self.finish_pump(resumed)
    }

    #[track_caller]
    fn enter_pump(&self) -> ScopeGuard<impl FnOnce() + '_> {
        let current = thread::current().id();
        assert!(
            current == self.owner(),
            "PinnedQueue pumped from {:?} but owned by {:?}",
            current,
            self.owner()
        );
        assert!(
            !trampoline::is_draining(),
            "PinnedQueue pumped from inside a running task"
        );
        assert!(
            !self.inner.pumping.swap(true, Ordering::AcqRel),
            "PinnedQueue pumped re-entrantly"
        );

        ScopeGuard::new(|| self.inner.pumping.store(false, Ordering::Release))
    }

    fn resume(&self, continuation: Continuation) {
        #[cfg(test)]
        self.inner.tracker.record_resume(true);

        continuation.resume();
    }

    fn finish_pump(&self, resumed: usize) -> usize {
        #[cfg(test)]
        self.inner
            .tracker
            .record(Method::Pump, Call::Pump { resumed });

        tracing::trace!(resumed, "pump finished");
        resumed
    }
}

impl Schedule for PinnedQueue {
    fn enqueue(&self, continuation: Continuation) {
        #[cfg(test)]
        self.inner.tracker.record_enqueue();

        self.inner.queue.push(continuation);
        self.inner.owner.unpark();
    }
}

impl fmt::Debug for PinnedQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedQueue")
            .field("owner", &self.owner())
            .field("queued", &self.len())
            .field("park_timeout", &self.inner.park_timeout)
            .finish()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if !self.queue.is_empty() {
            tracing::warn!(
                remaining = self.queue.len(),
                "pinned queue dropped with tasks that were never resumed"
            );
        }
    }
}
