use crate::task::frame::Frame;
use crate::task::error::panic_payload_as_str;
use crate::task::{Finished, Id, SharedPanic};
use futures::FutureExt;
use futures::task::AtomicWaker;
use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering::*};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

/// A lazily started computation whose output can be awaited by any number of
/// handles.
///
/// Nothing runs until the first handle is awaited. That awaiter starts the
/// body inline; every other awaiter queues up and is woken, through the
/// resume trampoline, once the body completes. Each awaiter receives a clone
/// of the output.
///
/// Cloning a `SharedTask` adds a reference to the same computation. The
/// output is dropped exactly once, together with the last handle.
///
/// # Panics
///
/// A panic in the body is re-raised in every awaiter. String payloads are
/// re-raised as they are; anything else is handed out as a [`SharedPanic`]
/// referring to the original payload.
///
/// # Examples
///
/// ```
/// use corolo::{SharedTask, Task};
///
/// let shared = SharedTask::new(async { String::from("hello") });
/// assert!(!shared.is_ready());
///
/// let first = Task::new(shared.clone());
/// let second = Task::new(shared);
///
/// assert_eq!(first.join(), "hello");
/// assert_eq!(second.join(), "hello");
/// ```
pub struct SharedTask<T> {
    core: Arc<SharedCore<T>>,

    /// Our record in the waiter list, once this handle suspended on it.
    waiter: Option<Arc<Waiter>>,
}

/// `waiters` encodes the whole state machine:
///
/// - address of `frame`: not started, the frame is still in the slot;
/// - null: started, nobody waiting;
/// - address of the core: ready, `output` is written;
/// - anything else: head of the waiter list.
///
/// `repr(C)` keeps `waiters` and `frame` at distinct addresses inside the
/// allocation, neither of which can alias a heap allocated waiter.
#[repr(C)]
struct SharedCore<T> {
    waiters: AtomicPtr<Waiter>,
    frame: Mutex<Option<Arc<Frame>>>,
    output: UnsafeCell<Option<Result<T, SharedPanic>>>,
    id: Id,
}

// Safety: `output` is written once before the state is swapped to ready and
// only read through shared references afterwards.
unsafe impl<T: Send + Sync> Send for SharedCore<T> {}
unsafe impl<T: Send + Sync> Sync for SharedCore<T> {}

struct Waiter {
    waker: AtomicWaker,
    next: AtomicPtr<Waiter>,
}

impl<T: Send + Sync + 'static> SharedTask<T> {
    /// Wraps `future` without running it.
    pub fn new<F>(future: F) -> SharedTask<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let id = Id::next();

        let core = Arc::new_cyclic(|weak: &Weak<SharedCore<T>>| {
            let weak = weak.clone();
            let body = AssertUnwindSafe(future).catch_unwind().map(move |res| {
                let res = res.map_err(|payload| {
                    tracing::debug!(
                        task.id = %id,
                        message = ?panic_payload_as_str(&*payload),
                        "shared task body panicked"
                    );
                    SharedPanic::new(payload)
                });

                // All handles gone: nobody can observe the output.
                if let Some(core) = weak.upgrade() {
                    core.complete(res);
                }
            });

            SharedCore {
                waiters: AtomicPtr::new(ptr::null_mut()),
                frame: Mutex::new(Some(Frame::new(id, body.boxed()))),
                output: UnsafeCell::new(None),
                id,
            }
        });

        core.waiters.store(core.not_started(), Release);

        SharedTask { core, waiter: None }
    }
}

impl<T> SharedTask<T> {
    pub fn id(&self) -> Id {
        self.core.id
    }

    /// Returns `true` once the body completed and the output is available.
    pub fn is_ready(&self) -> bool {
        self.core.is_ready()
    }
}

impl<T> SharedCore<T> {
    fn ready(&self) -> *mut Waiter {
        ptr::from_ref(self).cast_mut().cast()
    }

    fn not_started(&self) -> *mut Waiter {
        ptr::from_ref(&self.frame).cast_mut().cast()
    }

    fn is_ready(&self) -> bool {
        self.waiters.load(Acquire) == self.ready()
    }

    /// Starts the body inline if nobody else did.
    fn try_start(&self) {
        let not_started = self.not_started();
        if self.waiters.load(Acquire) != not_started {
            return;
        }

        if self.waiters.compare_exchange(not_started, ptr::null_mut(), AcqRel, Acquire).is_ok() {
            let frame = self.frame.lock().take();
            if let Some(frame) = frame {
                frame.start();
            }
        }
    }

    /// Pushes `waiter` on the list. Returns `false` if the output is ready,
    /// in which case the caller must not suspend.
    fn try_enqueue(&self, waiter: &Arc<Waiter>) -> bool {
        let ready = self.ready();
        let node = Arc::into_raw(waiter.clone()).cast_mut();
        let mut head = self.waiters.load(Acquire);

        loop {
            if head == ready {
                // Safety: the node was never published.
                drop(unsafe { Arc::from_raw(node) });
                return false;
            }
            debug_assert_ne!(head, self.not_started(), "enqueue before start");

            waiter.next.store(head, Relaxed);
            match self.waiters.compare_exchange_weak(head, node, AcqRel, Acquire) {
                Ok(_) => return true,
                Err(actual) => head = actual,
            }
        }
    }

    fn complete(&self, res: Result<T, SharedPanic>) {
        // Safety: written once, before anybody can observe the ready state.
        unsafe {
            *self.output.get() = Some(res);
        }

        let mut head = self.waiters.swap(self.ready(), AcqRel);
        let mut woken = 0_usize;

        while !head.is_null() {
            // Safety: every list node was leaked with `Arc::into_raw` by
            // `try_enqueue`, and the swap above gave us the whole list.
            let waiter = unsafe { Arc::from_raw(head) };
            head = waiter.next.load(Acquire);
            waiter.waker.wake();
            woken += 1;
        }

        tracing::trace!(task.id = %self.id, woken, "shared task ready");
    }

    fn output(&self) -> T
    where
        T: Clone,
    {
        // Safety: only called after observing the ready state.
        match unsafe { &*self.output.get() } {
            Some(Ok(value)) => value.clone(),
            Some(Err(panic)) => panic.resume_unwind(),
            None => unreachable!("shared task {} ready without an output", self.id),
        }
    }
}

impl<T> Drop for SharedCore<T> {
    fn drop(&mut self) {
        let mut head = *self.waiters.get_mut();
        if head == self.ready() || head == self.not_started() {
            return;
        }

        // Awaiters that were dropped while suspended leave their records
        // behind.
        while !head.is_null() {
            // Safety: see `complete`, we are the last reference.
            let waiter = unsafe { Arc::from_raw(head) };
            head = waiter.next.load(Relaxed);
        }
    }
}

impl<T: Clone> Future for SharedTask<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();

        if this.core.is_ready() {
            return Poll::Ready(this.core.output());
        }

        if let Some(waiter) = &this.waiter {
            waiter.waker.register(cx.waker());

            // The list may have been flushed before the waker was replaced.
            if this.core.is_ready() {
                return Poll::Ready(this.core.output());
            }
            return Poll::Pending;
        }

        this.core.try_start();

        let waiter = Arc::new(Waiter {
            waker: AtomicWaker::new(),
            next: AtomicPtr::new(ptr::null_mut()),
        });
        waiter.waker.register(cx.waker());

        if !this.core.try_enqueue(&waiter) {
            return Poll::Ready(this.core.output());
        }

        this.waiter = Some(waiter);
        Poll::Pending
    }
}

impl<T> Clone for SharedTask<T> {
    fn clone(&self) -> Self {
        SharedTask {
            core: self.core.clone(),
            waiter: None,
        }
    }
}

impl<T> Finished for SharedTask<T> {
    fn is_finished(&self) -> bool {
        self.is_ready()
    }
}

impl<T> fmt::Debug for SharedTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTask")
            .field("id", &self.id())
            .field("ready", &self.is_ready())
            .finish()
    }
}
