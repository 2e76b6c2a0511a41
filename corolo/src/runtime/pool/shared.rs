use crate::runtime::{Continuation, PoolConfig};
#[cfg(test)]
use crate::utils::scheduler::Tracker;
use crossbeam_deque::Injector;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};

/// State shared by the pool handles and every worker.
#[derive(Debug)]
pub struct Shared {
    pub(crate) cfg: PoolConfig,

    /// FIFO queue of continuations waiting for a worker.
    pub(crate) injector: Injector<Continuation>,

    shutdown: AtomicBool,

    /// LIFO collection of parked workers. We unpark the most recently parked
    /// worker first as its CPU cache is the hottest.
    parked_threads: Mutex<VecDeque<Parked>>,

    #[cfg(test)]
    pub(crate) tracker: Tracker,
}

#[derive(Debug)]
struct Parked {
    thread: Thread,
    should_unpark: Arc<AtomicBool>,
}

impl Parked {
    fn unpark(self) {
        self.should_unpark.store(true, Ordering::Release);
        self.thread.unpark();
    }
}

impl Shared {
    pub(crate) fn new(cfg: PoolConfig) -> Self {
        Self {
            parked_threads: Mutex::new(VecDeque::with_capacity(cfg.worker_threads)),
            cfg,
            injector: Injector::new(),
            shutdown: AtomicBool::new(false),

            #[cfg(test)]
            tracker: Tracker::new(),
        }
    }

    /// Queues `continuation` and wakes one parked worker. Hands it back once
    /// the pool is closed.
    pub(crate) fn push(&self, continuation: Continuation) -> Result<(), Continuation> {
        let parked = {
            let mut parked_threads = self.parked_threads.lock();

            // `close` flips the flag under this lock, so everything pushed
            // here is visible to a worker that saw the flag.
            if self.shutdown.load(Ordering::Acquire) {
                return Err(continuation);
            }

            #[cfg(test)]
            self.tracker.record_enqueue();

            self.injector.push(continuation);
            parked_threads.pop_back()
        };

        if let Some(parked) = parked {
            parked.unpark();
        }

        Ok(())
    }

    /// Stops accepting work and wakes every parked worker so it can drain the
    /// queue and exit. Returns `false` if the pool was already closed.
    pub(crate) fn close(&self) -> bool {
        let mut parked_threads = self.parked_threads.lock();
        let newly_closed = !self.shutdown.swap(true, Ordering::AcqRel);

        parked_threads.drain(..).for_each(Parked::unpark);
        newly_closed
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Parks the current worker until the pool hands it new work or shuts
    /// down.
    pub(crate) fn park_current_thread(&self, should_unpark: &Arc<AtomicBool>) {
        {
            let mut parked_threads = self.parked_threads.lock();

            // Checked *while holding the lock*: producers push and pick a
            // worker to unpark under it.
            if !self.injector.is_empty() || self.shutdown.load(Ordering::Acquire) {
                return;
            }

            should_unpark.store(false, Ordering::Release);
            parked_threads.push_back(Parked {
                thread: thread::current(),
                should_unpark: Arc::clone(should_unpark),
            });
        }

        tracing::trace!("parking worker");

        // Spurious wakeups are possible, as per the `thread::park` docs.
        while !should_unpark.load(Ordering::Acquire) {
            thread::park();
        }

        tracing::trace!("worker unparked");
    }

    #[cfg(test)]
    pub(crate) fn num_parked(&self) -> usize {
        self.parked_threads.lock().len()
    }
}
