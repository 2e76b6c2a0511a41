//! Fixed-size pool of worker threads.

use crate::runtime::{Builder, Continuation, PoolConfig, Schedule, ScheduleOp};
use crate::sync::ManualResetEvent;
use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::Arc;
use std::thread;

mod shared;
pub(crate) use shared::Shared;

mod worker;


/// A fixed set of worker threads resuming scheduled tasks.
///
/// Tasks hop onto the pool by awaiting [`schedule`](WorkerPool::schedule).
/// Workers pull continuations from one shared FIFO queue and park when it is
/// empty; there is no per-worker queue and no stealing.
///
/// Dropping the pool shuts it down: the workers finish what is already queued
/// and are joined.
///
/// ```
/// use corolo::Task;
/// use corolo::runtime::Schedule;
/// use corolo::runtime::pool::WorkerPool;
///
/// # fn main() -> anyhow::Result<()> {
/// let pool = WorkerPool::new(2)?;
/// let handle = pool.handle();
///
/// let task = Task::new(async move {
///     handle.schedule().await;
///     std::thread::current().name().map(str::to_owned)
/// });
///
/// let name = task.join().unwrap();
/// assert!(name.starts_with("corolo-worker-"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WorkerPool {
    handle: Handle,
    threads: Mutex<Vec<thread::JoinHandle<()>>>,
}

/// A cheap, clonable reference to a [`WorkerPool`]'s queue.
///
/// Handles don't keep the worker threads alive; scheduling through a handle
/// whose pool has shut down panics.
#[derive(Debug, Clone)]
pub struct Handle(Arc<Shared>);

impl WorkerPool {
    /// Starts a pool with `worker_threads` default-named workers.
    pub fn new(worker_threads: usize) -> Result<WorkerPool> {
        Builder::new().worker_threads(worker_threads).try_build()
    }

    pub fn builder() -> Builder {
        Builder::new()
    }

    pub(crate) fn from_config(cfg: PoolConfig) -> Result<WorkerPool> {
        let num_workers = cfg.worker_threads;
        let shared = Arc::new(Shared::new(cfg));
        let start = Arc::new(ManualResetEvent::new());

        let mut threads = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            match worker::spawn_worker_thread(shared.clone(), start.clone()) {
                Ok(handle) => threads.push(handle),
                Err(e) => {
                    shared.close();
                    start.set();
                    threads.into_iter().for_each(|t| {
                        let _ = t.join();
                    });
                    return Err(e);
                }
            }
        }

        tracing::info!(workers = num_workers, "worker pool started");
        start.set();

        Ok(WorkerPool {
            handle: Handle(shared),
            threads: Mutex::new(threads),
        })
    }

    /// Returns a handle tasks can schedule through.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    pub fn worker_threads(&self) -> usize {
        self.handle.cfg.worker_threads
    }

    /// Suspends the awaiting task and resumes it on a worker.
    pub fn schedule(&self) -> ScheduleOp<Handle> {
        self.handle.schedule()
    }

    /// Stops the pool and joins its workers.
    ///
    /// Workers drain what is already queued before exiting. A worker calling
    /// this (e.g. by dropping the last reference to the pool from inside a
    /// task) is not joined. Calling it more than once is fine.
    pub fn shutdown(&self) -> Result<()> {
        if self.handle.close() {
            tracing::debug!("shutting down worker pool");
        }

        let current = thread::current().id();
        let threads = std::mem::take(&mut *self.threads.lock());

        let mut panicked = 0;
        for handle in threads {
            if handle.thread().id() == current {
                tracing::debug!("worker pool shut down from one of its workers");
                continue;
            }

            let name = handle.thread().name().map(str::to_owned);
            if handle.join().is_err() {
                tracing::error!(worker = ?name, "worker thread panicked");
                panicked += 1;
            }
        }

        if !self.handle.injector.is_empty() {
            tracing::warn!(
                remaining = self.handle.injector.len(),
                "continuations left in the pool queue after shutdown"
            );
        }

        if panicked > 0 {
            return Err(anyhow!("{} worker thread(s) panicked", panicked));
        }

        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!(error = ?e, "error during worker pool shutdown");
        }
    }
}

impl Schedule for Handle {
    fn enqueue(&self, continuation: Continuation) {
        if let Err(continuation) = self.0.push(continuation) {
            tracing::debug!("worker pool shut down before the continuation was queued");
            continuation.close();
        }
    }

    fn is_shutdown(&self) -> bool {
        self.0.is_closed()
    }
}

impl Deref for Handle {
    type Target = Arc<Shared>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
