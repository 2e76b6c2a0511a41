use crate::runtime::pool::Shared;
use crate::sync::ManualResetEvent;
use anyhow::{Context, Result};
use crossbeam_deque::Steal;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;

/// One pool thread: resumes continuations in FIFO order and parks when the
/// queue is empty.
#[derive(Debug)]
pub(crate) struct Worker {
    shared: Arc<Shared>,

    /// Set by whoever unparks us. Guards against spurious wakeups.
    should_unpark: Arc<AtomicBool>,
}

impl Worker {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            should_unpark: Arc::new(AtomicBool::new(false)),
        }
    }

    fn run(&self) {
        loop {
            match self.shared.injector.steal() {
                Steal::Success(continuation) => {
                    #[cfg(test)]
                    self.shared.tracker.record_resume(false);

                    continuation.resume();
                }
                Steal::Retry => continue,
                Steal::Empty => {
                    // Only exit once the queue is drained. Pushes that won the
                    // race against `close` are visible after seeing the flag.
                    if self.shared.is_closed() {
                        if self.shared.injector.is_empty() {
                            break;
                        }
                        continue;
                    }

                    self.shared.park_current_thread(&self.should_unpark);
                }
            }
        }
    }
}

/// Spawns one worker thread. It waits on `start` before resuming anything.
pub(super) fn spawn_worker_thread(
    shared: Arc<Shared>,
    start: Arc<ManualResetEvent>,
) -> Result<thread::JoinHandle<()>> {
    let name = (shared.cfg.thread_name.0)();
    let mut builder = thread::Builder::new().name(name.clone());

    if let Some(stack_size) = shared.cfg.thread_stack_size {
        builder = builder.stack_size(stack_size);
    }

    builder
        .spawn(move || {
            start.wait();
            tracing::debug!("worker started");

            Worker::new(shared).run();
            tracing::debug!("worker stopped");
        })
        .with_context(|| format!("failed to spawn worker thread {name:?}"))
}
