use crate::runtime::pool::WorkerPool;
use anyhow::Result;
use std::convert::TryFrom;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[derive(Clone)]
pub(crate) struct ThreadNameFn(pub(crate) Arc<dyn Fn() -> String + Send + Sync + 'static>);

fn default_thread_name_fn() -> ThreadNameFn {
    let worker_count = Arc::new(AtomicUsize::new(0));

    ThreadNameFn(Arc::new(move || {
        let id = worker_count.fetch_add(1, Ordering::Relaxed);
        format!("corolo-worker-{}", id)
    }))
}

impl fmt::Debug for ThreadNameFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ThreadNameFn").field(&"<function>").finish()
    }
}

/// Configures and builds a [`WorkerPool`].
///
/// ```
/// use corolo::runtime::Builder;
///
/// # fn main() -> anyhow::Result<()> {
/// let pool = Builder::new()
///     .worker_threads(2)
///     .thread_name("render")
///     .try_build()?;
///
/// assert_eq!(pool.worker_threads(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Builder {
    /// The number of worker threads. Defaults to 1 per core.
    worker_threads: Option<usize>,

    /// Name fn used for threads spawned by the pool.
    thread_name: ThreadNameFn,

    /// Stack size used for threads spawned by the pool.
    thread_stack_size: Option<usize>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            worker_threads: None,
            thread_name: default_thread_name_fn(),
            thread_stack_size: None,
        }
    }

    /// The number of worker threads resuming scheduled tasks.
    ///
    /// Defaults to 1 worker per CPU core.
    #[track_caller]
    pub fn worker_threads(mut self, val: usize) -> Self {
        assert!(val > 0, "worker_threads must be greater than 0");
        self.worker_threads = Some(val);
        self
    }

    /// Sets the name of every thread spawned by the pool.
    ///
    /// The default name is "corolo-worker-{id}", where id is monotonically
    /// increasing.
    pub fn thread_name(mut self, val: impl Into<String>) -> Self {
        let val = val.into();
        self.thread_name = ThreadNameFn(Arc::new(move || val.clone()));
        self
    }

    /// Sets a function used to generate the name of threads spawned by the
    /// pool.
    pub fn thread_name_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.thread_name = ThreadNameFn(Arc::new(f));
        self
    }

    /// Sets the stack size (in bytes) for worker threads.
    ///
    /// The actual stack size may be greater than this value if the platform
    /// specifies minimal stack size.
    #[track_caller]
    pub fn thread_stack_size(mut self, val: usize) -> Self {
        assert!(
            val.is_power_of_two(),
            "thread_stack_size must be a power of two"
        );
        self.thread_stack_size = Some(val);
        self
    }

    /// Spawns the worker threads. They are running once this returns.
    pub fn try_build(self) -> Result<WorkerPool> {
        let cfg = self.try_into()?;
        WorkerPool::from_config(cfg)
    }
}

/// Validated [`Builder`] settings, shared with every worker.
#[derive(Debug, Clone)]
pub(crate) struct PoolConfig {
    pub(crate) worker_threads: usize,
    pub(crate) thread_name: ThreadNameFn,
    pub(crate) thread_stack_size: Option<usize>,
}

impl TryFrom<Builder> for PoolConfig {
    type Error = anyhow::Error;

    fn try_from(builder: Builder) -> Result<Self, Self::Error> {
        let worker_threads = match builder.worker_threads {
            Some(n) => n,
            None => thread::available_parallelism()?.get(),
        };

        Ok(PoolConfig {
            worker_threads,
            thread_name: builder.thread_name,
            thread_stack_size: builder.thread_stack_size,
        })
    }
}
