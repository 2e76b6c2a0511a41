use crate::sync::ManualResetEvent;
use crate::task::frame::Frame;
use crate::task::{Id, JoinError};
use futures::FutureExt;
use futures::future::CatchUnwind;
use parking_lot::Mutex;
use pin_project::pin_project;
use std::future::{Future, IntoFuture};
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;

/// Blocks the calling thread until `awaitable` completes and returns its
/// output. A panic in `awaitable` is re-raised here.
///
/// The future starts on the calling thread and runs up to its first
/// suspension point before this blocks. Anything it awaits must be resumed by
/// another thread (a [`WorkerPool`], a timer thread), otherwise this never
/// returns.
///
/// ```
/// use corolo::runtime::Schedule;
/// use corolo::runtime::pool::WorkerPool;
/// use corolo::{SharedTask, sync_wait};
///
/// # fn main() -> anyhow::Result<()> {
/// let pool = WorkerPool::new(1)?;
/// let handle = pool.handle();
///
/// let shared = SharedTask::new(async move {
///     handle.schedule().await;
///     String::from("hello")
/// });
///
/// assert_eq!(sync_wait(shared.clone()), "hello");
/// assert_eq!(sync_wait(shared), "hello");
/// # Ok(())
/// # }
/// ```
///
/// [`WorkerPool`]: crate::runtime::pool::WorkerPool
#[track_caller]
pub fn sync_wait<F>(awaitable: F) -> F::Output
where
    F: IntoFuture,
    F::IntoFuture: Send + 'static,
    F::Output: Send + 'static,
{
    try_sync_wait(awaitable).unwrap_or_else(|err| err.resume_unwind())
}

/// Like [`sync_wait`], but hands a panic back as a [`JoinError`].
pub fn try_sync_wait<F>(awaitable: F) -> Result<F::Output, JoinError>
where
    F: IntoFuture,
    F::IntoFuture: Send + 'static,
    F::Output: Send + 'static,
{
    let id = Id::next();
    let output = Arc::new(Mutex::new(None));
    let event = Arc::new(ManualResetEvent::new());

    let notify = Notify {
        future: AssertUnwindSafe(awaitable.into_future()).catch_unwind(),
        output: output.clone(),
        event: event.clone(),
    };

    tracing::trace!(task.id = %id, "sync wait started");
    Frame::new(id, Box::pin(notify)).start();
    event.wait();

    let res = output
        .lock()
        .take()
        .expect("sync_wait event set without an output");

    res.map_err(|payload| JoinError::panic(id, payload))
}

/// Stores the output of the awaited future, then sets the event.
#[pin_project]
struct Notify<F: Future> {
    #[pin]
    future: CatchUnwind<AssertUnwindSafe<F>>,
    output: Arc<Mutex<Option<thread::Result<F::Output>>>>,
    event: Arc<ManualResetEvent>,
}

impl<F: Future> Future for Notify<F> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.project();
        let res = std::task::ready!(this.future.poll(cx));

        *this.output.lock() = Some(res);
        this.event.set();
        Poll::Ready(())
    }
}
