use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// A latch futures can wait on, opened by hand from the test body. Lets tests
/// suspend tasks without involving a scheduler.
#[derive(Debug, Clone, Default)]
pub(crate) struct Gate {
    inner: Arc<Mutex<GateState>>,
}

#[derive(Debug, Default)]
struct GateState {
    open: bool,
    wakers: Vec<Waker>,
}

impl Gate {
    pub(crate) fn new() -> Gate {
        Gate::default()
    }

    /// Opens the gate, waking every waiter on the calling thread.
    pub(crate) fn open(&self) {
        let wakers = {
            let mut state = self.inner.lock();
            state.open = true;
            std::mem::take(&mut state.wakers)
        };

        wakers.into_iter().for_each(Waker::wake);
    }

    pub(crate) fn num_waiters(&self) -> usize {
        self.inner.lock().wakers.len()
    }

    pub(crate) fn wait(&self) -> GateWait {
        GateWait { gate: self.clone() }
    }
}

pub(crate) struct GateWait {
    gate: Gate,
}

impl Future for GateWait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.gate.inner.lock();
        if state.open {
            return Poll::Ready(());
        }

        state.wakers.push(cx.waker().clone());
        Poll::Pending
    }
}

/// Returns `Pending` once, waking itself immediately.
#[derive(Debug, Default)]
pub(crate) struct YieldOnce {
    yielded: bool,
}

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
