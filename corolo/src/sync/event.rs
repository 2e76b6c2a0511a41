use crate::task::Finished;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A latched boolean that lets plain threads block until some other thread
/// signals it.
///
/// Once [`set`] has been called every current and future call to [`wait`]
/// returns immediately, until the event is explicitly [`reset`]. The event
/// never resets itself.
///
/// ```
/// use corolo::sync::ManualResetEvent;
/// use std::sync::Arc;
///
/// let event = Arc::new(ManualResetEvent::new());
/// let remote = Arc::clone(&event);
///
/// let handle = std::thread::spawn(move || remote.set());
/// event.wait();
/// assert!(event.is_set());
/// handle.join().unwrap();
/// ```
///
/// [`set`]: ManualResetEvent::set
/// [`wait`]: ManualResetEvent::wait
/// [`reset`]: ManualResetEvent::reset
#[derive(Debug, Default)]
pub struct ManualResetEvent {
    // Fast path so that waiting on an already set event never touches the lock.
    is_set: AtomicBool,

    lock: Mutex<()>,

    cond: Condvar,
}

impl ManualResetEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an event that is already signalled.
    pub fn new_set() -> Self {
        Self {
            is_set: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn is_set(&self) -> bool {
        self.is_set.load(Ordering::Acquire)
    }

    /// Signals the event and releases every waiting thread. Idempotent.
    pub fn set(&self) {
        // Publishing the flag while holding the lock closes the window between
        // a waiter's check and its call to `Condvar::wait`.
        let _guard = self.lock.lock();
        self.is_set.store(true, Ordering::Release);
        self.cond.notify_all();
    }

    /// Puts the event back in the non-signalled state.
    pub fn reset(&self) {
        self.is_set.store(false, Ordering::Relaxed);
    }

    /// Blocks the calling thread until the event is set.
    pub fn wait(&self) {
        if self.is_set() {
            return;
        }

        let mut guard = self.lock.lock();
        while !self.is_set() {
            self.cond.wait(&mut guard);
        }
    }

    /// Blocks for at most `timeout`. Returns whether the event was set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_set() {
            return true;
        }

        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();

        while !self.is_set() {
            if self.cond.wait_until(&mut guard, deadline).timed_out() {
                return self.is_set();
            }
        }

        true
    }
}

impl Finished for ManualResetEvent {
    fn is_finished(&self) -> bool {
        self.is_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;
    use std::sync::Arc;
    use std::thread;

    assert_impl_all!(ManualResetEvent: Send, Sync);

    #[test]
    fn test_wait_after_set_returns_immediately() {
        let event = ManualResetEvent::new();
        event.set();
        event.set();

        event.wait();
        assert!(event.is_set());
        assert!(event.wait_timeout(Duration::ZERO));
    }

    #[test]
    fn test_new_set() {
        let event = ManualResetEvent::new_set();
        assert!(event.is_finished());
        event.wait();
    }

    #[test]
    fn test_reset() {
        let event = ManualResetEvent::new_set();
        event.reset();

        assert!(!event.is_set());
        assert!(!event.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn test_set_releases_all_waiters() {
        let event = Arc::new(ManualResetEvent::new());

        let waiters = (0..4)
            .map(|_| {
                let event = Arc::clone(&event);
                thread::spawn(move || {
                    event.wait();
                    event.is_set()
                })
            })
            .collect::<Vec<_>>();

        thread::sleep(Duration::from_millis(10));
        event.set();

        for waiter in waiters {
            assert!(waiter.join().unwrap());
        }
    }

    #[test]
    fn test_wait_timeout_observes_late_set() {
        let event = Arc::new(ManualResetEvent::new());
        let remote = Arc::clone(&event);

        let setter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            remote.set();
        });

        assert!(event.wait_timeout(Duration::from_secs(10)));
        setter.join().unwrap();
    }
}
