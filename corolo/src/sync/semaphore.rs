use parking_lot::{Condvar, Mutex};

/// A semaphore with a single permit.
///
/// Used by [`JoinableTask`] so a plain thread can block on completion without
/// installing a continuation.
///
/// [`JoinableTask`]: crate::task::JoinableTask
#[derive(Debug, Default)]
pub struct BinarySemaphore {
    available: Mutex<bool>,
    cond: Condvar,
}

impl BinarySemaphore {
    pub fn new(available: bool) -> Self {
        Self {
            available: Mutex::new(available),
            cond: Condvar::new(),
        }
    }

    /// Makes the permit available, waking one blocked acquirer.
    pub fn release(&self) {
        let mut available = self.available.lock();
        *available = true;
        self.cond.notify_one();
    }

    /// Blocks until the permit is available and takes it.
    pub fn acquire(&self) {
        let mut available = self.available.lock();
        while !*available {
            self.cond.wait(&mut available);
        }
        *available = false;
    }

    pub fn try_acquire(&self) -> bool {
        std::mem::replace(&mut *self.available.lock(), false)
    }
}
