use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared counters for every [`Counted`] value cloned from the same origin.
#[derive(Debug, Default)]
pub(crate) struct DropStats {
    clones: AtomicUsize,
    drops: AtomicUsize,
}

impl DropStats {
    pub(crate) fn clones(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }

    pub(crate) fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

/// A value that counts its clones and drops, to check how many times a task
/// output gets copied and that it is destroyed exactly once.
#[derive(Debug)]
pub(crate) struct Counted {
    pub(crate) value: u64,
    stats: Arc<DropStats>,
}

impl Counted {
    pub(crate) fn new(value: u64) -> (Counted, Arc<DropStats>) {
        let stats = Arc::new(DropStats::default());
        (
            Counted {
                value,
                stats: stats.clone(),
            },
            stats,
        )
    }
}

impl Clone for Counted {
    fn clone(&self) -> Self {
        self.stats.clones.fetch_add(1, Ordering::SeqCst);
        Counted {
            value: self.value,
            stats: self.stats.clone(),
        }
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.stats.drops.fetch_add(1, Ordering::SeqCst);
    }
}
