/// Runs a closure when it goes out of scope, whether the scope is left by a
/// normal return, an early return or a panic.
///
/// Used to restore per-thread flags (trampoline draining, pump in progress)
/// even when a resumed task unwinds through them.
///
/// ```ignore
/// let flag = Cell::new(true);
/// {
///     let _guard = ScopeGuard::new(|| flag.set(false));
///     assert!(flag.get());
/// }
/// assert!(!flag.get());
/// ```
pub(crate) struct ScopeGuard<F: FnOnce()> {
    // Taken on drop or disarm so the closure runs at most once.
    closure: Option<F>,
}

impl<F: FnOnce()> ScopeGuard<F> {
    pub(crate) fn new(closure: F) -> Self {
        ScopeGuard {
            closure: Some(closure),
        }
    }

    /// Prevents the closure from running on drop.
    #[allow(unused)]
    pub(crate) fn disarm(&mut self) {
        self.closure.take();
    }
}

impl<F: FnOnce()> Drop for ScopeGuard<F> {
    fn drop(&mut self) {
        if let Some(closure) = self.closure.take() {
            closure();
        }
    }
}
