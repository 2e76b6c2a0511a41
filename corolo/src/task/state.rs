use bitflags::bitflags;
use std::sync::atomic::{AtomicUsize, Ordering::*};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Snapshot: usize {
        /// The task body returned or panicked and its output slot is written.
        const COMPLETE = 1;

        /// A waker is registered in the continuation slot and owned by the
        /// completing side until the task completes.
        const CONTINUATION = 1 << 1;
    }
}

/// Completion handshake between a task body and the single party waiting on
/// its output.
///
/// Whoever clears `CONTINUATION` owns the continuation slot. Once `COMPLETE`
/// is set the bit can no longer be cleared, so the completing side can read
/// the slot without racing a writer.
pub(crate) struct State {
    val: AtomicUsize,
}

/// Outcome of registering a continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attach {
    /// The continuation will be woken on completion.
    Suspended,

    /// The task had already completed; the caller proceeds without waiting.
    ResumeInline,
}

/// Outcome of completing a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Notify {
    Continuation,
    Nobody,
}

impl State {
    pub(crate) fn new() -> Self {
        State {
            val: AtomicUsize::new(0),
        }
    }

    pub(crate) fn load(&self) -> Snapshot {
        Snapshot::from_bits_retain(self.val.load(Acquire))
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.load().is_complete()
    }

    /// Publishes the output. Must be called exactly once.
    pub(crate) fn transition_to_complete(&self) -> Notify {
        let prev = Snapshot::from_bits_retain(self.val.fetch_or(Snapshot::COMPLETE.bits(), AcqRel));
        debug_assert!(!prev.is_complete(), "task completed twice");

        if prev.has_continuation() {
            Notify::Continuation
        } else {
            Notify::Nobody
        }
    }

    /// Hands the continuation slot over to the completing side.
    pub(crate) fn set_continuation(&self) -> Attach {
        let prev =
            Snapshot::from_bits_retain(self.val.fetch_or(Snapshot::CONTINUATION.bits(), AcqRel));

        if prev.is_complete() {
            Attach::ResumeInline
        } else {
            Attach::Suspended
        }
    }

    /// Takes the continuation slot back. Fails once the task completed, in
    /// which case the completing side may be reading the slot.
    pub(crate) fn unset_continuation(&self) -> Result<Snapshot, Snapshot> {
        self.val
            .fetch_update(AcqRel, Acquire, |curr| {
                let curr = Snapshot::from_bits_retain(curr);
                if curr.is_complete() {
                    return None;
                }

                Some((curr - Snapshot::CONTINUATION).bits())
            })
            .map(Snapshot::from_bits_retain)
            .map_err(Snapshot::from_bits_retain)
    }
}

impl Snapshot {
    pub(crate) fn is_complete(self) -> bool {
        self.contains(Snapshot::COMPLETE)
    }

    pub(crate) fn has_continuation(self) -> bool {
        self.contains(Snapshot::CONTINUATION)
    }
}
