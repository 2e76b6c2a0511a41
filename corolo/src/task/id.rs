use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::{fmt, num::NonZeroU64};

/// An opaque ID that uniquely identifies a task relative to all other tasks
/// created by this process.
///
/// # Notes
///
/// - Task IDs are never re-used.
/// - The ID of the task currently being polled can be obtained from inside the
///   task with [`task::id()`](crate::task::id()) or
///   [`task::try_id()`](crate::task::try_id()), and from outside with
///   [`Task::id()`](crate::task::Task::id()).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct Id(pub(crate) NonZeroU64);

thread_local! {
    static CURRENT_TASK_ID: Cell<Option<Id>> = const { Cell::new(None) };
}

/// Returns the [`Id`] of the currently running task.
///
/// # Panics
///
/// This function panics if called from outside a task. For a version of this
/// function that doesn't panic, see [`task::try_id()`](crate::task::try_id()).
#[track_caller]
pub fn id() -> Id {
    try_id().expect("can't get a task id when not inside a task")
}

/// Returns the [`Id`] of the currently running task, or `None` if called
/// outside of a task.
pub fn try_id() -> Option<Id> {
    CURRENT_TASK_ID.with(Cell::get)
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Id {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);

        let id = COUNTER.fetch_add(1, Ordering::Relaxed);

        // Even creating 1 billion tasks/sec it would take 584 years to wrap
        // around.
        let Some(id) = NonZeroU64::new(id) else {
            Self::exhausted();
        };

        Self(id)
    }

    #[cold]
    fn exhausted() -> ! {
        panic!("failed to generate unique task ID: bitspace exhausted")
    }

    pub fn as_u64(&self) -> u64 {
        self.0.get()
    }
}

/// Sets the current task id for the duration of a poll, restoring the id of
/// the enclosing task on drop. Frames are polled re-entrantly when a task is
/// constructed from inside another task.
pub(super) struct TaskIdGuard {
    parent_task_id: Option<Id>,
}

impl TaskIdGuard {
    pub(super) fn enter(id: Id) -> Self {
        TaskIdGuard {
            parent_task_id: CURRENT_TASK_ID.with(|cell| cell.replace(Some(id))),
        }
    }
}

impl Drop for TaskIdGuard {
    fn drop(&mut self) {
        CURRENT_TASK_ID.with(|cell| cell.set(self.parent_task_id));
    }
}
