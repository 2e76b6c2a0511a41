use crate::task::Id;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Error returned when retrieving the output of a task whose body panicked.
///
/// The panic is captured where it happens and handed to whoever retrieves the
/// result. The non-`try` retrieval paths (`.await`, [`Task::join`],
/// [`sync_wait`]) re-raise it with [`std::panic::resume_unwind`] instead of
/// returning this error.
///
/// [`Task::join`]: crate::task::Task::join
/// [`sync_wait`]: crate::sync_wait
#[derive(thiserror::Error)]
#[error("task {id} panicked with message {message:?}")]
pub struct JoinError {
    id: Id,
    message: Option<String>,
    repr: Repr,
}

enum Repr {
    Panic(Box<dyn Any + Send + 'static>),
}

impl JoinError {
    pub(crate) fn panic(id: Id, payload: Box<dyn Any + Send + 'static>) -> JoinError {
        JoinError {
            id,
            message: panic_payload_as_str(&*payload).map(str::to_owned),
            repr: Repr::Panic(payload),
        }
    }

    /// Returns true if the error was caused by the task panicking.
    pub fn is_panic(&self) -> bool {
        matches!(&self.repr, Repr::Panic(_))
    }

    /// Returns the [`Id`] of the task that produced this error.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Best-effort view of the panic message, if the payload was a string.
    pub fn panic_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Consumes the join error, returning the object with which the task
    /// panicked.
    ///
    /// # Panics
    ///
    /// `into_panic()` panics if the `Error` does not represent the underlying
    /// task terminating with a panic. Use `is_panic` to check the error reason
    /// or `try_into_panic` for a variant that does not panic.
    #[track_caller]
    pub fn into_panic(self) -> Box<dyn Any + Send + 'static> {
        self.try_into_panic()
            .expect("`JoinError` reason is not a panic.")
    }

    /// Consumes the join error, returning the object with which the task
    /// panicked if the task terminated due to a panic. Otherwise, `self` is
    /// returned.
    pub fn try_into_panic(self) -> Result<Box<dyn Any + Send + 'static>, JoinError> {
        match self.repr {
            Repr::Panic(payload) => Ok(payload),
        }
    }

    /// Re-raises the captured panic on the calling thread.
    pub(crate) fn resume_unwind(self) -> ! {
        std::panic::resume_unwind(self.into_panic())
    }
}

impl fmt::Debug for JoinError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.repr, &self.message) {
            (Repr::Panic(_), Some(msg)) => {
                write!(fmt, "JoinError::Panic({:?}, {:?}, ...)", self.id, msg)
            }
            (Repr::Panic(_), None) => write!(fmt, "JoinError::Panic({:?}, ...)", self.id),
        }
    }
}

/// Panic payload re-raised by the awaiters of a [`SharedTask`] whose body
/// panicked with something other than a string.
///
/// Every awaiter receives a handle to the one payload the body panicked with.
/// String payloads are re-raised as their own type instead.
///
/// ```
/// use corolo::task::SharedPanic;
/// use corolo::{SharedTask, Task};
///
/// #[derive(Debug, PartialEq)]
/// struct Code(u32);
///
/// let shared: SharedTask<()> = SharedTask::new(async { std::panic::panic_any(Code(7)) });
/// let err = Task::new(shared).try_join().unwrap_err();
///
/// let payload = err.into_panic();
/// let panic = payload.downcast_ref::<SharedPanic>().unwrap();
/// assert_eq!(*panic.downcast_ref::<Code>().unwrap(), Code(7));
/// ```
///
/// [`SharedTask`]: crate::task::SharedTask
#[derive(Clone)]
pub struct SharedPanic {
    payload: Arc<Mutex<Box<dyn Any + Send + 'static>>>,
}

impl SharedPanic {
    pub(crate) fn new(payload: Box<dyn Any + Send + 'static>) -> SharedPanic {
        SharedPanic {
            payload: Arc::new(Mutex::new(payload)),
        }
    }

    /// Returns `true` if the body panicked with a `T`.
    pub fn is<T: Any>(&self) -> bool {
        (**self.payload.lock()).is::<T>()
    }

    /// Borrows the original payload as a `T`. The payload stays locked, for
    /// every awaiter, until the guard is dropped.
    pub fn downcast_ref<T: Any>(&self) -> Option<MappedMutexGuard<'_, T>> {
        MutexGuard::try_map(self.payload.lock(), |payload| {
            (**payload).downcast_mut::<T>()
        })
        .ok()
    }

    /// Re-raises the panic in one awaiter.
    pub(crate) fn resume_unwind(&self) -> ! {
        let replay: Box<dyn Any + Send + 'static> = {
            let payload = self.payload.lock();
            if let Some(s) = (**payload).downcast_ref::<&'static str>() {
                Box::new(*s)
            } else if let Some(s) = (**payload).downcast_ref::<String>() {
                Box::new(s.clone())
            } else {
                Box::new(self.clone())
            }
        };

        std::panic::resume_unwind(replay)
    }
}

impl fmt::Debug for SharedPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPanic").finish_non_exhaustive()
    }
}

pub(crate) fn panic_payload_as_str(payload: &(dyn Any + Send)) -> Option<&str> {
    if let Some(s) = payload.downcast_ref::<String>() {
        return Some(s);
    }

    if let Some(s) = payload.downcast_ref::<&'static str>() {
        return Some(s);
    }

    None
}
