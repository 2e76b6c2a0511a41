//! Blocking cross-thread primitives used to hand results from the
//! asynchronous graph back to plain threads.

mod event;
pub use event::ManualResetEvent;

mod semaphore;
pub use semaphore::BinarySemaphore;
