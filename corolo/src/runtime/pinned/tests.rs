use super::*;
use crate::runtime::pool::WorkerPool;
use crate::sync::ManualResetEvent;
use crate::task::Task;
use crate::test_utils::*;
use anyhow::Result;
use static_assertions::assert_impl_all;
use std::panic::{self, AssertUnwindSafe};

assert_impl_all!(PinnedQueue: Send, Sync, Clone, Schedule);

fn hop(queue: &PinnedQueue) -> Task<ThreadId> {
    let queue = queue.clone();
    Task::new(async move {
        queue.schedule().await;
        thread::current().id()
    })
}

#[test]
fn test_resumes_only_while_pumping() {
    init_tracing();

    let queue = PinnedQueue::new();
    let task = hop(&queue);

    thread::sleep(Duration::from_millis(5));
    assert!(!task.is_finished());
    assert_eq!(queue.len(), 1);

    assert_eq!(queue.pump(&task), 1);
    assert!(queue.is_empty());
    assert_eq!(task.join(), thread::current().id());

    let calls = queue.inner.tracker.get_calls(&Method::Resume);
    assert_eq!(
        calls,
        vec![Call::Resume {
            thread: thread::current().id(),
            pumping: true
        }]
    );
    assert_eq!(
        queue.inner.tracker.get_calls(&Method::Pump),
        vec![Call::Pump { resumed: 1 }]
    );
}

#[test]
fn test_enqueue_from_another_thread() {
    let queue = PinnedQueue::new();
    let owner = thread::current().id();

    let task = thread::spawn({
        let queue = queue.clone();
        move || hop(&queue)
    })
    .join()
    .unwrap();

    queue.pump(&task);
    assert_eq!(task.join(), owner);

    let enqueues = queue.inner.tracker.get_calls(&Method::Enqueue);
    assert_eq!(enqueues.len(), 1);
    assert_ne!(enqueues[0].thread(), Some(owner));
}

#[test]
fn test_pool_pinned_pool_round_trip() -> Result<()> {
    let pool = WorkerPool::new(2)?;
    let queue = PinnedQueue::new();
    let owner = thread::current().id();

    let task = Task::new({
        let handle = pool.handle();
        let queue = queue.clone();
        async move {
            handle.schedule().await;
            let first = thread::current().id();
            queue.schedule().await;
            let pinned = thread::current().id();
            handle.schedule().await;
            (first, pinned, thread::current().id())
        }
    });

    queue.pump(&task);
    let (first, pinned, last) = task.join();

    assert_ne!(first, owner);
    assert_eq!(pinned, owner);
    assert_ne!(last, owner);
    Ok(())
}

#[test]
fn test_pump_from_other_thread_panics() {
    let queue = PinnedQueue::new();

    let res = thread::spawn(move || queue.pump_pending()).join();
    let err = res.unwrap_err();
    let msg = err.downcast_ref::<String>().unwrap();
    assert!(msg.contains("but owned by"));
}

#[test]
fn test_pump_inside_task_panics() {
    let queue = PinnedQueue::new();

    let task = Task::new({
        let queue = queue.clone();
        async move { queue.pump_pending() }
    });

    let err = task.try_join().unwrap_err();
    assert!(err.panic_message().unwrap().contains("inside a running task"));
    assert!(!queue.inner.pumping.load(Ordering::Acquire));
}

/// Pumps again from its exit condition.
struct Reentrant(PinnedQueue);

impl Finished for Reentrant {
    fn is_finished(&self) -> bool {
        self.0.pump_pending();
        true
    }
}

#[test]
fn test_reentrant_pump_panics() {
    let queue = PinnedQueue::new();

    let res = panic::catch_unwind(AssertUnwindSafe(|| {
        queue.pump(&Reentrant(queue.clone()));
    }));
    assert!(res.is_err());

    // The guard reset the flag on the way out.
    assert!(!queue.inner.pumping.load(Ordering::Acquire));
    assert_eq!(queue.pump_pending(), 0);
}

#[test]
fn test_pump_pending_does_not_block() {
    let queue = PinnedQueue::new();
    assert_eq!(queue.pump_pending(), 0);

    let tasks = (0..3).map(|_| hop(&queue)).collect::<Vec<_>>();
    assert_eq!(queue.pump_pending(), 3);
    assert!(tasks.iter().all(Task::is_finished));
    assert_eq!(queue.pump_pending(), 0);
}

#[test]
fn test_pump_pending_leaves_requeued_tasks() {
    let queue = PinnedQueue::new();

    let task = Task::new({
        let queue = queue.clone();
        async move {
            queue.schedule().await;
            queue.schedule().await;
        }
    });

    assert_eq!(queue.pump_pending(), 1);
    assert!(!task.is_finished());
    assert_eq!(queue.len(), 1);

    assert_eq!(queue.pump_pending(), 1);
    assert!(task.is_finished());
}

#[test]
fn test_pump_until_event_set_elsewhere() {
    let queue = PinnedQueue::with_park_timeout(Duration::from_millis(1));
    let done = Arc::new(ManualResetEvent::new());

    let setter = thread::spawn({
        let queue = queue.clone();
        let done = done.clone();
        move || {
            let tasks = (0..5).map(|_| hop(&queue)).collect::<Vec<_>>();
            thread::sleep(Duration::from_millis(10));
            done.set();
            tasks
        }
    });

    let resumed = queue.pump(&*done);
    let tasks = setter.join().unwrap();

    assert!(done.is_set());
    // Everything that was queued before the event fired was resumed.
    let leftover = queue.pump_pending();
    assert_eq!(resumed + leftover, 5);
    assert!(tasks.iter().all(Task::is_finished));
}
