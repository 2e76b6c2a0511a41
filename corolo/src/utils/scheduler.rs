//! Test-only introspection on scheduler queues. The real queues record every
//! call, so tests assert on what the *real* implementation did rather than on
//! mocks.

use dashmap::DashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Method {
    Enqueue,
    Resume,
    Pump,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Enqueue { thread: ThreadId },
    Resume { thread: ThreadId, pumping: bool },
    Pump { resumed: usize },
}

impl Call {
    pub(crate) fn thread(&self) -> Option<ThreadId> {
        match self {
            Call::Enqueue { thread } | Call::Resume { thread, .. } => Some(*thread),
            Call::Pump { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Tracker {
    calls: Arc<DashMap<Method, Vec<Call>>>,
}

impl Tracker {
    pub(crate) fn new() -> Self {
        let map = DashMap::new();
        map.insert(Method::Enqueue, Vec::new());
        map.insert(Method::Resume, Vec::new());
        map.insert(Method::Pump, Vec::new());

        Self {
            calls: Arc::new(map),
        }
    }

    pub(crate) fn record(&self, method: Method, call: Call) {
        self.calls
            .get_mut(&method)
            .expect("method not found")
            .push(call)
    }

    pub(crate) fn record_enqueue(&self) {
        self.record(
            Method::Enqueue,
            Call::Enqueue {
                thread: thread::current().id(),
            },
        );
    }

    pub(crate) fn record_resume(&self, pumping: bool) {
        self.record(
            Method::Resume,
            Call::Resume {
                thread: thread::current().id(),
                pumping,
            },
        );
    }

    pub(crate) fn get_calls(&self, method: &Method) -> Vec<Call> {
        self.calls
            .get(method)
            .expect("method not found")
            .value()
            .clone()
    }

    pub(crate) fn num_calls(&self, method: &Method) -> usize {
        self.calls.get(method).map_or(0, |calls| calls.len())
    }
}
