//! Plumbing shared by every pipeline stage
//!
//! A stage owns one [`WorkQueue`] as its input. Producers (inbound dispatch
//! or the previous stage) hold clones of the queue handle and push into it
//! from any thread; the owning stage drains it once per tick.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

/// Thread-safe FIFO handle; clones share the same queue
pub struct WorkQueue<T> {
    inner: Arc<Mutex<VecDeque<T>>>,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn push(&self, item: T) {
        self.inner.lock().push_back(item);
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.inner.lock().extend(items);
    }

    pub fn pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Take everything queued so far, oldest first
    pub fn drain(&self) -> Vec<T> {
        self.inner.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one stage update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    /// Nothing was pending
    Idle,
    /// This many items moved on to the next stage or the sink
    Advanced(usize),
    /// Fetches did not resolve; `pending` items wait for the next tick
    Deferred { pending: usize, reason: String },
}

impl StageStatus {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }

    pub fn advanced(&self) -> usize {
        match self {
            Self::Advanced(n) => *n,
            _ => 0,
        }
    }
}
