//! The I/O queue: a FIFO of contexts awaiting their first dispatch, and a
//! hash-indexed set of contexts awaiting a matching protocol response.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::context::{Context, Place};

#[derive(Default)]
struct Inner {
    pending: VecDeque<Box<Context>>,
    in_flight: HashMap<u64, Box<Context>>,
}

/// Mutex-protected pair of collections. All operations are atomic under a
/// single lock.
pub struct IoQueue {
    inner: Mutex<Inner>,
}

impl IoQueue {
    pub fn new(bucket_count: usize) -> Self {
        IoQueue {
            inner: Mutex::new(Inner {
                pending: VecDeque::new(),
                in_flight: HashMap::with_capacity(bucket_count),
            }),
        }
    }

    /// Inserts `context` into the in-flight set, keyed by its identity.
    pub fn start_processing(&self, mut context: Box<Context>) {
        context.place = Place::InFlight;
        let unique = context.identity();
        let mut inner = self.inner.lock().unwrap();
        let previous = inner.in_flight.insert(unique, context);
        debug_assert!(
            previous.is_none(),
            "start_processing: duplicate context identity in in_flight"
        );
    }

    /// Locates and removes the context whose identity matches `unique`, or
    /// `None` if the response is stale or bogus.
    pub fn end_processing(&self, unique: u64) -> Option<Box<Context>> {
        let mut inner = self.inner.lock().unwrap();
        let mut context = inner.in_flight.remove(&unique)?;
        context.place = Place::Detached;
        Some(context)
    }

    /// Inserts `context` at the tail of `pending`.
    pub fn post_pending(&self, mut context: Box<Context>) {
        context.place = Place::Pending;
        self.inner.lock().unwrap().pending.push_back(context);
    }

    /// Detaches and returns the head of `pending`, or `None` if empty.
    /// Never blocks.
    pub fn next_pending(&self) -> Option<Box<Context>> {
        let mut context = self.inner.lock().unwrap().pending.pop_front()?;
        context.place = Place::Detached;
        Some(context)
    }

    /// Tears the queue down: every context still queued is finalized
    /// (simply dropped — `Context`'s fields own everything they need to
    /// free) rather than left to complete.
    pub fn drain(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.pending.clear();
        inner.in_flight.clear();
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    #[cfg(test)]
    pub(crate) fn in_flight_len(&self) -> usize {
        self.inner.lock().unwrap().in_flight.len()
    }
}
