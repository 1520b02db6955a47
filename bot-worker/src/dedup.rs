//! Best-effort duplicate suppression for queue deliveries.
//!
//! The broker guarantees at-least-once delivery, so the worker keeps a
//! bounded in-memory set of keys it has already started work for: the
//! physical `message_id` of each delivery and the logical
//! `user_id:enqueued_at` key of each job. The set lives for the worker
//! process's lifetime only; it is a mitigation, not a correctness
//! guarantee.

use std::collections::{HashSet, VecDeque};

/// Bounded LRU set of already-seen delivery keys.
///
/// Constructed once at worker start and passed by reference into the
/// per-record handler. Keys must be inserted *before* side-effecting
/// work begins, closing the window where a crash mid-processing would
/// otherwise cause a double-send on redelivery.
#[derive(Debug)]
pub struct DedupSet {
    capacity: usize,
    seen: HashSet<String>,
    order: VecDeque<String>,
}

impl DedupSet {
    /// Create a set that remembers at most `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Whether `key` has been inserted and not yet evicted.
    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    /// Insert `key`, evicting the oldest entry when full.
    ///
    /// Returns `false` if the key was already present.
    pub fn insert(&mut self, key: &str) -> bool {
        if self.seen.contains(key) {
            return false;
        }

        if self.seen.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }

        self.seen.insert(key.to_string());
        self.order.push_back(key.to_string());
        true
    }

    /// Number of keys currently remembered.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
