//! Retry bookkeeping: time-bounded exclusion sets and per-target attempt counters.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use wavefarm_core::Timestamp;

/// Set of keys excluded until a per-key expiry.
#[derive(Clone, Debug)]
pub struct Blacklist<K> {
    ttl: Duration,
    entries: HashMap<K, Timestamp>,
}

impl<K: Eq + Hash> Blacklist<K> {
    /// Creates an empty blacklist whose entries last `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Excludes `key` from `now` until `now + ttl`; returns the expiry.
    pub fn insert(&mut self, key: K, now: Timestamp) -> Timestamp {
        let until = now.after(self.ttl);
        let _ = self.entries.insert(key, until);
        until
    }

    /// Reports whether `key` is excluded at `now`.
    ///
    /// An entry inserted at `T` excludes its key for every `now` in `[T, T + ttl)`.
    #[must_use]
    pub fn contains(&self, key: &K, now: Timestamp) -> bool {
        self.entries.get(key).is_some_and(|until| now < *until)
    }

    /// Drops every entry that has lapsed at `now`.
    pub fn prune(&mut self, now: Timestamp) {
        self.entries.retain(|_, until| now < *until);
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, lapsed ones included until pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counts consecutive attempts against the same target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptCounter<K> {
    target: Option<K>,
    count: u32,
}

impl<K> Default for AttemptCounter<K> {
    fn default() -> Self {
        Self {
            target: None,
            count: 0,
        }
    }
}

impl<K: Copy + PartialEq> AttemptCounter<K> {
    /// Records one attempt against `target`; returns the attempts made against it so far.
    ///
    /// Switching targets restarts the count.
    pub fn record(&mut self, target: K) -> u32 {
        if self.target != Some(target) {
            self.target = Some(target);
            self.count = 0;
        }
        self.count += 1;
        self.count
    }

    /// Attempts made against the current target.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Target of the current attempts, if any.
    #[must_use]
    pub const fn target(&self) -> Option<K> {
        self.target
    }

    /// Forgets the current target and its attempts.
    pub fn reset(&mut self) {
        self.target = None;
        self.count = 0;
    }
}
