//! Grow-only map of named atomic counters.
//!
//! [`ShardMap`] backs counters that are split by a dynamic attribute value
//! (for example one counter per article name). Shards are created lazily the
//! first time a key is observed and are never removed.
//!
//! **Concurrency**
//! - Shard creation takes the write lock around the existence check and the
//!   insert, so concurrent callers racing on the same key all receive the same
//!   shard.
//! - Lookups take a short read lock; reading or writing a shard's value after
//!   lookup is a plain atomic operation.
//!
//! **Growth**
//! - The map is unbounded. Every distinct key seen for the lifetime of the
//!   process keeps a shard. [`ShardMap::len`] exposes the cardinality so
//!   callers can observe it.
//! - Iteration is in ascending key order, which keeps rendered output stable.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// A single counter cell inside a [`ShardMap`].
#[derive(Debug, Default)]
pub struct Shard {
    value: AtomicI64,
}

impl Shard {
    /// Overwrite the shard value.
    pub fn store(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Add `delta` to the shard value, returning the new value.
    pub fn add(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::AcqRel).wrapping_add(delta)
    }

    /// Current shard value.
    pub fn load(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }
}

/// Thread-safe, grow-only map from attribute value to [`Shard`].
#[derive(Default)]
pub struct ShardMap {
    shards: RwLock<BTreeMap<String, Arc<Shard>>>,
}

impl ShardMap {
    /// Create an empty shard map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shard for `key`, creating a zeroed one if absent.
    ///
    /// Idempotent: every caller asking for the same key receives the same
    /// shard, including callers racing on first creation.
    pub fn get_or_create(&self, key: &str) -> Arc<Shard> {
        if let Some(shard) = self.shards.read().get(key) {
            return Arc::clone(shard);
        }

        let mut shards = self.shards.write();
        Arc::clone(shards.entry(key.to_owned()).or_default())
    }

    /// Return the shard for `key` without creating it.
    pub fn shard(&self, key: &str) -> Option<Arc<Shard>> {
        self.shards.read().get(key).map(Arc::clone)
    }

    /// Current value for `key`, or `None` if no shard exists.
    pub fn get(&self, key: &str) -> Option<i64> {
        self.shards.read().get(key).map(|shard| shard.load())
    }

    /// Whether a shard exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.shards.read().contains_key(key)
    }

    /// Number of shards created so far.
    pub fn len(&self) -> usize {
        self.shards.read().len()
    }

    /// Whether no shard has been created yet.
    pub fn is_empty(&self) -> bool {
        self.shards.read().is_empty()
    }

    /// Visit every shard in ascending key order.
    ///
    /// The read lock is held for the duration of the walk, so `f` must not
    /// call back into this map's creation path.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, i64),
    {
        for (key, shard) in self.shards.read().iter() {
            f(key, shard.load());
        }
    }

    /// Owned copy of every `(key, value)` pair in ascending key order.
    pub fn snapshot(&self) -> Vec<(String, i64)> {
        let shards = self.shards.read();
        let mut out = Vec::with_capacity(shards.len());
        for (key, shard) in shards.iter() {
            out.push((key.clone(), shard.load()));
        }
        out
    }
}

impl fmt::Debug for ShardMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardMap").field("len", &self.len()).finish()
    }
}
