//! Named counters and gauges, some split by an attribute value.
//!
//! The catalog of metric names is fixed when the registry is built, so the
//! name lookup itself never takes a lock. Attribute-split counters keep a
//! total alongside a [`ShardMap`] whose shards are created on first sight of
//! an attribute value.
//!
//! Values are stored, never added: sums arrive as cumulative snapshots.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use quill_common::collections::{Shard, ShardMap};
use quill_domain::constants::{
    ATTR_ARTICLE, ATTR_BLOCKED, METRIC_ARTICLES_SERVED, METRIC_COST_UPDATE_FAILURE,
    METRIC_COST_UPDATE_SUCCESS, METRIC_MEMORY_RESIDENT, METRIC_MEMORY_VIRTUAL,
    METRIC_REQUEST_BLOCKED, METRIC_ROBOTIC_VISITORS, METRIC_RUNTIME_TASKS,
};

/// Storage slot for one registered metric name.
#[derive(Debug)]
enum Slot {
    Value(AtomicI64),
    Sharded { total: AtomicI64, attribute: &'static str, shards: ShardMap },
}

impl Slot {
    fn total(&self) -> &AtomicI64 {
        match self {
            Slot::Value(value) => value,
            Slot::Sharded { total, .. } => total,
        }
    }
}

/// Registry of every counter and gauge the telemetry store knows about.
#[derive(Debug)]
pub struct CounterRegistry {
    slots: BTreeMap<&'static str, Slot>,
}

impl Default for CounterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterRegistry {
    /// Registry with the blog's metric catalog.
    pub fn new() -> Self {
        Self::with_catalog(
            &[
                METRIC_ROBOTIC_VISITORS,
                METRIC_RUNTIME_TASKS,
                METRIC_MEMORY_RESIDENT,
                METRIC_MEMORY_VIRTUAL,
                METRIC_COST_UPDATE_SUCCESS,
                METRIC_COST_UPDATE_FAILURE,
            ],
            &[(METRIC_ARTICLES_SERVED, ATTR_ARTICLE), (METRIC_REQUEST_BLOCKED, ATTR_BLOCKED)],
        )
    }

    /// Registry with an explicit catalog of plain and attribute-split names.
    pub fn with_catalog(
        simple: &[&'static str],
        sharded: &[(&'static str, &'static str)],
    ) -> Self {
        let mut slots = BTreeMap::new();
        for name in simple {
            slots.insert(*name, Slot::Value(AtomicI64::new(0)));
        }
        for &(name, attribute) in sharded {
            slots.insert(
                name,
                Slot::Sharded { total: AtomicI64::new(0), attribute, shards: ShardMap::new() },
            );
        }
        Self { slots }
    }

    /// Whether `name` is part of the catalog.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Attribute key that splits `name`, if it is an attribute-split counter.
    pub fn attribute_key(&self, name: &str) -> Option<&'static str> {
        match self.slots.get(name)? {
            Slot::Sharded { attribute, .. } => Some(*attribute),
            Slot::Value(_) => None,
        }
    }

    /// Store `value` as the current value of `name` (the total for
    /// attribute-split counters).
    ///
    /// Returns `false` for names outside the catalog.
    pub fn update(&self, name: &str, value: i64) -> bool {
        match self.slots.get(name) {
            Some(slot) => {
                slot.total().store(value, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Get or create the zeroed shard for `attribute_value` under `name`.
    ///
    /// Idempotent and safe to call concurrently. Returns `None` when `name`
    /// is unknown or not attribute-split.
    pub fn ensure_shard(&self, name: &str, attribute_value: &str) -> Option<Arc<Shard>> {
        match self.slots.get(name)? {
            Slot::Sharded { shards, .. } => Some(shards.get_or_create(attribute_value)),
            Slot::Value(_) => None,
        }
    }

    /// Store `value` into an existing shard.
    ///
    /// Returns `false` if the shard has not been created yet.
    pub fn update_shard(&self, name: &str, attribute_value: &str, value: i64) -> bool {
        match self.shards(name).and_then(|shards| shards.shard(attribute_value)) {
            Some(shard) => {
                shard.store(value);
                true
            }
            None => false,
        }
    }

    /// Current value of `name`.
    pub fn get(&self, name: &str) -> Option<i64> {
        self.slots.get(name).map(|slot| slot.total().load(Ordering::Acquire))
    }

    /// Current value of one shard.
    pub fn shard_value(&self, name: &str, attribute_value: &str) -> Option<i64> {
        self.shards(name)?.get(attribute_value)
    }

    /// Number of shards created under `name`; zero for plain or unknown names.
    pub fn shard_count(&self, name: &str) -> usize {
        self.shards(name).map_or(0, ShardMap::len)
    }

    /// Shard map backing `name`, if it is attribute-split.
    pub fn shards(&self, name: &str) -> Option<&ShardMap> {
        match self.slots.get(name)? {
            Slot::Sharded { shards, .. } => Some(shards),
            Slot::Value(_) => None,
        }
    }

    /// Read a value that is known to be in the catalog, or zero.
    pub(crate) fn value_or_zero(&self, name: &str) -> i64 {
        self.get(name).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn update_stores_last_value() {
        let registry = CounterRegistry::new();
        assert!(registry.update(METRIC_ROBOTIC_VISITORS, 4));
        assert!(registry.update(METRIC_ROBOTIC_VISITORS, 9));
        assert_eq!(registry.get(METRIC_ROBOTIC_VISITORS), Some(9));
    }

    #[test]
    fn unknown_names_are_ignored() {
        let registry = CounterRegistry::new();
        assert!(!registry.update("exporter.added.later", 1));
        assert!(registry.ensure_shard("exporter.added.later", "x").is_none());
        assert_eq!(registry.get("exporter.added.later"), None);
    }

    #[test]
    fn plain_counters_have_no_shards() {
        let registry = CounterRegistry::new();
        assert!(registry.ensure_shard(METRIC_ROBOTIC_VISITORS, "x").is_none());
        assert_eq!(registry.shard_count(METRIC_ROBOTIC_VISITORS), 0);
        assert_eq!(registry.attribute_key(METRIC_ARTICLES_SERVED), Some(ATTR_ARTICLE));
    }

    #[test]
    fn update_shard_requires_existing_shard() {
        let registry = CounterRegistry::new();
        assert!(!registry.update_shard(METRIC_ARTICLES_SERVED, "hello", 3));

        registry.ensure_shard(METRIC_ARTICLES_SERVED, "hello");
        assert!(registry.update_shard(METRIC_ARTICLES_SERVED, "hello", 3));
        assert_eq!(registry.shard_value(METRIC_ARTICLES_SERVED, "hello"), Some(3));
        assert_eq!(registry.get(METRIC_ARTICLES_SERVED), Some(0));
    }

    #[test]
    fn concurrent_ensure_shard_creates_exactly_one() {
        let registry = Arc::new(CounterRegistry::new());
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let shard = registry
                            .ensure_shard(METRIC_REQUEST_BLOCKED, "x")
                            .expect("request.blocked is sharded");
                        shard.add(1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker panicked");
        }

        assert_eq!(registry.shard_count(METRIC_REQUEST_BLOCKED), 1);
        assert_eq!(registry.shard_value(METRIC_REQUEST_BLOCKED, "x"), Some(32 * 500));
    }

    #[test]
    fn shard_cardinality_is_unbounded() {
        let registry = CounterRegistry::new();
        for i in 0..5_000 {
            registry.ensure_shard(METRIC_ARTICLES_SERVED, &format!("bogus-{i}"));
        }
        assert_eq!(registry.shard_count(METRIC_ARTICLES_SERVED), 5_000);
    }
}
