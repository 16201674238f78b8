//! Content-addressed shape cache.
//!
//! Entries are keyed by [`CacheKey`], so any two objects whose construction
//! trees match share one kernel shape. Only successful builds are stored.

use std::collections::HashMap;

use geom_kernel::{MassProps, ShapeHandle};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hash::CacheKey;

/// A memoized build: the kernel shape plus its mass properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    pub handle: ShapeHandle,
    pub metadata: MassProps,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

/// Decides which entries leave the cache.
pub trait EvictionPolicy: Send {
    /// Called on every hit.
    fn touch(&mut self, key: CacheKey);

    /// Called after an insert; returns the keys to evict.
    fn admit(&mut self, key: CacheKey, len: usize) -> Vec<CacheKey>;

    /// Called when the cache forgets every entry.
    fn reset(&mut self) {}
}

/// Never evicts.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unbounded;

impl EvictionPolicy for Unbounded {
    fn touch(&mut self, _key: CacheKey) {}

    fn admit(&mut self, _key: CacheKey, _len: usize) -> Vec<CacheKey> {
        Vec::new()
    }
}

/// Least-recently-used eviction with a fixed entry budget.
#[derive(Debug, Clone)]
pub struct LruEviction {
    capacity: usize,
    clock: u64,
    last_used: HashMap<CacheKey, u64>,
}

impl LruEviction {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            clock: 0,
            last_used: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn tick(&mut self, key: CacheKey) {
        self.clock += 1;
        self.last_used.insert(key, self.clock);
    }
}

impl EvictionPolicy for LruEviction {
    fn touch(&mut self, key: CacheKey) {
        self.tick(key);
    }

    fn admit(&mut self, key: CacheKey, len: usize) -> Vec<CacheKey> {
        self.tick(key);
        let mut victims = Vec::new();
        let mut remaining = len;
        while remaining > self.capacity {
            let Some(oldest) = self
                .last_used
                .iter()
                .min_by_key(|(_, &t)| t)
                .map(|(k, _)| *k)
            else {
                break;
            };
            self.last_used.remove(&oldest);
            victims.push(oldest);
            remaining -= 1;
        }
        victims
    }

    fn reset(&mut self) {
        self.last_used.clear();
    }
}

/// The worker-owned memo of built shapes.
///
/// Evicted handles are not released here: they stay valid until the owner
/// drains them with [`ShapeCache::drain_evicted`], typically after the pass
/// that evicted them has been tessellated.
pub struct ShapeCache {
    entries: HashMap<CacheKey, CacheEntry>,
    policy: Box<dyn EvictionPolicy>,
    stats: CacheStats,
    evicted: Vec<ShapeHandle>,
}

impl ShapeCache {
    pub fn new() -> Self {
        Self::with_policy(Box::new(Unbounded))
    }

    pub fn with_policy(policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
            stats: CacheStats::default(),
            evicted: Vec::new(),
        }
    }

    /// Looks up `key`, counting the hit or miss.
    pub fn lookup(&mut self, key: CacheKey) -> Option<CacheEntry> {
        match self.entries.get(&key) {
            Some(entry) => {
                self.stats.hits += 1;
                self.policy.touch(key);
                debug!(%key, "cache hit");
                Some(*entry)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Read-only peek without touching statistics or recency.
    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: CacheKey, entry: CacheEntry) {
        if let Some(previous) = self.entries.insert(key, entry) {
            if previous.handle != entry.handle {
                self.evicted.push(previous.handle);
            }
        }
        self.stats.inserts += 1;
        debug!(%key, handle = entry.handle.raw(), "cache insert");
        for victim in self.policy.admit(key, self.entries.len()) {
            if let Some(old) = self.entries.remove(&victim) {
                debug!(key = %victim, "cache evict");
                self.stats.evictions += 1;
                self.evicted.push(old.handle);
            }
        }
    }

    /// Handles evicted since the last drain; the caller releases them.
    pub fn drain_evicted(&mut self) -> Vec<ShapeHandle> {
        std::mem::take(&mut self.evicted)
    }

    /// Forgets every entry. Returns all handles the cache owned, including
    /// pending evictions.
    pub fn clear(&mut self) -> Vec<ShapeHandle> {
        self.policy.reset();
        let mut handles = self.drain_evicted();
        handles.extend(self.entries.drain().map(|(_, e)| e.handle));
        handles
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ShapeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShapeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapeCache")
            .field("entries", &self.entries.len())
            .field("stats", &self.stats)
            .field("pending_evictions", &self.evicted.len())
            .finish()
    }
}
