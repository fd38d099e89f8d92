//! Result cache
//!
//! Strict LRU keyed by the normalized comment. Reads bump recency, writes
//! evict the least-recently-used entry on overflow. Every operation runs
//! under a single lock, so get/evict/put are atomic with respect to each
//! other and a reader only ever sees complete `DetectionResult`s.

use namescreen_core::DetectionResult;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct Slot {
    value: DetectionResult,
    tick: u64,
}

#[derive(Debug, Default)]
struct LruState {
    entries: HashMap<String, Slot>,
    /// Recency tick -> key, oldest first
    recency: BTreeMap<u64, String>,
    next_tick: u64,
    capacity: usize,
}

impl LruState {
    fn touch(&mut self, key: &str) -> Option<&DetectionResult> {
        let tick = self.next_tick;
        let slot = self.entries.get_mut(key)?;
        self.recency.remove(&slot.tick);
        slot.tick = tick;
        self.recency.insert(tick, key.to_string());
        self.next_tick += 1;
        Some(&slot.value)
    }

    fn evict_to(&mut self, bound: usize) -> usize {
        let mut evicted = 0;
        while self.entries.len() > bound {
            match self.recency.pop_first() {
                Some((_, key)) => {
                    self.entries.remove(&key);
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }
}

/// Bounded, thread-safe LRU of finalized detection results
#[derive(Debug)]
pub struct ResultCache {
    state: Mutex<LruState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` results
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LruState {
                capacity,
                ..LruState::default()
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a result, marking it most recently used
    pub fn get(&self, key: &str) -> Option<DetectionResult> {
        let found = self.state.lock().touch(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Store a result; an existing entry for the key is replaced (last writer wins)
    pub fn put(&self, key: impl Into<String>, value: DetectionResult) {
        let key = key.into();
        let mut state = self.state.lock();
        if state.capacity == 0 {
            return;
        }

        let tick = state.next_tick;
        state.next_tick += 1;

        if let Some(previous) = state.entries.insert(key.clone(), Slot { value, tick }) {
            state.recency.remove(&previous.tick);
        }
        state.recency.insert(tick, key);

        let capacity = state.capacity;
        state.evict_to(capacity);
    }

    /// Whether the key is cached, without touching recency
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Number of cached results
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured bound
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Change the bound, evicting LRU entries when shrinking; returns the eviction count
    pub fn set_capacity(&self, capacity: usize) -> usize {
        let mut state = self.state.lock();
        state.capacity = capacity;
        state.evict_to(capacity)
    }

    /// Lookups served from the cache
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that missed
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
