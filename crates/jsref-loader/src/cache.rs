//! # Document Cache — Bounded LRU with Single-Flight Fills
//!
//! Maps absolute locators to parsed documents.
//!
//! ## Guarantees
//!
//! - A hit returns the same `Arc<Value>` every time, so two trees over one
//!   URI share a document while it stays cached. Eviction (or a capacity of
//!   zero) breaks that sharing, so callers must not use the address as a
//!   document's identity.
//! - For a given key at most one fill runs at a time. Concurrent callers
//!   wait on a per-key gate and then read the filled entry.
//! - Failed fills are not cached. The next caller tries again.
//! - Pinned entries (bundles and preloads) are never evicted.
//!
//! The LRU state is one `parking_lot::Mutex`. Gates live in a `DashMap` and
//! are dropped once nobody is waiting on them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

#[derive(Debug)]
struct Entry {
    document: Arc<Value>,
    tick: u64,
}

#[derive(Debug, Default)]
struct LruState {
    entries: HashMap<String, Entry>,
    // tick -> key, oldest first.
    order: BTreeMap<u64, String>,
    tick: u64,
}

impl LruState {
    fn touch(&mut self, key: &str) -> Option<Arc<Value>> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(key)?;
        self.order.remove(&entry.tick);
        entry.tick = tick;
        self.order.insert(tick, key.to_string());
        Some(Arc::clone(&entry.document))
    }

    fn insert(&mut self, key: &str, document: Arc<Value>, capacity: usize) {
        self.tick += 1;
        let tick = self.tick;
        if let Some(old) = self.entries.insert(key.to_string(), Entry { document, tick }) {
            self.order.remove(&old.tick);
        }
        self.order.insert(tick, key.to_string());

        while self.entries.len() > capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::debug!(uri = %oldest, "evicted document from cache");
        }
    }
}

/// Bounded, thread-safe document cache.
#[derive(Debug)]
pub struct DocumentCache {
    capacity: usize,
    lru: Mutex<LruState>,
    pinned: DashMap<String, Arc<Value>>,
    gates: DashMap<String, Arc<Mutex<()>>>,
}

impl DocumentCache {
    /// A cache retaining at most `capacity` unpinned documents.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lru: Mutex::new(LruState::default()),
            pinned: DashMap::new(),
            gates: DashMap::new(),
        }
    }

    /// Maximum number of unpinned documents.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of documents held, pinned included.
    pub fn len(&self) -> usize {
        self.lru.lock().entries.len() + self.pinned.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a document, marking it as recently used.
    pub fn get(&self, key: &str) -> Option<Arc<Value>> {
        if let Some(pinned) = self.pinned.get(key) {
            return Some(Arc::clone(pinned.value()));
        }
        self.lru.lock().touch(key)
    }

    /// Returns true if `key` is cached, without touching recency.
    pub fn contains(&self, key: &str) -> bool {
        self.pinned.contains_key(key) || self.lru.lock().entries.contains_key(key)
    }

    /// Insert or replace a document subject to eviction.
    pub fn insert(&self, key: &str, document: Arc<Value>) {
        if self.capacity == 0 {
            return;
        }
        self.lru.lock().insert(key, document, self.capacity);
        tracing::debug!(uri = key, "cached document");
    }

    /// Insert or replace a document that is never evicted.
    ///
    /// Returns the document previously held under `key`, pinned or not.
    pub fn pin(&self, key: &str, document: Arc<Value>) -> Option<Arc<Value>> {
        let evicted = {
            let mut lru = self.lru.lock();
            lru.entries.remove(key).map(|old| {
                lru.order.remove(&old.tick);
                old.document
            })
        };
        let replaced = self.pinned.insert(key.to_string(), document);
        tracing::debug!(uri = key, "pinned document");
        replaced.or(evicted)
    }

    /// Return the cached document for `key`, or run `fill` to produce it.
    ///
    /// Concurrent calls for the same key run `fill` at most once between
    /// them while the result stays cached. Errors from `fill` are returned
    /// to the caller that ran it and are not cached.
    pub fn get_or_try_insert_with<E, F>(&self, key: &str, fill: F) -> Result<Arc<Value>, E>
    where
        F: FnOnce() -> Result<Value, E>,
    {
        if let Some(hit) = self.get(key) {
            tracing::trace!(uri = key, "cache hit");
            return Ok(hit);
        }

        let gate = self
            .gates
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = gate.lock();
            match self.get(key) {
                Some(hit) => {
                    tracing::trace!(uri = key, "cache hit after waiting on fill");
                    Ok(hit)
                }
                None => fill().map(|value| {
                    let document = Arc::new(value);
                    self.insert(key, Arc::clone(&document));
                    document
                }),
            }
        };

        // One reference in the map and one here means nobody else is waiting.
        self.gates.remove_if(key, |_, g| Arc::strong_count(g) <= 2);
        result
    }

    /// Drop every unpinned document.
    pub fn clear(&self) {
        let mut lru = self.lru.lock();
        lru.entries.clear();
        lru.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn doc(n: i64) -> Arc<Value> {
        Arc::new(json!({"n": n}))
    }

    #[test]
    fn hit_returns_same_arc() {
        let cache = DocumentCache::new(4);
        let first = cache
            .get_or_try_insert_with::<(), _>("urn:a", || Ok(json!({"a": 1})))
            .unwrap();
        let second = cache
            .get_or_try_insert_with::<(), _>("urn:a", || panic!("must not refill"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let cache = DocumentCache::new(2);
        cache.insert("a", doc(1));
        cache.insert("b", doc(2));
        assert!(cache.get("a").is_some());
        cache.insert("c", doc(3));
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reinsert_does_not_grow() {
        let cache = DocumentCache::new(2);
        cache.insert("a", doc(1));
        cache.insert("a", doc(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").unwrap()["n"], 2);
    }

    #[test]
    fn zero_capacity_retains_nothing() {
        let cache = DocumentCache::new(0);
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            cache
                .get_or_try_insert_with::<(), _>("a", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({}))
                })
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty());
    }

    #[test]
    fn pinned_entries_survive_eviction_and_clear() {
        let cache = DocumentCache::new(1);
        cache.pin("p", doc(0));
        cache.insert("a", doc(1));
        cache.insert("b", doc(2));
        cache.clear();
        assert!(cache.contains("p"));
        assert!(!cache.contains("b"));
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = DocumentCache::new(4);
        let err = cache.get_or_try_insert_with("a", || Err("boom"));
        assert_eq!(err.unwrap_err(), "boom");
        let ok = cache.get_or_try_insert_with::<&str, _>("a", || Ok(json!(1)));
        assert!(ok.is_ok());
        assert!(cache.gates.is_empty());
    }

    #[test]
    fn pin_returns_replaced_document() {
        let cache = DocumentCache::new(2);
        cache.insert("a", doc(1));
        let replaced = cache.pin("a", doc(2)).unwrap();
        assert_eq!(replaced["n"], 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.pin("a", doc(3)).unwrap()["n"], 2);
        assert!(cache.pin("b", doc(4)).is_none());
    }

    #[test]
    fn concurrent_fills_run_once() {
        let cache = Arc::new(DocumentCache::new(8));
        let calls = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    cache
                        .get_or_try_insert_with::<(), _>("urn:shared", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(20));
                            Ok(json!({"shared": true}))
                        })
                        .unwrap()
                })
            })
            .collect();
        let docs: Vec<Arc<Value>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(docs
            .windows(2)
            .all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
