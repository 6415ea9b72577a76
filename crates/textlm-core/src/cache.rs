//! Shape once, reuse everywhere
//!
//! Measuring and drawing the same label usually happens several times per
//! frame. The layout cache keeps finished [`LayoutResult`]s keyed by what went
//! into them, evicts the least recently used entry when full, and makes sure
//! concurrent misses on the same key shape only once.

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::attributed::AttributedString;
use crate::error::ShapingError;
use crate::layout::LayoutResult;
use crate::types::Size;
use crate::ParagraphAttributes;

/// Default cache capacity
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(512) {
    Some(v) => v,
    None => unreachable!(),
};

/// Uniquely identifies a layout request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutCacheKey {
    /// Which backend produced the layout
    pub backend: &'static str,
    /// Value hash of the attributed string
    pub content_hash: u64,
    pub text_len: usize,
    pub paragraph: ParagraphAttributes,
    /// Width and height bounds as f32 bits
    pub bounds: (u32, u32),
}

impl LayoutCacheKey {
    pub fn new(
        backend: &'static str,
        text: &AttributedString,
        paragraph: &ParagraphAttributes,
        bounds: Size,
    ) -> Self {
        Self {
            backend,
            content_hash: text.content_hash(),
            text_len: text.len(),
            paragraph: *paragraph,
            bounds: (float_key(bounds.width), float_key(bounds.height)),
        }
    }
}

/// Bit pattern with -0.0 folded into 0.0
fn float_key(value: f32) -> u32 {
    if value == 0.0 {
        0.0_f32.to_bits()
    } else {
        value.to_bits()
    }
}

type Flight = Arc<OnceLock<Result<Arc<LayoutResult>, ShapingError>>>;

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    evictions: AtomicU64,
    shapes: AtomicU64,
}

/// Bounded LRU of finished layouts with single-flight misses
pub struct LayoutCache {
    entries: Mutex<LruCache<LayoutCacheKey, Arc<LayoutResult>>>,
    /// Lock order: `in_flight` before `entries`
    in_flight: Mutex<HashMap<LayoutCacheKey, Flight>>,
    counters: Counters,
}

impl LayoutCache {
    /// Create a cache holding up to `capacity` layouts; zero falls back to the default
    pub fn new(capacity: usize) -> Self {
        Self::with_capacity(NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY))
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Find a layout we built earlier, marking it recently used
    pub fn get(&self, key: &LayoutCacheKey) -> Option<Arc<LayoutResult>> {
        self.entries.lock().get(key).cloned()
    }

    /// Is the key cached? Does not touch recency
    pub fn contains(&self, key: &LayoutCacheKey) -> bool {
        self.entries.lock().contains(key)
    }

    /// Remember this layout for next time
    pub fn insert(&self, key: LayoutCacheKey, layout: Arc<LayoutResult>) {
        let probe = key.clone();
        let evicted = self.entries.lock().push(key, layout);
        if let Some((evicted_key, _)) = evicted {
            if evicted_key != probe {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                log::trace!("Layout cache evicted {:016x}", evicted_key.content_hash);
            }
        }
    }

    /// Return the cached layout for `key`, shaping it on a miss
    ///
    /// Concurrent callers missing on the same key wait for a single call to
    /// `shape` and all receive its outcome. Failures go to everyone who was
    /// waiting but are not cached.
    pub fn get_or_shape<F>(
        &self,
        key: &LayoutCacheKey,
        shape: F,
    ) -> Result<Arc<LayoutResult>, ShapingError>
    where
        F: FnOnce() -> Result<LayoutResult, ShapingError>,
    {
        if let Some(hit) = self.get(key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            log::trace!("Layout cache hit for {:016x}", key.content_hash);
            return Ok(hit);
        }

        let flight = {
            let mut in_flight = self.in_flight.lock();
            // A finished flight publishes while holding this lock, so checking
            // again here cannot race with it.
            if let Some(hit) = self.get(key) {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(hit);
            }
            in_flight.entry(key.clone()).or_default().clone()
        };

        let mut led = false;
        let outcome = flight
            .get_or_init(|| {
                led = true;
                self.counters.shapes.fetch_add(1, Ordering::Relaxed);
                log::debug!("Layout cache miss for {:016x}, shaping", key.content_hash);
                shape().map(Arc::new)
            })
            .clone();

        if led {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
        }

        let mut in_flight = self.in_flight.lock();
        let current = in_flight
            .get(key)
            .is_some_and(|pending| Arc::ptr_eq(pending, &flight));
        if current {
            in_flight.remove(key);
            if let Ok(layout) = &outcome {
                self.insert(key.clone(), Arc::clone(layout));
            }
        }
        drop(in_flight);

        outcome
    }

    /// Forget every cached layout
    pub fn clear(&self) {
        self.entries.lock().clear();
        log::debug!("Layout cache cleared");
    }

    /// Snapshot of cache counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            capacity: self.capacity(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            shapes: self.counters.shapes.load(Ordering::Relaxed),
        }
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// Callers that waited on someone else's shaping instead of shaping
    pub coalesced: u64,
    pub evictions: u64,
    /// Times the shaping closure actually ran
    pub shapes: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.coalesced;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
