//! File Reader cache capability (§4.4, §9 "re-express runtime polymorphism
//! as a small capability interface"). Two concrete implementations ship:
//! [`InMemoryCache`] (a simple path-keyed store) and [`NoopCache`] (always
//! misses — used when the caller wants no memoisation at all).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use crate::reader::MAX_FILE_SIZE;

/// A memoised file body (§3 "Cached Content").
#[derive(Debug, Clone)]
pub struct CachedContent {
    pub content: String,
    pub size: usize,
    pub timestamp: SystemTime,
}

impl CachedContent {
    pub fn new(content: String) -> Self {
        let size = content.len();
        Self {
            content,
            size,
            timestamp: SystemTime::now(),
        }
    }
}

/// Hit/miss/size counters, exposed per §4.4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

/// Abstract key-value store of `absolute_path -> Cached Content`.
///
/// Implementations must be safe for the engine's single task; they need not
/// be safe for concurrent use by other tasks unless the caller wraps them
/// (§5 "Shared resources"). Methods are synchronous because cache lookups
/// happen entirely in memory — the suspension points in the engine are the
/// file reads around the cache, not the cache itself.
pub trait ContentCache: Send + Sync {
    /// Look up a cached entry. Counts as a hit or miss for [`Self::stats`].
    fn get(&self, path: &Path) -> Option<CachedContent>;

    /// Insert or replace an entry. Entries larger than the per-entry cap
    /// ([`MAX_FILE_SIZE`]) are silently not cached.
    fn set(&self, path: PathBuf, content: CachedContent);

    /// Drop all cached entries and reset hit/miss counters.
    fn clear(&self);

    /// Current hit/miss/size counters.
    fn stats(&self) -> CacheStats;
}

#[derive(Default)]
struct InMemoryState {
    entries: HashMap<PathBuf, CachedContent>,
    hits: u64,
    misses: u64,
}

/// In-process cache backed by a single mutex-guarded map — the same shape as
/// the teacher's `GitContextCache` (a `Mutex<HashMap<PathBuf, _>>` keyed by
/// canonical path), adapted to hold file bodies instead of git metadata.
pub struct InMemoryCache {
    state: Mutex<InMemoryState>,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InMemoryState::default()),
        }
    }
}

impl ContentCache for InMemoryCache {
    fn get(&self, path: &Path) -> Option<CachedContent> {
        let mut state = self.state.lock().expect("cache mutex poisoned");
        match state.entries.get(path).cloned() {
            Some(entry) => {
                state.hits += 1;
                Some(entry)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    fn set(&self, path: PathBuf, content: CachedContent) {
        if content.size > MAX_FILE_SIZE {
            return;
        }
        let mut state = self.state.lock().expect("cache mutex poisoned");
        state.entries.insert(path, content);
    }

    fn clear(&self) {
        let mut state = self.state.lock().expect("cache mutex poisoned");
        *state = InMemoryState::default();
    }

    fn stats(&self) -> CacheStats {
        let state = self.state.lock().expect("cache mutex poisoned");
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            size: state.entries.len(),
        }
    }
}

/// A cache that never remembers anything — the default when no cache is
/// configured, and useful for `validate_only` runs (§4.4).
#[derive(Default)]
pub struct NoopCache {
    misses: std::sync::atomic::AtomicU64,
}

impl ContentCache for NoopCache {
    fn get(&self, _path: &Path) -> Option<CachedContent> {
        self.misses
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        None
    }

    fn set(&self, _path: PathBuf, _content: CachedContent) {}

    fn clear(&self) {}

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: 0,
            misses: self.misses.load(std::sync::atomic::Ordering::Relaxed),
            size: 0,
        }
    }
}
