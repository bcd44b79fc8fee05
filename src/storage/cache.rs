use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

#[derive(Debug)]
struct Entries {
    bodies: LruCache<String, Arc<str>>,
    generation: u64,
}

/// Decompressed chapter bodies keyed by blob key.
///
/// A capacity of zero disables caching. Every invalidation advances a
/// generation counter; a body read from the store is only kept if no
/// invalidation happened since the caller took its [`ChapterCache::generation`].
#[derive(Debug)]
pub struct ChapterCache {
    entries: Option<Mutex<Entries>>,
}

impl ChapterCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| {
                Mutex::new(Entries {
                    bodies: LruCache::new(cap),
                    generation: 0,
                })
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        let entries = self.entries.as_ref()?;
        let mut guard = entries.lock().ok()?;
        guard.bodies.get(key).cloned()
    }

    /// Current generation, taken before reading a body from the store
    pub fn generation(&self) -> u64 {
        self.entries
            .as_ref()
            .and_then(|entries| entries.lock().ok().map(|guard| guard.generation))
            .unwrap_or(0)
    }

    /// Insert `body` unless an invalidation happened after `generation` was taken.
    ///
    /// Returns whether the body was cached.
    pub fn insert_if_current(&self, key: &str, body: Arc<str>, generation: u64) -> bool {
        let Some(entries) = &self.entries else {
            return false;
        };
        match entries.lock() {
            Ok(mut guard) if guard.generation == generation => {
                guard.bodies.put(key.to_string(), body);
                true
            }
            _ => false,
        }
    }

    pub fn invalidate(&self, key: &str) {
        if let Some(entries) = &self.entries {
            if let Ok(mut guard) = entries.lock() {
                guard.generation = guard.generation.wrapping_add(1);
                guard.bodies.pop(key);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .and_then(|entries| entries.lock().ok().map(|guard| guard.bodies.len()))
            .unwrap_or(0)
    }
}
