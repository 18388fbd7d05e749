use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use data_error::Result;
use lru::LruCache;

/// In-memory cache of decoded values keyed by source path.
///
/// The cache owns the decoded originals; callers only ever receive clones,
/// so compositing onto a returned value cannot affect other requests.
/// Least recently used entries are evicted past `capacity`.
pub struct DecodedCache<V> {
    label: String,
    entries: Mutex<LruCache<PathBuf, Arc<V>>>,
}

impl<V: Clone> DecodedCache<V> {
    pub fn new(label: String, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        log::debug!("decoded/{}: initialized with {} entries limit", label, capacity);

        Self {
            label,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns a copy of the value for `path`, decoding it with `load` on a
    /// miss. A failed load leaves the cache untouched.
    pub fn get_or_load<F>(&self, path: &Path, load: F) -> Result<V>
    where
        F: FnOnce(&Path) -> Result<V>,
    {
        let cached = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned();
        if let Some(value) = cached {
            log::trace!("decoded/{}: hit {}", self.label, path.display());
            return Ok(V::clone(&value));
        }

        // decode outside the lock, racing loaders of the same path both
        // decode and the later insert replaces an identical value
        log::debug!("decoded/{}: loading {}", self.label, path.display());
        let value = Arc::new(load(path)?);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(path.to_path_buf(), Arc::clone(&value));

        Ok(V::clone(&value))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        log::debug!("decoded/{}: cleared", self.label);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
