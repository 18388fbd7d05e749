use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// How long a positive existence check is trusted.
pub const DEFAULT_EXISTENCE_TTL: Duration = Duration::from_secs(60 * 60);

/// Expired entries are purged once the map grows past this size.
const PURGE_THRESHOLD: usize = 4096;

/// Remembers which artifacts are known to be on durable storage.
///
/// Entries expire after the TTL so that artifacts deleted out-of-band are
/// noticed eventually. Only positive knowledge is recorded.
pub struct ExistenceCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Instant>>,
}

impl ExistenceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether `key` was marked as existing within the TTL
    pub fn contains(&self, key: &str) -> bool {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .map_or(false, |marked| marked.elapsed() < self.ttl)
    }

    pub fn mark(&self, key: &str) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= PURGE_THRESHOLD {
            let ttl = self.ttl;
            entries.retain(|_, marked| marked.elapsed() < ttl);
            log::debug!("existence: purged, {} entries left", entries.len());
        }
        entries.insert(key.to_owned(), Instant::now());
    }

    pub fn forget(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for ExistenceCache {
    fn default() -> Self {
        Self::new(DEFAULT_EXISTENCE_TTL)
    }
}
