use data_error::Result;

use crate::{ArtifactStore, ExistenceCache};

/// Where the bytes returned by [`RenderCache::get_or_render`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Existence cache hit, served from the store
    Hit,
    /// Existence cache miss, the artifact was already on disk
    Stored,
    /// Freshly rendered and persisted
    Rendered,
}

/// Existence cache in front of a durable artifact store.
///
/// Per request: a fresh existence entry serves the stored artifact
/// directly. Otherwise the store is checked once; if the artifact is still
/// missing it is rendered, written and recorded. Render failures propagate
/// and leave both layers untouched.
pub struct RenderCache {
    store: ArtifactStore,
    existence: ExistenceCache,
}

impl RenderCache {
    pub fn new(store: ArtifactStore, existence: ExistenceCache) -> Self {
        Self { store, existence }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn existence(&self) -> &ExistenceCache {
        &self.existence
    }

    pub fn get_or_render<F>(&self, key: &str, render: F) -> Result<(Vec<u8>, CacheStatus)>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        if self.existence.contains(key) {
            match self.store.read(key) {
                Ok(Some(bytes)) => {
                    log::debug!("cache: hit {}", key);
                    return Ok((bytes, CacheStatus::Hit));
                }
                Ok(None) => {
                    log::warn!("cache: {} vanished from store", key);
                    self.existence.forget(key);
                }
                Err(err) => {
                    log::warn!("cache: failed to read {}: {}", key, err);
                    self.existence.forget(key);
                }
            }
        }

        if let Some(bytes) = self.store.read(key)? {
            log::debug!("cache: found {} in store", key);
            self.existence.mark(key);
            return Ok((bytes, CacheStatus::Stored));
        }

        log::debug!("cache: miss {}, rendering", key);
        let bytes = render()?;
        self.store.write(key, &bytes)?;
        self.existence.mark(key);

        Ok((bytes, CacheStatus::Rendered))
    }
}
