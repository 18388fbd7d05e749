use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use image::DynamicImage;

use data_error::Result;
use data_hash::NameHash;
use fs_assets::{AssetSet, GenderConfig};
use fs_cache::{ArtifactStore, CacheStatus, DecodedCache, ExistenceCache, RenderCache};
use gender_detect::{GenderLookup, NameGenderDetector, Resolution};

use crate::compositor::CompositorHandle;
use crate::key::{CacheKey, ARTIFACT_EXTENSION};
use crate::render::{compose, RenderPlan, OUTPUT_FORMAT};
use crate::select::{select, Selection};
use crate::{AvatarRequest, Color};

pub type Detector = NameGenderDetector<Box<dyn GenderLookup>>;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Root of the per-gender asset directories
    pub assets: PathBuf,
    /// Directory of rendered artifacts, created if missing
    pub storage: PathBuf,
    pub existence_ttl: Duration,
    /// Number of decoded base images kept in memory
    pub decoded_capacity: usize,
}

/// Everything derived from a request before any pixel work
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarPlan {
    pub hash: NameHash,
    pub resolution: Resolution,
    pub selection: Selection,
    pub key: CacheKey,
    pub render: RenderPlan,
}

#[derive(Debug, Clone)]
pub struct RenderedAvatar {
    pub key: CacheKey,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub status: CacheStatus,
}

impl RenderedAvatar {
    pub fn etag(&self) -> String {
        self.key.etag()
    }
}

/// Avatar generation pipeline.
///
/// gender resolution -> selection -> asset lookup -> cached composition
pub struct AvatarService {
    detector: Detector,
    assets: AssetSet,
    cache: RenderCache,
    decoded: DecodedCache<DynamicImage>,
    backend: CompositorHandle,
}

impl AvatarService {
    pub fn new(
        config: &ServiceConfig,
        lookup: Box<dyn GenderLookup>,
        backend: CompositorHandle,
    ) -> Result<Self> {
        fs::create_dir_all(&config.storage)?;
        let store =
            ArtifactStore::new("avatars".to_owned(), &config.storage, ARTIFACT_EXTENSION)?;

        log::info!(
            "service: assets at {}, artifacts at {}",
            config.assets.display(),
            config.storage.display()
        );

        Ok(Self {
            detector: NameGenderDetector::new(lookup),
            assets: AssetSet::new(&config.assets),
            cache: RenderCache::new(store, ExistenceCache::new(config.existence_ttl)),
            decoded: DecodedCache::new("base-images".to_owned(), config.decoded_capacity),
            backend,
        })
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    pub fn decoded(&self) -> &DecodedCache<DynamicImage> {
        &self.decoded
    }

    pub fn backend(&self) -> &CompositorHandle {
        &self.backend
    }

    /// Resolves gender, selection, cache key and base image of a request
    pub fn plan(&self, request: &AvatarRequest) -> Result<AvatarPlan> {
        let resolution = self.detector.resolve(
            &request.name,
            request.gender.as_deref(),
            request.country.as_deref(),
        );
        let hash = NameHash::from_name(&request.name);

        let palette = request.palette;
        let config = GenderConfig::of(resolution.gender);
        let selection = select(&hash, config.count, palette.len(), request.color);

        let base_image = self.assets.resolve(resolution.gender, selection.image_index)?;
        let color = palette
            .get(selection.color_index)
            .unwrap_or(Color::from_hex(0xD0D0D0));

        let key = CacheKey::new(
            &hash,
            resolution.gender,
            resolution.detected,
            request.country.as_deref(),
            palette,
            selection.color_index,
        );

        Ok(AvatarPlan {
            hash,
            resolution,
            selection,
            key,
            render: RenderPlan {
                base_image,
                color,
                flip: selection.flip,
            },
        })
    }

    /// Returns the encoded avatar, composing it only if no artifact exists
    pub fn render(&self, request: &AvatarRequest) -> Result<RenderedAvatar> {
        let plan = self.plan(request)?;
        log::debug!(
            "service: {:?} -> {} ({:?})",
            request.name,
            plan.key,
            plan.resolution.method
        );
        self.render_plan(plan)
    }

    /// Same as [`AvatarService::render`] for an already computed plan
    pub fn render_plan(&self, plan: AvatarPlan) -> Result<RenderedAvatar> {
        let (bytes, status) = self.cache.get_or_render(plan.key.as_str(), || {
            let compositor = self.backend.get()?;
            compose(compositor.as_ref(), &self.decoded, &plan.render)
        })?;

        Ok(RenderedAvatar {
            key: plan.key,
            bytes,
            content_type: OUTPUT_FORMAT.content_type(),
            status,
        })
    }

    /// Drops decoded base images, cached asset listings and the compositor
    /// backend. Rendered artifacts are kept.
    pub fn reset(&self) {
        log::info!("service: resetting in-memory state");
        self.decoded.clear();
        self.assets.refresh();
        self.backend.reset();
    }
}
