//! Deterministic cartoon avatars from names.
//!
//! A name is hashed with MD5 and fixed windows of the digest pick the base
//! image, the background colour and the orientation, so the same request
//! always yields the same picture. Rendered avatars are stored on disk under
//! a [`CacheKey`] and never rendered twice.
//!
//! ```no_run
//! use memoji::{AvatarRequest, AvatarService, CompositorHandle, ServiceConfig};
//! use gender_detect::NameDictionary;
//! # fn main() -> data_error::Result<()> {
//! let config = ServiceConfig {
//!     assets: "public/images/avatars".into(),
//!     storage: "storage/avatars".into(),
//!     existence_ttl: std::time::Duration::from_secs(3600),
//!     decoded_capacity: 128,
//! };
//! let service = AvatarService::new(
//!     &config,
//!     Box::new(NameDictionary::builtin()),
//!     CompositorHandle::image(),
//! )?;
//! let avatar = service.render(&AvatarRequest::new("john"))?;
//! assert_eq!(avatar.content_type, "image/webp");
//! # Ok(())
//! # }
//! ```

pub mod compositor;
mod key;
mod palette;
pub mod render;
mod request;
pub mod select;
mod service;

pub use compositor::{Anchor, Canvas, Compositor, CompositorHandle, ImageCompositor, OutputFormat};
pub use key::{CacheKey, ARTIFACT_EXTENSION};
pub use palette::{Color, Palette};
pub use request::{normalize_country, parse_color, random_name, AvatarRequest, RANDOM_NAME_LEN};
pub use select::{select, Selection};
pub use service::{AvatarPlan, AvatarService, Detector, RenderedAvatar, ServiceConfig};

pub use data_hash::NameHash;
pub use fs_cache::CacheStatus;
pub use gender_detect::{Gender, GenderLookup, NameDictionary};
