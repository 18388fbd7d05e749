//! Caching layers guarding avatar composition.
//!
//! - [`ExistenceCache`] remembers for a bounded time which artifacts are
//!   known to be on disk.
//! - [`ArtifactStore`] is the durable, write-once store of rendered bytes.
//! - [`DecodedCache`] keeps decoded base images in memory and hands out
//!   independent copies.
//! - [`RenderCache`] ties the first two together into the per-request
//!   check, render, persist sequence.

mod cache;
mod decoded;
mod existence;
mod store;

pub use cache::{CacheStatus, RenderCache};
pub use decoded::DecodedCache;
pub use existence::{ExistenceCache, DEFAULT_EXISTENCE_TTL};
pub use store::ArtifactStore;
