use std::fmt;

use data_hash::NameHash;
use gender_detect::Gender;

use crate::Palette;

/// Extension of rendered artifacts
pub const ARTIFACT_EXTENSION: &str = "webp";

/// Identifier of one rendered avatar variant:
/// `{hash}_{gender}[_override][_c-{country}][_p-{palette}]_{color}`.
///
/// `_override` marks a gender that differs from the one detected for the
/// name, so explicit requests never share files with detected ones.
/// Countries are alphanumeric, the `c-` and `p-` markers keep their tags
/// apart from each other and from `override`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(
        hash: &NameHash,
        gender: Gender,
        detected: Gender,
        country: Option<&str>,
        palette: Palette,
        color_index: usize,
    ) -> Self {
        let mut key = format!("{}_{}", hash, gender);
        if gender != detected {
            key.push_str("_override");
        }
        if let Some(country) = country {
            key.push_str("_c-");
            key.push_str(&country.to_lowercase());
        }
        if let Some(tag) = palette.tag() {
            key.push_str("_p-");
            key.push_str(tag);
        }
        key.push_str(&format!("_{}", color_index));
        CacheKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, ARTIFACT_EXTENSION)
    }

    /// Strong validator for HTTP caching
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
