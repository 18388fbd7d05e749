use data_hash::NameHash;

/// Digest offset of the word choosing the base image
pub const IMAGE_OFFSET: usize = 0;
/// Digest offset of the word choosing the background colour
pub const COLOR_OFFSET: usize = 4;
/// Digest offset of the word choosing the orientation
pub const FLIP_OFFSET: usize = 8;

/// Deterministic choices for one avatar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// In `[0, total_images)`
    pub image_index: usize,
    /// In `[0, palette_size)`
    pub color_index: usize,
    pub flip: bool,
}

/// Derives image, colour and orientation from disjoint 4-byte windows of
/// the name hash.
///
/// A `color_override` inside `[0, palette_size)` replaces the derived
/// colour, anything else is ignored.
pub fn select(
    hash: &NameHash,
    total_images: usize,
    palette_size: usize,
    color_override: Option<i64>,
) -> Selection {
    let image_index = reduce(hash.word(IMAGE_OFFSET), total_images);

    let color_index = match color_override {
        Some(color) if color >= 0 && (color as u64) < palette_size as u64 => {
            color as usize
        }
        _ => reduce(hash.word(COLOR_OFFSET), palette_size),
    };

    let flip = hash.word(FLIP_OFFSET) % 2 == 0;

    Selection {
        image_index,
        color_index,
        flip,
    }
}

fn reduce(word: u32, modulus: usize) -> usize {
    (word as usize).checked_rem(modulus).unwrap_or(0)
}
