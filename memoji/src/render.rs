use std::path::PathBuf;

use image::DynamicImage;

use data_error::Result;
use fs_cache::DecodedCache;

use crate::compositor::{Anchor, Compositor, OutputFormat};
use crate::Color;

pub const CANVAS_SIZE: u32 = 1024;
pub const CIRCLE_RADIUS: u32 = 511;
pub const BASE_IMAGE_SIZE: u32 = 920;
pub const BASE_IMAGE_OFFSET_Y: i64 = 10;
pub const OUTPUT_SIZE: u32 = 128;
pub const SHARPEN_AMOUNT: f32 = 2.0;
pub const OUTPUT_FORMAT: OutputFormat = OutputFormat::WebP;
pub const OUTPUT_QUALITY: u8 = 100;

/// Inputs of one composition
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub base_image: PathBuf,
    pub color: Color,
    pub flip: bool,
}

/// Composes and encodes an avatar.
///
/// The base image comes from `decoded` as a private copy, the cached
/// original is never drawn on.
pub fn compose(
    compositor: &dyn Compositor,
    decoded: &DecodedCache<DynamicImage>,
    plan: &RenderPlan,
) -> Result<Vec<u8>> {
    let center = CANVAS_SIZE / 2;
    let mut canvas = compositor.create_canvas(CANVAS_SIZE, CANVAS_SIZE);
    compositor.draw_circle_mask(&mut canvas, center, center, CIRCLE_RADIUS, plan.color);

    let base = decoded.get_or_load(&plan.base_image, |path| compositor.decode(path))?;
    let base = compositor.resize(&base, BASE_IMAGE_SIZE, BASE_IMAGE_SIZE);
    compositor.place(&mut canvas, &base, Anchor::Center, 0, BASE_IMAGE_OFFSET_Y);

    if plan.flip {
        compositor.flip_horizontal(&mut canvas);
    }

    let canvas = compositor.scale(&canvas, OUTPUT_SIZE, OUTPUT_SIZE);
    let canvas = compositor.sharpen(&canvas, SHARPEN_AMOUNT);
    compositor.encode(&canvas, OUTPUT_FORMAT, OUTPUT_QUALITY)
}
