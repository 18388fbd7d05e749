//! Boundary to the graphics backend.
//!
//! The avatar pipeline only sequences calls on a [`Compositor`]; the pixel
//! work lives behind it. [`ImageCompositor`] implements it with the `image`
//! crate and [`CompositorHandle`] owns the process-wide instance.

use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};

use data_error::{MemojiError, Result};

use crate::Color;

pub type Canvas = RgbaImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Center,
    TopLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    WebP,
    Png,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::WebP => "image/webp",
            OutputFormat::Png => "image/png",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::WebP => ImageFormat::WebP,
            OutputFormat::Png => ImageFormat::Png,
        }
    }
}

/// Pixel operations consumed by the render pipeline.
pub trait Compositor: Send + Sync {
    /// Transparent canvas
    fn create_canvas(&self, width: u32, height: u32) -> Canvas;

    /// Fills the disc of `radius` around `(cx, cy)` with `fill`
    fn draw_circle_mask(&self, canvas: &mut Canvas, cx: u32, cy: u32, radius: u32, fill: Color);

    fn decode(&self, path: &Path) -> Result<DynamicImage>;

    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;

    /// Draws `image` over `canvas` at `anchor`, shifted by the offsets
    fn place(
        &self,
        canvas: &mut Canvas,
        image: &DynamicImage,
        anchor: Anchor,
        offset_x: i64,
        offset_y: i64,
    );

    fn flip_horizontal(&self, canvas: &mut Canvas);

    fn scale(&self, canvas: &Canvas, width: u32, height: u32) -> Canvas;

    fn sharpen(&self, canvas: &Canvas, amount: f32) -> Canvas;

    fn encode(&self, canvas: &Canvas, format: OutputFormat, quality: u8) -> Result<Vec<u8>>;
}

/// [`Compositor`] backed by the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCompositor;

impl Compositor for ImageCompositor {
    fn create_canvas(&self, width: u32, height: u32) -> Canvas {
        RgbaImage::new(width, height)
    }

    fn draw_circle_mask(&self, canvas: &mut Canvas, cx: u32, cy: u32, radius: u32, fill: Color) {
        let (cx, cy, radius) = (cx as i64, cy as i64, radius as i64);
        let fill = Rgba(fill.rgba());
        let (width, height) = canvas.dimensions();

        let rows = (cy - radius).max(0)..=(cy + radius).min(height as i64 - 1);
        for y in rows {
            for x in (cx - radius).max(0)..=(cx + radius).min(width as i64 - 1) {
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy <= radius * radius {
                    canvas.put_pixel(x as u32, y as u32, fill);
                }
            }
        }
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage> {
        image::open(path).map_err(|err| MemojiError::Asset(path.to_path_buf(), err.to_string()))
    }

    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        image.resize_exact(width, height, imageops::FilterType::Lanczos3)
    }

    fn place(
        &self,
        canvas: &mut Canvas,
        image: &DynamicImage,
        anchor: Anchor,
        offset_x: i64,
        offset_y: i64,
    ) {
        let (x, y) = match anchor {
            Anchor::Center => (
                (canvas.width() as i64 - image.width() as i64) / 2,
                (canvas.height() as i64 - image.height() as i64) / 2,
            ),
            Anchor::TopLeft => (0, 0),
        };
        imageops::overlay(canvas, &image.to_rgba8(), x + offset_x, y + offset_y);
    }

    fn flip_horizontal(&self, canvas: &mut Canvas) {
        imageops::flip_horizontal_in_place(canvas);
    }

    fn scale(&self, canvas: &Canvas, width: u32, height: u32) -> Canvas {
        imageops::resize(canvas, width, height, imageops::FilterType::Lanczos3)
    }

    fn sharpen(&self, canvas: &Canvas, amount: f32) -> Canvas {
        imageops::unsharpen(canvas, amount / 2.0, 0)
    }

    fn encode(&self, canvas: &Canvas, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        // the bundled WebP encoder is lossless, quality only matters for lossy codecs
        log::trace!("compositor: encoding {:?} at quality {}", format, quality);

        let mut bytes = Cursor::new(Vec::new());
        canvas
            .write_to(&mut bytes, format.image_format())
            .map_err(|err| MemojiError::Render(err.to_string()))?;
        Ok(bytes.into_inner())
    }
}

pub type CompositorFactory = Box<dyn Fn() -> Result<Arc<dyn Compositor>> + Send + Sync>;

/// Lazily acquired, process-wide compositor.
///
/// [`CompositorHandle::reset`] drops the current instance so the next
/// [`CompositorHandle::get`] acquires a new one from the factory.
pub struct CompositorHandle {
    factory: CompositorFactory,
    current: RwLock<Option<Arc<dyn Compositor>>>,
}

impl CompositorHandle {
    pub fn new(factory: CompositorFactory) -> Self {
        Self {
            factory,
            current: RwLock::new(None),
        }
    }

    /// Handle producing [`ImageCompositor`]s
    pub fn image() -> Self {
        Self::new(Box::new(|| Ok(Arc::new(ImageCompositor) as Arc<dyn Compositor>)))
    }

    pub fn get(&self) -> Result<Arc<dyn Compositor>> {
        if let Some(compositor) = self
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(compositor));
        }

        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(compositor) = current.as_ref() {
            return Ok(Arc::clone(compositor));
        }

        log::debug!("compositor: acquiring backend");
        let compositor = (self.factory)()?;
        *current = Some(Arc::clone(&compositor));
        Ok(compositor)
    }

    pub fn is_acquired(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn reset(&self) {
        log::debug!("compositor: releasing backend");
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Default for CompositorHandle {
    fn default() -> Self {
        Self::image()
    }
}
