//! Page rasters and their geographic placement

use corridoro_core::units::pixels_to_meters;
use corridoro_core::{CompositeError, Position};
use image::RgbaImage;
use tiny_skia::{IntSize, Pixmap};

/// A raster's pixel size and the ground extent it covers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoreferencedRaster {
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// `[min_x, min_y, max_x, max_y]` in projected units
    pub extent: [f64; 4],
}

impl GeoreferencedRaster {
    /// Place a raster centered on `center`, sized as if printed at `dpi`
    /// with a ground scale of 1:`scale`.
    pub fn centered(pixel_width: u32, pixel_height: u32, center: Position, dpi: f64, scale: f64) -> Self {
        let half_w = pixels_to_meters(pixel_width as f64, dpi, scale) / 2.0;
        let half_h = pixels_to_meters(pixel_height as f64, dpi, scale) / 2.0;
        Self {
            pixel_width,
            pixel_height,
            extent: [
                center[0] - half_w,
                center[1] - half_h,
                center[0] + half_w,
                center[1] + half_h,
            ],
        }
    }

    pub fn width(&self) -> f64 {
        self.extent[2] - self.extent[0]
    }

    pub fn height(&self) -> f64 {
        self.extent[3] - self.extent[1]
    }

    pub fn center(&self) -> Position {
        [
            (self.extent[0] + self.extent[2]) / 2.0,
            (self.extent[1] + self.extent[3]) / 2.0,
        ]
    }
}

/// Pixels of an image layer together with their placement
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub raster: GeoreferencedRaster,
    pub pixels: Pixmap,
}

/// Convert straight-alpha RGBA to a premultiplied pixmap
pub fn rgba_to_pixmap(image: &RgbaImage) -> Result<Pixmap, CompositeError> {
    let size = IntSize::from_wh(image.width(), image.height()).ok_or(CompositeError::EmptyRaster)?;
    let mut data = image.as_raw().clone();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a < 255 {
            for c in &mut px[..3] {
                *c = ((*c as u16 * a + 127) / 255) as u8;
            }
        }
    }
    Pixmap::from_vec(data, size).ok_or(CompositeError::EmptyRaster)
}

/// Flatten a premultiplied pixmap over white into packed RGB
pub fn flatten_to_rgb(pixmap: &Pixmap) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(pixmap.width() as usize * pixmap.height() as usize * 3);
    for px in pixmap.pixels() {
        let white = 255 - px.alpha();
        rgb.push(px.red().saturating_add(white));
        rgb.push(px.green().saturating_add(white));
        rgb.push(px.blue().saturating_add(white));
    }
    rgb
}
