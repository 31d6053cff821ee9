//! Georeferenced page import
//!
//! An uploaded page is decoded off the async executor, placed on the map
//! with a fixed convention (decoded at 300 dpi, printed at 1:10000, centered
//! on the view) and inserted as two image layers sharing one raster.

use crate::layer::{LayerId, LayerStack};
use crate::raster::{rgba_to_pixmap, GeoreferencedRaster, ImageSource};
use corridoro_core::{DecodeError, Position, Result};
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Dpi pages are decoded at
pub const IMPORT_DPI: f64 = 300.0;

/// Ground scale denominator assumed for imported pages
pub const IMPORT_SCALE: f64 = 10000.0;

/// Opacity of the dimmed copy of an imported page
pub const IMPORT_BASE_OPACITY: f32 = 0.1;

/// Rasterized first page of a document
#[derive(Debug, Clone)]
pub struct DecodedPage {
    pub width: u32,
    pub height: u32,
    pub pixels: RgbaImage,
}

/// Turns uploaded document bytes into a page raster
pub trait PageDecoder: Send + Sync + 'static {
    fn decode(&self, bytes: &[u8], dpi: f64) -> std::result::Result<DecodedPage, DecodeError>;
}

/// Decoder for page scans saved as PNG or JPEG
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterPageDecoder;

impl PageDecoder for RasterPageDecoder {
    fn decode(&self, bytes: &[u8], _dpi: f64) -> std::result::Result<DecodedPage, DecodeError> {
        let format = image::guess_format(bytes)
            .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;
        if !matches!(format, image::ImageFormat::Png | image::ImageFormat::Jpeg) {
            return Err(DecodeError::UnsupportedFormat(format!("{format:?}")));
        }
        let pixels = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?
            .to_rgba8();
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(DecodeError::NoPages);
        }
        Ok(DecodedPage {
            width: pixels.width(),
            height: pixels.height(),
            pixels,
        })
    }
}

/// Layers created by one import
#[derive(Debug, Clone)]
pub struct ImportedPage {
    pub raster: GeoreferencedRaster,
    pub overlay: LayerId,
    pub base: LayerId,
}

/// Places decoded pages on the map
#[derive(Debug, Clone)]
pub struct GeoreferencedImportCalibrator {
    dpi: f64,
    scale: f64,
    base_opacity: f32,
    decode_timeout: Duration,
}

impl Default for GeoreferencedImportCalibrator {
    fn default() -> Self {
        Self {
            dpi: IMPORT_DPI,
            scale: IMPORT_SCALE,
            base_opacity: IMPORT_BASE_OPACITY,
            decode_timeout: Duration::from_secs(30),
        }
    }
}

impl GeoreferencedImportCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the placement convention
    pub fn with_convention(mut self, dpi: f64, scale: f64) -> Self {
        self.dpi = dpi;
        self.scale = scale;
        self
    }

    pub fn with_base_opacity(mut self, opacity: f32) -> Self {
        self.base_opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn with_decode_timeout(mut self, timeout: Duration) -> Self {
        self.decode_timeout = timeout;
        self
    }

    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    /// Ground extent of a `pixel_width` x `pixel_height` page centered on
    /// `center`
    pub fn calibrate(&self, pixel_width: u32, pixel_height: u32, center: Position) -> GeoreferencedRaster {
        GeoreferencedRaster::centered(pixel_width, pixel_height, center, self.dpi, self.scale)
    }

    /// Decode `bytes` with a bounded wait.
    ///
    /// Decoding runs on the blocking pool; when the bound expires the result
    /// is abandoned and `DecodeError::Timeout` returned.
    pub async fn decode<D: PageDecoder>(
        &self,
        decoder: Arc<D>,
        bytes: Vec<u8>,
    ) -> std::result::Result<DecodedPage, DecodeError> {
        let dpi = self.dpi;
        let task = tokio::task::spawn_blocking(move || decoder.decode(&bytes, dpi));
        match tokio::time::timeout(self.decode_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                debug!("Decode task failed: {}", join_err);
                Err(DecodeError::Cancelled)
            }
            Err(_) => Err(DecodeError::Timeout {
                timeout_ms: self.decode_timeout.as_millis() as u64,
            }),
        }
    }

    /// Decode a page, place it around `center` and add its layers to
    /// `stack`.
    ///
    /// On any decode failure the stack is left untouched.
    pub async fn import_page<D: PageDecoder>(
        &self,
        decoder: Arc<D>,
        bytes: Vec<u8>,
        center: Position,
        stack: &mut LayerStack,
    ) -> Result<ImportedPage> {
        let page = self.decode(decoder, bytes).await?;
        let raster = self.calibrate(page.width, page.height, center);
        let pixels = rgba_to_pixmap(&page.pixels)?;
        info!(
            "Imported {}x{} px page covering [{:.1}, {:.1}, {:.1}, {:.1}]",
            page.width, page.height, raster.extent[0], raster.extent[1], raster.extent[2], raster.extent[3]
        );

        let source = Arc::new(ImageSource { raster, pixels });
        let (overlay, base) = stack.insert_import(source, self.base_opacity);
        Ok(ImportedPage { raster, overlay, base })
    }
}
