//! # CorridorO Print
//!
//! Scale-true map pages in both directions.
//!
//! - **Export**: [`CompositeExporter`] resizes a [`RenderSurface`] to the
//!   page's pixel size, sets the resolution that makes the page true to the
//!   requested ground scale, waits for the render and composites the
//!   printable canvases into a single-page PDF.
//! - **Import**: [`GeoreferencedImportCalibrator`] decodes a page, places it
//!   on the map around the view center and inserts it into the
//!   [`LayerStack`] as a masked overlay plus a dimmed base.

pub mod compositor;
pub mod export;
pub mod import;
pub mod layer;
pub mod pdf;
pub mod raster;
pub mod surface;

pub use compositor::{composite, LayerDraw};
pub use export::{CompositeExporter, ExportGuard, PrintJob};
pub use import::{
    DecodedPage, GeoreferencedImportCalibrator, ImportedPage, PageDecoder, RasterPageDecoder,
    IMPORT_BASE_OPACITY, IMPORT_DPI, IMPORT_SCALE,
};
pub use layer::{
    AffineTransform, CompositeMode, LayerContent, LayerDescriptor, LayerId, LayerRole, LayerStack,
    MapLayer, VectorStyle,
};
pub use pdf::{write_image_page, PdfPageDecoder};
pub use raster::{GeoreferencedRaster, ImageSource};
pub use surface::{InteractionSet, NoTiles, OffscreenMap, RenderSurface, TileProvider};
