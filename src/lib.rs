//! # CorridorO
//!
//! Corridor orienteering map maker:
//! - Buffered route corridors merged into one safe band
//! - Scale-true single page PDF export
//! - Georeferenced import of printed pages
//!
//! ## Architecture
//!
//! CorridorO is organized as a workspace with multiple crates:
//!
//! 1. **corridoro-core** - Feature model, scale math, projections, errors
//! 2. **corridoro-designer** - Corridor synthesis, drawing source, corridor layer
//! 3. **corridoro-print** - Layer stack, offscreen surface, compositor, PDF I/O
//! 4. **corridoro-settings** - Persistent configuration
//! 5. **corridoro** - This facade and the `corridoro` command line tool

pub mod workflow;

pub use corridoro_core::{
    projection_for_code, CompositeError, DecodeError, Error, Feature, FeatureCollection,
    FeatureProperties, Geometry, GeometryError, LineStyle, Orientation, PaperSize, Position,
    Projection, RenderError, Result,
};

pub use corridoro_designer::{
    CorridorLayer, CorridorOptions, CorridorSynthesizer, DrawingSource, FeatureKey,
    SharedFeatures, SourceListener,
};

pub use corridoro_print::{
    CompositeExporter, GeoreferencedImportCalibrator, ImportedPage, LayerRole, LayerStack,
    OffscreenMap, PageDecoder, PdfPageDecoder, PrintJob, RasterPageDecoder, RenderSurface,
};

pub use corridoro_settings::{Config, SettingsError};

pub use workflow::{parse_center, DocumentKind, MapSession};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Initialize logging as one JSON object per event
pub fn init_json_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .json();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
