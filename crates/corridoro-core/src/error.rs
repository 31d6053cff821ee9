//! Error handling for CorridorO
//!
//! Provides the error types for every layer of the corridor pipeline:
//! - Geometry errors (absorbed by the synthesizer as pass-through)
//! - Composite errors (abort a single layer draw during export)
//! - Decode errors (imported document could not be turned into a raster)
//! - Render errors (the rendering surface never reported completion)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Geometry error type
///
/// Raised while turning a drawn feature into a corridor polygon. None of
/// these are fatal: the synthesizer logs them and passes the feature through.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Geometry type has no corridor transform
    #[error("Unsupported geometry type: {geometry_type}")]
    UnsupportedGeometry {
        /// The GeoJSON geometry type name.
        geometry_type: String,
    },

    /// Corridor width is not a positive finite number
    #[error("Invalid corridor width: {width}")]
    InvalidWidth {
        /// The offending width in meters.
        width: f64,
    },

    /// Coordinates are missing or cannot be used
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

/// Composite error type
///
/// Represents failures while compositing layer rasters into a page raster.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositeError {
    /// Layer transform could not be parsed or is not invertible
    #[error("Malformed layer transform: {0}")]
    MalformedTransform(String),

    /// Raster has zero width or height
    #[error("Raster has no pixels")]
    EmptyRaster,

    /// Page geometry cannot be rasterized
    #[error("Invalid page: {0}")]
    InvalidPage(String),
}

/// Decode error type
///
/// Represents failures to turn an uploaded document into a page raster.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Document bytes could not be parsed
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// Document parsed but holds no page
    #[error("Document has no pages")]
    NoPages,

    /// Document format is not handled by the decoder
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Decoding did not finish in time
    #[error("Decoding timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Decoding task was cancelled before completion
    #[error("Decoding cancelled")]
    Cancelled,
}

/// Render error type
///
/// Represents failures waiting on the rendering surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Render-complete was not signalled in time
    #[error("Render did not complete within {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Surface dropped the render request without completing it
    #[error("Render aborted by surface")]
    Aborted,
}

/// Unified error type
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Composite error
    #[error(transparent)]
    Composite(#[from] CompositeError),

    /// Decode error
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Render error
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Render(RenderError::Timeout { .. }) | Error::Decode(DecodeError::Timeout { .. })
        )
    }

    /// Check if this is a decode error
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Error::Decode(_))
    }

    /// Check if this is a geometry error
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, Error::Geometry(_))
    }
}

/// Result type alias for CorridorO operations
pub type Result<T> = std::result::Result<T, Error>;
