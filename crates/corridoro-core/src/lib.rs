//! # CorridorO Core
//!
//! Core types and utilities shared by the CorridorO crates:
//! the GeoJSON-like feature model, the page/ground scale math,
//! projection helpers and the error taxonomy.

pub mod error;
pub mod feature;
pub mod projection;
pub mod units;

pub use error::{CompositeError, DecodeError, Error, GeometryError, RenderError, Result};

pub use feature::{
    Feature, FeatureCollection, FeatureProperties, Geometry, GeometryType, LineStyle, Position,
};

pub use projection::{projection_for_code, Planar, Projection, TransverseMercator};

pub use units::{
    ground_resolution_for_scale, meters_to_pixels, mm_to_pixels, mm_to_points, pixels_to_meters,
    Orientation, PaperSize,
};
