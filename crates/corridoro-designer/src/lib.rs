//! # CorridorO Designer
//!
//! Turns drawn routes and control points into corridors: the band of safe
//! terrain around a sketch that the printed map keeps visible.
//!
//! ## Pipeline
//!
//! ```text
//! DrawingSource (features, mutated by the editor)
//!   └── CorridorLayer::recompute()         (on every change)
//!         └── CorridorSynthesizer
//!               ├── Point       -> disk of radius width/2
//!               ├── LineString  -> [spline] -> round-capped band of width/2
//!               ├── other       -> passed through
//!               └── dissolve    -> union of all bands
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use corridoro_designer::{CorridorOptions, CorridorSynthesizer};
//!
//! let synth = CorridorSynthesizer::new(CorridorOptions::default());
//! let corridors = synth.synthesize(&features);
//! ```

pub mod buffer;
pub mod corridor;
pub mod dissolve;
pub mod polygon;
pub mod source;
pub mod spline;

pub use corridor::{CorridorOptions, CorridorSynthesizer, Corridorized};
pub use dissolve::dissolve;
pub use polygon::CorridorPolygon;
pub use source::{
    CorridorLayer, DrawingSource, FeatureKey, SharedFeatures, SourceListener, SubscriptionId,
};
