//! Corridor synthesis
//!
//! Per-feature transform selected by geometry type, followed by a dissolve
//! of every buffered feature:
//!
//! | Geometry | Transform |
//! |---|---|
//! | `Point` | disk of radius `width / 2` |
//! | `LineString`, `style: curved` | spline through the vertices, then band of `width / 2` |
//! | `LineString`, otherwise | band of `width / 2` along the vertices |
//! | anything else | passed through unchanged |
//!
//! Geometry problems never fail the synthesis; the offending feature is
//! logged and passed through.

use crate::buffer::{buffer_point, buffer_polyline};
use crate::dissolve::{dissolve_sketches, sketch_to_polygons};
use crate::spline::{bezier_spline, DEFAULT_SHARPNESS};
use corridoro_core::{Feature, FeatureCollection, Geometry, GeometryError, LineStyle};
use csgrs::sketch::Sketch;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Corridor synthesis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorridorOptions {
    /// Width in meters for features that carry none
    pub default_width: f64,
    /// Vertices used to approximate a full circle
    pub circle_segments: usize,
    /// Spline samples per drawn segment of a curved route
    pub spline_samples_per_segment: usize,
    /// Spline control point pull, 0 (polyline) to 1
    pub spline_sharpness: f64,
}

impl Default for CorridorOptions {
    fn default() -> Self {
        Self {
            default_width: 50.0,
            circle_segments: 64,
            spline_samples_per_segment: 32,
            spline_sharpness: DEFAULT_SHARPNESS,
        }
    }
}

/// Outcome of transforming one feature
#[derive(Clone)]
pub enum Corridorized {
    /// Buffered corridor of the feature
    Buffered(Sketch<()>),
    /// Feature kept as it was
    PassThrough(Feature),
}

/// Builds merged corridor polygons from drawn features
#[derive(Debug, Clone, Default)]
pub struct CorridorSynthesizer {
    options: CorridorOptions,
}

impl CorridorSynthesizer {
    pub fn new(options: CorridorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CorridorOptions {
        &self.options
    }

    fn buffer_feature(&self, feature: &Feature) -> Result<Sketch<()>, GeometryError> {
        let segments = self.options.circle_segments;
        match &feature.geometry {
            Some(Geometry::Point(p)) => {
                let width = feature.properties.corridor_width(self.options.default_width)?;
                Ok(buffer_point(*p, width / 2.0, segments))
            }
            Some(Geometry::LineString(points)) => {
                if points.is_empty() {
                    return Err(GeometryError::InvalidCoordinates(
                        "LineString has no vertices".to_string(),
                    ));
                }
                let width = feature.properties.corridor_width(self.options.default_width)?;
                let path = match feature.properties.line_style() {
                    LineStyle::Curved => bezier_spline(
                        points,
                        self.options.spline_sharpness,
                        self.options.spline_samples_per_segment,
                    ),
                    LineStyle::Straight => points.clone(),
                };
                Ok(buffer_polyline(&path, width / 2.0, segments))
            }
            Some(other) => Err(GeometryError::UnsupportedGeometry {
                geometry_type: other.geometry_type().to_string(),
            }),
            None => Err(GeometryError::UnsupportedGeometry {
                geometry_type: "null".to_string(),
            }),
        }
    }

    /// Transform a single feature without merging
    pub fn corridorize_feature(&self, feature: &Feature) -> Corridorized {
        match self.buffer_feature(feature) {
            Ok(sketch) => Corridorized::Buffered(sketch),
            Err(err @ GeometryError::UnsupportedGeometry { .. }) => {
                debug!("Passing feature through: {}", err);
                Corridorized::PassThrough(feature.clone())
            }
            Err(err) => {
                warn!("Passing feature through: {}", err);
                Corridorized::PassThrough(feature.clone())
            }
        }
    }

    /// Buffer every feature individually, no dissolve.
    ///
    /// Buffered features come out as Polygon features in input order,
    /// pass-through features keep their slot.
    pub fn corridorize(&self, features: &FeatureCollection) -> FeatureCollection {
        features
            .iter()
            .flat_map(|feature| match self.corridorize_feature(feature) {
                Corridorized::Buffered(sketch) => sketch_to_polygons(&sketch)
                    .iter()
                    .map(|p| {
                        let mut out = p.to_feature();
                        out.id = feature.id.clone();
                        out
                    })
                    .collect::<Vec<_>>(),
                Corridorized::PassThrough(f) => vec![f],
            })
            .collect()
    }

    /// Buffer every feature and dissolve the result.
    ///
    /// The output holds the merged corridor polygons, ordered by their lowest
    /// vertex, followed by pass-through features in input order. It always
    /// replaces any previous result wholesale.
    pub fn synthesize(&self, features: &FeatureCollection) -> FeatureCollection {
        let mut buffered = Vec::new();
        let mut passed = Vec::new();
        for feature in features.iter() {
            match self.corridorize_feature(feature) {
                Corridorized::Buffered(sketch) => buffered.push(sketch),
                Corridorized::PassThrough(f) => passed.push(f),
            }
        }

        let buffered_count = buffered.len();
        let polygons = dissolve_sketches(buffered);
        debug!(
            "Synthesized {} corridor polygons from {} buffered features ({} passed through)",
            polygons.len(),
            buffered_count,
            passed.len()
        );

        polygons
            .iter()
            .map(|p| p.to_feature())
            .chain(passed)
            .collect()
    }
}
