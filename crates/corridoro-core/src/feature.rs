//! GeoJSON-like feature model
//!
//! Drawn routes and points arrive as a `FeatureCollection`. Geometries the
//! corridor pipeline understands are parsed into typed variants; anything else
//! is kept verbatim so it can be passed through untouched.

use crate::error::GeometryError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A coordinate pair in the working projected CRS
pub type Position = [f64; 2];

/// Geometry type tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    Other(String),
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "Point"),
            Self::LineString => write!(f, "LineString"),
            Self::Polygon => write!(f, "Polygon"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Wire form of a geometry, preserving members this crate does not model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Feature geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawGeometry", into = "RawGeometry")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    /// Rings; the first is the exterior, the rest are holes
    Polygon(Vec<Vec<Position>>),
    /// Any geometry kept verbatim
    Other(RawGeometry),
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Point(_) => GeometryType::Point,
            Self::LineString(_) => GeometryType::LineString,
            Self::Polygon(_) => GeometryType::Polygon,
            Self::Other(raw) => GeometryType::Other(raw.kind.clone()),
        }
    }
}

fn parse_position(value: &Value) -> Option<Position> {
    let arr = value.as_array()?;
    if arr.len() < 2 {
        return None;
    }
    let x = arr[0].as_f64()?;
    let y = arr[1].as_f64()?;
    (x.is_finite() && y.is_finite()).then_some([x, y])
}

fn parse_positions(value: &Value) -> Option<Vec<Position>> {
    value.as_array()?.iter().map(parse_position).collect()
}

fn parse_rings(value: &Value) -> Option<Vec<Vec<Position>>> {
    value.as_array()?.iter().map(parse_positions).collect()
}

impl From<RawGeometry> for Geometry {
    /// Typed variants carry coordinates only; foreign members such as `bbox`
    /// describe the coordinates as read and are dropped with them.
    fn from(raw: RawGeometry) -> Self {
        let parsed = raw.coordinates.as_ref().and_then(|c| match raw.kind.as_str() {
            "Point" => parse_position(c).map(Geometry::Point),
            "LineString" => parse_positions(c).map(Geometry::LineString),
            "Polygon" => parse_rings(c).map(Geometry::Polygon),
            _ => None,
        });
        match parsed {
            Some(geometry) => {
                if !raw.rest.is_empty() {
                    tracing::debug!(
                        "Dropping {} foreign members of {} geometry",
                        raw.rest.len(),
                        raw.kind
                    );
                }
                geometry
            }
            None => Geometry::Other(raw),
        }
    }
}

/// `"properties": null` is valid GeoJSON and reads as no properties
fn null_as_default<'de, D>(deserializer: D) -> Result<FeatureProperties, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<FeatureProperties>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<Geometry> for RawGeometry {
    fn from(geometry: Geometry) -> Self {
        let (kind, coordinates) = match geometry {
            Geometry::Point(p) => ("Point", Value::from(p.to_vec())),
            Geometry::LineString(line) => (
                "LineString",
                Value::from(line.iter().map(|p| p.to_vec()).collect::<Vec<_>>()),
            ),
            Geometry::Polygon(rings) => (
                "Polygon",
                Value::from(
                    rings
                        .iter()
                        .map(|ring| ring.iter().map(|p| p.to_vec()).collect::<Vec<_>>())
                        .collect::<Vec<_>>(),
                ),
            ),
            Geometry::Other(raw) => return raw,
        };
        RawGeometry {
            kind: kind.to_string(),
            coordinates: Some(coordinates),
            rest: Map::new(),
        }
    }
}

/// How a LineString corridor follows its vertices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    /// Polyline through the vertices as drawn
    #[default]
    Straight,
    /// Smooth spline through the vertices
    Curved,
}

impl fmt::Display for LineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Straight => write!(f, "straight"),
            Self::Curved => write!(f, "curved"),
        }
    }
}

/// Feature properties
///
/// `width` and `style` drive the corridor transform; every other member is
/// preserved as-is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureProperties {
    /// Corridor width in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// `"curved"` or `"straight"`; only meaningful for LineStrings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureProperties {
    pub fn new(width: f64, style: LineStyle) -> Self {
        Self {
            width: Some(width),
            style: Some(style.to_string()),
            extra: Map::new(),
        }
    }

    /// Line style; anything but `"curved"` is straight
    pub fn line_style(&self) -> LineStyle {
        match self.style.as_deref() {
            Some("curved") => LineStyle::Curved,
            _ => LineStyle::Straight,
        }
    }

    /// Corridor width, falling back to `default_width` when unset.
    ///
    /// Returns an error for widths that are not positive and finite.
    pub fn corridor_width(&self, default_width: f64) -> Result<f64, GeometryError> {
        let width = self.width.unwrap_or(default_width);
        if width.is_finite() && width > 0.0 {
            Ok(width)
        } else {
            Err(GeometryError::InvalidWidth { width })
        }
    }
}

/// A single drawn or derived feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub geometry: Option<Geometry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: FeatureProperties,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: FeatureProperties) -> Self {
        Self {
            id: None,
            geometry: Some(geometry),
            properties,
        }
    }

    pub fn point(position: Position, width: f64) -> Self {
        Self::new(
            Geometry::Point(position),
            FeatureProperties {
                width: Some(width),
                ..Default::default()
            },
        )
    }

    pub fn line(positions: Vec<Position>, width: f64, style: LineStyle) -> Self {
        Self::new(
            Geometry::LineString(positions),
            FeatureProperties::new(width, style),
        )
    }

    pub fn polygon(rings: Vec<Vec<Position>>) -> Self {
        Self::new(Geometry::Polygon(rings), FeatureProperties::default())
    }

    pub fn geometry_type(&self) -> Option<GeometryType> {
        self.geometry.as_ref().map(Geometry::geometry_type)
    }
}

/// Ordered collection of features
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
