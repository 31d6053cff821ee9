//! Page and ground scale conversions
//!
//! Converts between page pixels at a print resolution and ground meters
//! at a map scale, and between a map scale and the display resolution a
//! view must use so that a rendered page is metrically true.

use crate::projection::Projection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Meters in one inch
pub const METERS_PER_INCH: f64 = 0.0254;

/// Millimeters in one inch
pub const MM_PER_INCH: f64 = 25.4;

/// PDF points in one inch
pub const POINTS_PER_INCH: f64 = 72.0;

/// Ground meters covered by `pixels` page pixels printed at `dpi` on a
/// map of scale 1:`scale`.
pub fn pixels_to_meters(pixels: f64, dpi: f64, scale: f64) -> f64 {
    pixels * METERS_PER_INCH / dpi * scale
}

/// Inverse of [`pixels_to_meters`].
pub fn meters_to_pixels(meters: f64, dpi: f64, scale: f64) -> f64 {
    meters * dpi / (METERS_PER_INCH * scale)
}

/// Page length in millimeters to a whole pixel count at `dpi`.
pub fn mm_to_pixels(mm: f64, dpi: f64) -> u32 {
    (mm * dpi / MM_PER_INCH).round().max(0.0) as u32
}

/// Page length in millimeters to PDF points.
pub fn mm_to_points(mm: f64) -> f64 {
    mm * POINTS_PER_INCH / MM_PER_INCH
}

/// Display resolution (map units per pixel) that makes one page unit cover
/// `scale` ground meters at `center`.
///
/// `scale` is ground meters per page unit and `dots_per_unit` the number of
/// pixels in that page unit; with millimeters, a 1:10000 map at 300 dpi is
/// `ground_resolution_for_scale(10.0, 300.0 / 25.4, ..)`. The projection's
/// point resolution corrects for its distortion away from the true-scale line.
pub fn ground_resolution_for_scale(
    scale: f64,
    dots_per_unit: f64,
    center: [f64; 2],
    projection: &dyn Projection,
) -> f64 {
    scale / projection.point_resolution(dots_per_unit, center)
}

/// Page orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Long edge vertical
    Portrait,
    /// Long edge horizontal
    #[default]
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Portrait => write!(f, "portrait"),
            Self::Landscape => write!(f, "landscape"),
        }
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "portrait" | "p" => Ok(Self::Portrait),
            "landscape" | "l" => Ok(Self::Landscape),
            _ => Err(format!("Unknown orientation: {}", s)),
        }
    }
}

/// Physical paper format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaperSize {
    A3,
    #[default]
    A4,
    A5,
    Letter,
}

impl PaperSize {
    /// Portrait dimensions (width, height) in millimeters
    pub fn portrait_mm(self) -> (f64, f64) {
        match self {
            Self::A3 => (297.0, 420.0),
            Self::A4 => (210.0, 297.0),
            Self::A5 => (148.0, 210.0),
            Self::Letter => (215.9, 279.4),
        }
    }

    /// Dimensions (width, height) in millimeters for an orientation
    pub fn dimensions_mm(self, orientation: Orientation) -> (f64, f64) {
        let (w, h) = self.portrait_mm();
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A3 => write!(f, "A3"),
            Self::A4 => write!(f, "A4"),
            Self::A5 => write!(f, "A5"),
            Self::Letter => write!(f, "Letter"),
        }
    }
}

impl FromStr for PaperSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a3" => Ok(Self::A3),
            "a4" => Ok(Self::A4),
            "a5" => Ok(Self::A5),
            "letter" => Ok(Self::Letter),
            _ => Err(format!("Unknown paper size: {}", s)),
        }
    }
}
