//! Corridor polygon representation
//!
//! Rings are stored open (no repeated closing vertex) and normalized so two
//! polygons covering the same area compare equal regardless of how the
//! boolean engine happened to emit them: exterior counter-clockwise, holes
//! clockwise, every ring starting at its lowest (x, y) vertex.

use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use corridoro_core::{Feature, FeatureProperties, Geometry, Position};
use csgrs::sketch::Sketch;
use csgrs::traits::CSG;
use std::cmp::Ordering;

const POS_EPS: f64 = 1e-9;
const MIN_RING_AREA: f64 = 1e-9;

/// A simple polygon with optional holes, in projected meters
#[derive(Debug, Clone, PartialEq)]
pub struct CorridorPolygon {
    pub exterior: Vec<Position>,
    pub holes: Vec<Vec<Position>>,
}

fn ring_to_polyline(ring: &[Position]) -> Polyline<f64> {
    let mut pline = Polyline::new();
    for p in ring {
        pline.add_vertex(PlineVertex::new(p[0], p[1], 0.0));
    }
    pline.set_is_closed(true);
    pline
}

/// Signed area of an open ring, positive when counter-clockwise
pub fn ring_signed_area(ring: &[Position]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    ring_to_polyline(ring).area()
}

/// Drop repeated vertices and the closing duplicate
pub fn clean_ring(ring: &[Position]) -> Vec<Position> {
    let mut out: Vec<Position> = Vec::with_capacity(ring.len());
    for p in ring {
        if let Some(last) = out.last() {
            if (p[0] - last[0]).abs() < POS_EPS && (p[1] - last[1]).abs() < POS_EPS {
                continue;
            }
        }
        out.push(*p);
    }
    if out.len() > 1 {
        let first = out[0];
        let last = out[out.len() - 1];
        if (first[0] - last[0]).abs() < POS_EPS && (first[1] - last[1]).abs() < POS_EPS {
            out.pop();
        }
    }
    out
}

fn cmp_pos(a: &Position, b: &Position) -> Ordering {
    a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1]))
}

fn normalize_ring(ring: &[Position], ccw: bool) -> Option<Vec<Position>> {
    let mut ring = clean_ring(ring);
    if ring.len() < 3 {
        return None;
    }
    let area = ring_signed_area(&ring);
    if area.abs() < MIN_RING_AREA {
        return None;
    }
    if (area > 0.0) != ccw {
        ring.reverse();
    }
    let start = ring
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| cmp_pos(a, b))
        .map(|(i, _)| i)
        .unwrap_or(0);
    ring.rotate_left(start);
    Some(ring)
}

impl CorridorPolygon {
    /// Build a normalized polygon; `None` when the exterior is degenerate.
    pub fn from_rings(exterior: &[Position], holes: &[Vec<Position>]) -> Option<Self> {
        let exterior = normalize_ring(exterior, true)?;
        let mut holes: Vec<Vec<Position>> = holes
            .iter()
            .filter_map(|h| normalize_ring(h, false))
            .collect();
        holes.sort_by(|a, b| cmp_pos(&a[0], &b[0]));
        Some(Self { exterior, holes })
    }

    /// Net area: exterior minus holes
    pub fn area(&self) -> f64 {
        let outer = ring_signed_area(&self.exterior).abs();
        let inner: f64 = self.holes.iter().map(|h| ring_signed_area(h).abs()).sum();
        outer - inner
    }

    /// Bounding box as (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.exterior.iter().fold(
            (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p[0]), min_y.min(p[1]), max_x.max(p[0]), max_y.max(p[1]))
            },
        )
    }

    /// Ordering key used to emit dissolve output deterministically
    pub(crate) fn sort_key(&self) -> Position {
        self.exterior[0]
    }

    /// As a csgrs sketch, holes cut out
    pub fn to_sketch(&self) -> Sketch<()> {
        let mut sketch: Sketch<()> = Sketch::polygon(&self.exterior, None);
        for hole in &self.holes {
            let cut: Sketch<()> = Sketch::polygon(hole, None);
            sketch = sketch.difference(&cut);
        }
        sketch
    }

    /// GeoJSON rings, each closed by repeating its first vertex
    pub fn to_rings(&self) -> Vec<Vec<Position>> {
        std::iter::once(&self.exterior)
            .chain(self.holes.iter())
            .map(|ring| {
                let mut closed = ring.clone();
                closed.push(ring[0]);
                closed
            })
            .collect()
    }

    pub fn to_feature(&self) -> Feature {
        Feature::new(
            Geometry::Polygon(self.to_rings()),
            FeatureProperties::default(),
        )
    }

    /// Parse a Polygon feature back into a corridor polygon
    pub fn from_feature(feature: &Feature) -> Option<Self> {
        match &feature.geometry {
            Some(Geometry::Polygon(rings)) if !rings.is_empty() => {
                Self::from_rings(&rings[0], &rings[1..])
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Vec<Position> {
        vec![[x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]]
    }

    #[test]
    fn test_clean_ring_drops_duplicates() {
        let ring = vec![[0.0, 0.0], [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        assert_eq!(clean_ring(&ring), vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);
    }

    #[test]
    fn test_normalization_orients_and_rotates() {
        // Clockwise square starting at a non-minimal vertex
        let cw = vec![[10.0, 10.0], [10.0, 0.0], [0.0, 0.0], [0.0, 10.0]];
        let poly = CorridorPolygon::from_rings(&cw, &[]).unwrap();
        assert_eq!(poly.exterior[0], [0.0, 0.0]);
        assert!(ring_signed_area(&poly.exterior) > 0.0);
        assert!((poly.area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_area_subtracts_holes() {
        let poly = CorridorPolygon::from_rings(&square(0.0, 0.0, 10.0), &[square(2.0, 2.0, 2.0)])
            .unwrap();
        assert_eq!(poly.holes.len(), 1);
        assert!(ring_signed_area(&poly.holes[0]) < 0.0);
        assert!((poly.area() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let flat = vec![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]];
        assert!(CorridorPolygon::from_rings(&flat, &[]).is_none());
    }

    #[test]
    fn test_feature_round_trip() {
        let poly = CorridorPolygon::from_rings(&square(0.0, 0.0, 4.0), &[]).unwrap();
        let feature = poly.to_feature();
        match &feature.geometry {
            Some(Geometry::Polygon(rings)) => {
                assert_eq!(rings[0].first(), rings[0].last());
                assert_eq!(rings[0].len(), 5);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
        assert_eq!(CorridorPolygon::from_feature(&feature), Some(poly));
    }

    #[test]
    fn test_bounds() {
        let poly = CorridorPolygon::from_rings(&square(-3.0, 2.0, 4.0), &[]).unwrap();
        assert_eq!(poly.bounds(), (-3.0, 2.0, 1.0, 6.0));
    }
}
