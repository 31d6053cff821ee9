//! Dissolve: topological union of corridor polygons
//!
//! Overlapping or touching polygons merge into one shape with its holes
//! resolved; disjoint polygons stay separate. Output is normalized and sorted
//! so the same area always comes out the same way.

use crate::buffer::union_all;
use crate::polygon::CorridorPolygon;
use corridoro_core::Position;
use csgrs::sketch::Sketch;

/// Convert a sketch to normalized polygons, dropping degenerate rings
pub fn sketch_to_polygons(sketch: &Sketch<()>) -> Vec<CorridorPolygon> {
    let mp = sketch.to_multipolygon();
    let mut polygons = Vec::with_capacity(mp.0.len());
    for poly in mp.0 {
        let exterior: Vec<Position> = poly.exterior().0.iter().map(|p| [p.x, p.y]).collect();
        let holes: Vec<Vec<Position>> = poly
            .interiors()
            .iter()
            .map(|ring| ring.0.iter().map(|p| [p.x, p.y]).collect())
            .collect();
        if let Some(polygon) = CorridorPolygon::from_rings(&exterior, &holes) {
            polygons.push(polygon);
        }
    }
    polygons.sort_by(|a, b| {
        let (ka, kb) = (a.sort_key(), b.sort_key());
        ka[0].total_cmp(&kb[0]).then(ka[1].total_cmp(&kb[1]))
    });
    polygons
}

/// Union sketches into normalized polygons.
///
/// The sketches are put in a canonical order first so the result does not
/// depend on the order features were drawn in.
pub fn dissolve_sketches(sketches: Vec<Sketch<()>>) -> Vec<CorridorPolygon> {
    let mut keyed: Vec<((f64, f64, f64, f64), Sketch<()>)> = sketches
        .into_iter()
        .filter_map(|s| {
            let polys = sketch_to_polygons(&s);
            let first = polys.first()?;
            let key = polys.iter().skip(1).fold(first.bounds(), |acc, p| {
                let b = p.bounds();
                (acc.0.min(b.0), acc.1.min(b.1), acc.2.max(b.2), acc.3.max(b.3))
            });
            Some((key, s))
        })
        .collect();
    keyed.sort_by(|(a, _), (b, _)| {
        a.0.total_cmp(&b.0)
            .then(a.1.total_cmp(&b.1))
            .then(a.2.total_cmp(&b.2))
            .then(a.3.total_cmp(&b.3))
    });

    let merged = union_all(keyed.into_iter().map(|(_, s)| s).collect());
    sketch_to_polygons(&merged)
}

/// Dissolve a set of polygons
pub fn dissolve(polygons: &[CorridorPolygon]) -> Vec<CorridorPolygon> {
    dissolve_sketches(polygons.iter().map(CorridorPolygon::to_sketch).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> CorridorPolygon {
        CorridorPolygon::from_rings(
            &[[x, y], [x + size, y], [x + size, y + size], [x, y + size]],
            &[],
        )
        .unwrap()
    }

    fn total_area(polys: &[CorridorPolygon]) -> f64 {
        polys.iter().map(CorridorPolygon::area).sum()
    }

    #[test]
    fn test_overlapping_squares_merge() {
        let out = dissolve(&[square(0.0, 0.0, 10.0), square(5.0, 5.0, 10.0)]);
        assert_eq!(out.len(), 1);
        assert!((total_area(&out) - 175.0).abs() < 1e-6);
    }

    #[test]
    fn test_touching_squares_merge() {
        let out = dissolve(&[square(0.0, 0.0, 10.0), square(10.0, 0.0, 10.0)]);
        assert_eq!(out.len(), 1);
        assert!((total_area(&out) - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_disjoint_squares_stay_apart() {
        let out = dissolve(&[square(100.0, 0.0, 10.0), square(0.0, 0.0, 10.0)]);
        assert_eq!(out.len(), 2);
        // Sorted by lowest vertex
        assert_eq!(out[0].exterior[0], [0.0, 0.0]);
        assert_eq!(out[1].exterior[0], [100.0, 0.0]);
    }

    #[test]
    fn test_ring_of_squares_leaves_hole() {
        let bar = |x0: f64, y0: f64, x1: f64, y1: f64| {
            CorridorPolygon::from_rings(&[[x0, y0], [x1, y0], [x1, y1], [x0, y1]], &[]).unwrap()
        };
        // Four bars around a 10x10 gap
        let pieces = [
            bar(0.0, 0.0, 30.0, 10.0),
            bar(0.0, 20.0, 30.0, 30.0),
            bar(0.0, 0.0, 10.0, 30.0),
            bar(20.0, 0.0, 30.0, 30.0),
        ];

        let out = dissolve(&pieces);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].holes.len(), 1);
        assert!((out[0].area() - 800.0).abs() < 1e-6);
    }

    #[test]
    fn test_dissolve_is_idempotent() {
        let input = [square(0.0, 0.0, 10.0), square(5.0, 5.0, 10.0), square(40.0, 0.0, 5.0)];
        let once = dissolve(&input);
        let twice = dissolve(&once);
        assert_eq!(once.len(), twice.len());
        assert!((total_area(&once) - total_area(&twice)).abs() < 1e-6);
    }

    #[test]
    fn test_empty_input() {
        assert!(dissolve(&[]).is_empty());
    }
}
