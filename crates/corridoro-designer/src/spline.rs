//! Endpoint-anchored Bézier spline
//!
//! Fits one cubic Bézier per input segment. The inner control points sit on
//! a line through each interior vertex parallel to the line joining the
//! neighbouring segment midpoints, pulled in by `sharpness`; the outer
//! control points coincide with the endpoints, so the curve starts and ends
//! exactly where the drawn route does and passes through every vertex.

use corridoro_core::Position;
use lyon::geom::{point, CubicBezierSegment};

/// Default pull of the control points towards the vertex
pub const DEFAULT_SHARPNESS: f64 = 0.85;

/// Sample a smooth curve through `points`.
///
/// Returns `samples_per_segment` points per input segment plus the final
/// vertex. Fewer than three distinct inputs have no curvature to add and are
/// returned unchanged.
pub fn bezier_spline(points: &[Position], sharpness: f64, samples_per_segment: usize) -> Vec<Position> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let samples = samples_per_segment.max(1);

    let centers: Vec<Position> = points
        .windows(2)
        .map(|w| [(w[0][0] + w[1][0]) / 2.0, (w[0][1] + w[1][1]) / 2.0])
        .collect();

    // (incoming, outgoing) control point per vertex
    let mut controls: Vec<(Position, Position)> = Vec::with_capacity(points.len());
    controls.push((points[0], points[0]));
    for i in 0..centers.len() - 1 {
        let p = points[i + 1];
        let half_dx = (centers[i + 1][0] - centers[i][0]) / 2.0 * sharpness;
        let half_dy = (centers[i + 1][1] - centers[i][1]) / 2.0 * sharpness;
        controls.push(([p[0] - half_dx, p[1] - half_dy], [p[0] + half_dx, p[1] + half_dy]));
    }
    let last = points[points.len() - 1];
    controls.push((last, last));

    let mut curve = Vec::with_capacity((points.len() - 1) * samples + 1);
    for i in 0..points.len() - 1 {
        let segment = CubicBezierSegment {
            from: point(points[i][0], points[i][1]),
            ctrl1: point(controls[i].1[0], controls[i].1[1]),
            ctrl2: point(controls[i + 1].0[0], controls[i + 1].0[1]),
            to: point(points[i + 1][0], points[i + 1][1]),
        };
        for k in 0..samples {
            let p = segment.sample(k as f64 / samples as f64);
            curve.push([p.x, p.y]);
        }
    }
    curve.push(last);
    curve
}
