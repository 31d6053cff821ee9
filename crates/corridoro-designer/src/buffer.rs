//! Geometry buffering
//!
//! Buffers are built from csgrs sketches: a disk per point, and for a
//! polyline one band per segment plus a disk at every vertex, which gives
//! round caps and round joins. The pieces are merged with [`union_all`].

use corridoro_core::Position;
use csgrs::sketch::Sketch;
use csgrs::traits::CSG;
use nalgebra::{Matrix4, Vector3};

const POS_EPS: f64 = 1e-9;

/// Disk approximating a circle of `radius` around `center`
pub fn buffer_point(center: Position, radius: f64, segments: usize) -> Sketch<()> {
    let disk: Sketch<()> = Sketch::circle(radius, segments, None);
    disk.transform(&Matrix4::new_translation(&Vector3::new(
        center[0], center[1], 0.0,
    )))
}

/// Rectangle of half-width `radius` along the segment `p1 -> p2`, no caps
fn segment_band(p1: Position, p2: Position, radius: f64) -> Option<Sketch<()>> {
    let dx = p2[0] - p1[0];
    let dy = p2[1] - p1[1];
    let len = (dx * dx + dy * dy).sqrt();
    if len < POS_EPS {
        return None;
    }

    // Unit normal scaled to the buffer radius
    let nx = -dy / len * radius;
    let ny = dx / len * radius;

    let pts = [
        [p1[0] + nx, p1[1] + ny],
        [p1[0] - nx, p1[1] - ny],
        [p2[0] - nx, p2[1] - ny],
        [p2[0] + nx, p2[1] + ny],
    ];
    Some(Sketch::polygon(&pts, None))
}

/// Round-capped, round-joined band of half-width `radius` along `points`
pub fn buffer_polyline(points: &[Position], radius: f64, segments: usize) -> Sketch<()> {
    let mut vertices: Vec<Position> = Vec::with_capacity(points.len());
    for p in points {
        let repeated = vertices
            .last()
            .is_some_and(|last| (p[0] - last[0]).abs() < POS_EPS && (p[1] - last[1]).abs() < POS_EPS);
        if !repeated {
            vertices.push(*p);
        }
    }

    match vertices.len() {
        0 => Sketch::new(),
        1 => buffer_point(vertices[0], radius, segments),
        _ => {
            let mut pieces: Vec<Sketch<()>> = vertices
                .windows(2)
                .filter_map(|w| segment_band(w[0], w[1], radius))
                .collect();
            pieces.extend(vertices.iter().map(|v| buffer_point(*v, radius, segments)));
            union_all(pieces)
        }
    }
}

/// Union of every sketch, merged pairwise so no intermediate grows lopsided
pub fn union_all(mut sketches: Vec<Sketch<()>>) -> Sketch<()> {
    while sketches.len() > 1 {
        let mut merged = Vec::with_capacity(sketches.len().div_ceil(2));
        let mut iter = sketches.into_iter();
        while let Some(a) = iter.next() {
            match iter.next() {
                Some(b) => merged.push(a.union(&b)),
                None => merged.push(a),
            }
        }
        sketches = merged;
    }
    sketches.pop().unwrap_or_else(Sketch::new)
}
