use corridoro_core::{Feature, FeatureCollection, Geometry, LineStyle};
use corridoro_designer::{CorridorPolygon, CorridorSynthesizer};
use std::f64::consts::PI;

fn polygons(out: &FeatureCollection) -> Vec<CorridorPolygon> {
    out.iter().filter_map(CorridorPolygon::from_feature).collect()
}

fn total_area(out: &FeatureCollection) -> f64 {
    polygons(out).iter().map(CorridorPolygon::area).sum()
}

#[test]
fn test_point_becomes_disk() {
    let synth = CorridorSynthesizer::default();
    let out = synth.synthesize(&FeatureCollection::new(vec![Feature::point([0.0, 0.0], 50.0)]));
    assert_eq!(out.len(), 1);
    let expected = PI * 25.0 * 25.0;
    assert!((total_area(&out) - expected).abs() / expected < 0.01);
}

#[test]
fn test_straight_segment_becomes_stadium() {
    let synth = CorridorSynthesizer::default();
    let line = Feature::line(vec![[0.0, 0.0], [100.0, 0.0]], 50.0, LineStyle::Straight);
    let out = synth.synthesize(&FeatureCollection::new(vec![line]));
    assert_eq!(out.len(), 1);
    // 100 x 50 rectangle plus two half disks of radius 25
    let expected = 100.0 * 50.0 + PI * 25.0 * 25.0;
    assert!((total_area(&out) - expected).abs() / expected < 0.01);

    let (min_x, min_y, max_x, max_y) = polygons(&out)[0].bounds();
    assert!((min_x + 25.0).abs() < 0.1);
    assert!((max_x - 125.0).abs() < 0.1);
    assert!((min_y + 25.0).abs() < 0.1);
    assert!((max_y - 25.0).abs() < 0.1);
}

#[test]
fn test_close_points_merge() {
    let synth = CorridorSynthesizer::default();
    let input = FeatureCollection::new(vec![
        Feature::point([0.0, 0.0], 50.0),
        Feature::point([40.0, 0.0], 50.0),
    ]);
    let out = synth.synthesize(&input);
    assert_eq!(out.len(), 1);
    assert!(total_area(&out) < 2.0 * PI * 625.0);
}

#[test]
fn test_distant_points_stay_apart() {
    let synth = CorridorSynthesizer::default();
    let input = FeatureCollection::new(vec![
        Feature::point([0.0, 0.0], 50.0),
        Feature::point([200.0, 0.0], 50.0),
    ]);
    let out = synth.synthesize(&input);
    assert_eq!(out.len(), 2);
    let expected = 2.0 * PI * 625.0;
    assert!((total_area(&out) - expected).abs() / expected < 0.01);
}

#[test]
fn test_polygon_passes_through_unchanged() {
    let synth = CorridorSynthesizer::default();
    let mut polygon = Feature::polygon(vec![vec![
        [0.0, 0.0],
        [10.0, 0.0],
        [10.0, 10.0],
        [0.0, 0.0],
    ]]);
    polygon.properties.width = Some(30.0);
    let out = synth.synthesize(&FeatureCollection::new(vec![polygon.clone()]));
    assert_eq!(out.features, vec![polygon]);
}

#[test]
fn test_pass_through_follows_corridors() {
    let synth = CorridorSynthesizer::default();
    let polygon = Feature::polygon(vec![vec![[500.0, 500.0], [510.0, 500.0], [510.0, 510.0], [500.0, 500.0]]]);
    let input = FeatureCollection::new(vec![polygon.clone(), Feature::point([0.0, 0.0], 20.0)]);
    let out = synth.synthesize(&input);
    assert_eq!(out.len(), 2);
    assert_eq!(out.features[0].geometry_type(), Some(corridoro_core::GeometryType::Polygon));
    assert_eq!(out.features[1], polygon);
}

#[test]
fn test_line_with_bbox_is_buffered() {
    let synth = CorridorSynthesizer::default();
    let raw = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"width": 50},
         "geometry": {"type": "LineString", "bbox": [0, 0, 100, 0],
                      "coordinates": [[0, 0], [100, 0]]}}
    ]}"#;
    let out = synth.synthesize(&FeatureCollection::from_json(raw).unwrap());
    assert_eq!(out.len(), 1);
    assert_eq!(out.features[0].geometry_type(), Some(corridoro_core::GeometryType::Polygon));
    let expected = 100.0 * 50.0 + PI * 625.0;
    assert!((total_area(&out) - expected).abs() / expected < 0.01);
}

#[test]
fn test_empty_collection() {
    let synth = CorridorSynthesizer::default();
    assert!(synth.synthesize(&FeatureCollection::default()).is_empty());
}

#[test]
fn test_curved_route_starts_and_ends_at_vertices() {
    let synth = CorridorSynthesizer::default();
    let route = vec![[0.0, 0.0], [100.0, 80.0], [200.0, 0.0], [300.0, 80.0]];
    let out = synth.synthesize(&FeatureCollection::new(vec![Feature::line(
        route,
        20.0,
        LineStyle::Curved,
    )]));
    assert_eq!(out.len(), 1);
    let (min_x, _, max_x, _) = polygons(&out)[0].bounds();
    // Round caps reach exactly half the width past the anchored endpoints
    assert!((min_x + 10.0).abs() < 0.5);
    assert!((max_x - 310.0).abs() < 0.5);
}

#[test]
fn test_unsupported_geometry_type_passes_through() {
    let json = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","geometry":{"type":"MultiPoint","coordinates":[[0,0],[1,1]]},"properties":{"width":10}}
    ]}"#;
    let input = FeatureCollection::from_json(json).unwrap();
    let out = CorridorSynthesizer::default().synthesize(&input);
    assert_eq!(out.len(), 1);
    assert!(matches!(out.features[0].geometry, Some(Geometry::Other(_))));
}
