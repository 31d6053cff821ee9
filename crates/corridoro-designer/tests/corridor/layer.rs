use corridoro_core::{Feature, Geometry, LineStyle};
use corridoro_designer::{CorridorLayer, CorridorSynthesizer, DrawingSource};
use std::sync::Arc;

#[test]
fn test_layer_follows_source_edits() {
    let layer = Arc::new(CorridorLayer::new(CorridorSynthesizer::default()));
    let mut source = DrawingSource::new(50.0, LineStyle::Curved);
    source.subscribe(layer.clone());

    let a = source.add(Feature::point([0.0, 0.0], 50.0));
    let b = source.add(Feature::point([200.0, 0.0], 50.0));
    assert_eq!(layer.snapshot().len(), 2);

    // Moving b next to a merges the two corridors
    source.replace_geometry(b, Geometry::Point([30.0, 0.0]));
    assert_eq!(layer.snapshot().len(), 1);

    source.remove(a);
    assert_eq!(layer.snapshot().len(), 1);
}

#[test]
fn test_output_handle_sees_replacements() {
    let layer = Arc::new(CorridorLayer::new(CorridorSynthesizer::default()));
    let handle = layer.output();
    let mut source = DrawingSource::default();
    source.subscribe(layer.clone());

    source.add_drawn(vec![[0.0, 0.0], [100.0, 0.0], [100.0, 100.0]]);
    assert_eq!(handle.read().len(), 1);
    source.clear();
    assert!(handle.read().is_empty());
}
