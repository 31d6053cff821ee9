use corridoro_core::{Feature, FeatureCollection, LineStyle};
use corridoro_designer::{dissolve, CorridorPolygon, CorridorSynthesizer};
use proptest::prelude::*;

fn polygons(out: &FeatureCollection) -> Vec<CorridorPolygon> {
    out.iter().filter_map(CorridorPolygon::from_feature).collect()
}

fn same_ring(a: &[[f64; 2]], b: &[[f64; 2]]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(p, q)| (p[0] - q[0]).abs() < 1e-6 && (p[1] - q[1]).abs() < 1e-6)
}

/// Vertex for vertex equality up to float noise from the boolean engine
fn same_polygons(a: &[CorridorPolygon], b: &[CorridorPolygon]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(p, q)| {
            same_ring(&p.exterior, &q.exterior)
                && p.holes.len() == q.holes.len()
                && p.holes.iter().zip(&q.holes).all(|(h, k)| same_ring(h, k))
        })
}

fn feature_strategy() -> impl Strategy<Value = Feature> {
    let coord = -500.0f64..500.0;
    prop_oneof![
        ((coord.clone(), coord.clone()), 5.0f64..80.0)
            .prop_map(|((x, y), w)| Feature::point([x, y], w)),
        (
            prop::collection::vec((coord.clone(), coord), 2..5),
            5.0f64..60.0,
            any::<bool>()
        )
            .prop_map(|(route, w, curved)| {
                let route = route.into_iter().map(|(x, y)| [x, y]).collect();
                let style = if curved { LineStyle::Curved } else { LineStyle::Straight };
                Feature::line(route, w, style)
            }),
    ]
}

fn area(out: &FeatureCollection) -> f64 {
    out.iter()
        .filter_map(CorridorPolygon::from_feature)
        .map(|p| p.area())
        .sum()
}

#[test]
fn test_dissolve_of_output_is_identity() {
    let synth = CorridorSynthesizer::default();
    let input = FeatureCollection::new(vec![
        Feature::point([0.0, 0.0], 50.0),
        Feature::point([30.0, 10.0], 50.0),
        Feature::line(vec![[200.0, 0.0], [300.0, 50.0]], 20.0, LineStyle::Straight),
    ]);
    let once = polygons(&synth.synthesize(&input));
    let again = dissolve(&once);
    assert!(same_polygons(&again, &once), "{again:?} != {once:?}");
}

#[test]
fn test_input_order_does_not_matter() {
    let synth = CorridorSynthesizer::default();
    let a = Feature::point([0.0, 0.0], 50.0);
    let b = Feature::line(vec![[20.0, 0.0], [120.0, 30.0]], 30.0, LineStyle::Straight);
    let c = Feature::point([400.0, 400.0], 25.0);

    let forward = synth.synthesize(&FeatureCollection::new(vec![a.clone(), b.clone(), c.clone()]));
    let backward = synth.synthesize(&FeatureCollection::new(vec![c, b, a]));
    assert_eq!(forward.len(), backward.len());
    assert!((area(&forward) - area(&backward)).abs() / area(&forward) < 1e-6);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_dissolve_is_idempotent(features in prop::collection::vec(feature_strategy(), 1..6)) {
        let synth = CorridorSynthesizer::default();
        let once = polygons(&synth.synthesize(&FeatureCollection::new(features)));
        let again = dissolve(&once);
        prop_assert!(same_polygons(&again, &once), "{:?} != {:?}", again, once);
    }

    #[test]
    fn prop_wider_corridor_never_smaller(w1 in 2.0f64..80.0, extra in 1.0f64..40.0) {
        let synth = CorridorSynthesizer::default();
        let route = vec![[0.0, 0.0], [60.0, 20.0], [120.0, 0.0]];
        let narrow = synth.synthesize(&FeatureCollection::new(vec![
            Feature::line(route.clone(), w1, LineStyle::Straight),
        ]));
        let wide = synth.synthesize(&FeatureCollection::new(vec![
            Feature::line(route, w1 + extra, LineStyle::Straight),
        ]));
        prop_assert!(area(&wide) >= area(&narrow));
    }

    #[test]
    fn prop_point_area_matches_disk(x in -1e4f64..1e4, y in -1e4f64..1e4, w in 1.0f64..200.0) {
        let synth = CorridorSynthesizer::default();
        let out = synth.synthesize(&FeatureCollection::new(vec![Feature::point([x, y], w)]));
        let expected = std::f64::consts::PI * (w / 2.0).powi(2);
        prop_assert!((area(&out) - expected).abs() / expected < 0.01);
    }
}
