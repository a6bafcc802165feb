#![allow(dead_code)]

use maskpack::annotation::{Point, Shape};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const MAX_CANVAS: u32 = 24;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Canvas sizes, including degenerate ones.
pub fn arb_canvas() -> BoxedStrategy<(u32, u32)> {
    (0..=MAX_CANVAS, 0..=MAX_CANVAS).boxed()
}

/// Points that mostly land on the canvas and sometimes spill past it.
pub fn arb_point(width: u32, height: u32) -> BoxedStrategy<Point> {
    let margin = 4.0;
    (
        -margin..f64::from(width) + margin,
        -margin..f64::from(height) + margin,
    )
        .prop_map(|(x, y)| Point::new(x, y))
        .boxed()
}

/// Possibly self-intersecting polygons with 3 to 8 vertices.
pub fn arb_polygon(width: u32, height: u32) -> BoxedStrategy<Vec<Point>> {
    prop::collection::vec(arb_point(width, height), 3..=8).boxed()
}

/// Label spellings the built-in tables know, plus noise.
pub fn arb_label() -> BoxedStrategy<String> {
    prop_oneof![
        Just("head".to_string()),
        Just(" Head ".to_string()),
        Just("hand".to_string()),
        Just("HANDS".to_string()),
        Just("body".to_string()),
        Just("torso".to_string()),
        "[a-z]{0,6}",
    ]
    .boxed()
}

pub fn arb_shapes(width: u32, height: u32) -> BoxedStrategy<Vec<Shape>> {
    prop::collection::vec(
        (arb_label(), arb_polygon(width, height))
            .prop_map(|(label, points)| Shape::polygon(label, points)),
        0..6,
    )
    .boxed()
}
