use maskpack::annotation::Shape;
use maskpack::labels::{CanonicalClass, LabelTable, MaskScheme};
use maskpack::raster::{rasterize_polygon, MaskCompositor, OverlapPriority, Raster};
use proptest::prelude::*;

mod proptest_helpers;

fn compositor(priority: OverlapPriority) -> MaskCompositor {
    MaskCompositor::new(LabelTable::for_scheme(MaskScheme::ThreeClass), priority)
}

/// Union of the rasters of every shape normalizing to `class`.
fn class_union(shapes: &[Shape], class: CanonicalClass, width: u32, height: u32) -> Raster {
    let labels = LabelTable::for_scheme(MaskScheme::ThreeClass);
    let mut union = Raster::new(width, height);
    for shape in shapes {
        if labels.normalize(&shape.label) == Some(class) {
            union.union_with(&rasterize_polygon(width, height, &shape.points));
        }
    }
    union
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn rasterize_is_deterministic(
        (w, h, points) in proptest_helpers::arb_canvas()
            .prop_flat_map(|(w, h)| (Just(w), Just(h), proptest_helpers::arb_polygon(w, h)))
    ) {
        let first = rasterize_polygon(w, h, &points);
        let second = rasterize_polygon(w, h, &points);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.dims(), (w, h));
    }

    #[test]
    fn head_priority_keeps_head_and_hand_disjoint(
        (w, h, shapes) in proptest_helpers::arb_canvas()
            .prop_flat_map(|(w, h)| (Just(w), Just(h), proptest_helpers::arb_shapes(w, h)))
    ) {
        let mask = compositor(OverlapPriority::Head).composite(&shapes, w, h);
        let head = mask.layer(CanonicalClass::Head).unwrap();
        let hand = mask.layer(CanonicalClass::Hand).unwrap();

        prop_assert!(!head.intersects(hand));

        let mut expected_hand = class_union(&shapes, CanonicalClass::Hand, w, h);
        let expected_head = class_union(&shapes, CanonicalClass::Head, w, h);
        expected_hand.subtract(&expected_head);
        prop_assert_eq!(head, &expected_head);
        prop_assert_eq!(hand, &expected_hand);
        prop_assert_eq!(
            mask.layer(CanonicalClass::Body).unwrap(),
            &class_union(&shapes, CanonicalClass::Body, w, h)
        );
    }

    #[test]
    fn hand_priority_mirrors_head_priority(
        (w, h, shapes) in proptest_helpers::arb_canvas()
            .prop_flat_map(|(w, h)| (Just(w), Just(h), proptest_helpers::arb_shapes(w, h)))
    ) {
        let mask = compositor(OverlapPriority::Hand).composite(&shapes, w, h);
        let head = mask.layer(CanonicalClass::Head).unwrap();
        let hand = mask.layer(CanonicalClass::Hand).unwrap();

        prop_assert!(!head.intersects(hand));
        prop_assert_eq!(hand, &class_union(&shapes, CanonicalClass::Hand, w, h));
    }

    #[test]
    fn shape_order_does_not_matter(
        (w, h, shapes) in proptest_helpers::arb_canvas()
            .prop_flat_map(|(w, h)| (Just(w), Just(h), proptest_helpers::arb_shapes(w, h)))
    ) {
        let mut reversed = shapes.clone();
        reversed.reverse();
        let compositor = compositor(OverlapPriority::Head);
        prop_assert_eq!(
            compositor.composite(&shapes, w, h).encode(),
            compositor.composite(&reversed, w, h).encode()
        );
    }

    #[test]
    fn short_polygons_contribute_nothing(
        (w, h, shapes) in proptest_helpers::arb_canvas()
            .prop_flat_map(|(w, h)| (Just(w), Just(h), proptest_helpers::arb_shapes(w, h)))
    ) {
        let truncated: Vec<Shape> = shapes
            .into_iter()
            .map(|mut shape| {
                shape.points.truncate(2);
                shape
            })
            .collect();
        let encoded = compositor(OverlapPriority::Head).composite(&truncated, w, h).encode();
        prop_assert!(encoded.iter().all(|&b| b == 0));
    }
}
