//! Multi-class mask compositing.
//!
//! Every class is first reduced to the union of its polygons, which does not
//! depend on shape order. The head/hand overlap rule is then applied once
//! between the two final unions. Body never takes part in the rule.

use serde::{Deserialize, Serialize};

use super::{rasterize_polygon, Raster};
use crate::annotation::Shape;
use crate::labels::{CanonicalClass, LabelTable, MaskScheme};

/// Which class keeps a pixel claimed by both head and hand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPriority {
    /// Hand pixels under the head are cleared.
    #[default]
    Head,
    /// Head pixels under a hand are cleared.
    Hand,
}

impl OverlapPriority {
    pub fn name(self) -> &'static str {
        match self {
            OverlapPriority::Head => "head",
            OverlapPriority::Hand => "hand",
        }
    }

    fn winner_and_loser(self) -> (CanonicalClass, CanonicalClass) {
        match self {
            OverlapPriority::Head => (CanonicalClass::Head, CanonicalClass::Hand),
            OverlapPriority::Hand => (CanonicalClass::Hand, CanonicalClass::Head),
        }
    }
}

/// What happened to the shapes of one annotation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompositeStats {
    /// Polygons rasterized into a class.
    pub used: usize,
    /// Distinct labels that did not normalize, in first-seen order.
    pub unrecognized: Vec<String>,
    /// Shapes whose type is not polygon.
    pub non_polygon: usize,
    /// Polygons with fewer than three points.
    pub degenerate: usize,
}

/// Final per-class rasters of one sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeMask {
    width: u32,
    height: u32,
    layers: Vec<(CanonicalClass, Raster)>,
}

impl CompositeMask {
    fn empty(scheme: MaskScheme, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layers: scheme
                .classes()
                .iter()
                .map(|&class| (class, Raster::new(width, height)))
                .collect(),
        }
    }

    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn layer(&self, class: CanonicalClass) -> Option<&Raster> {
        self.layers
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, raster)| raster)
    }

    /// Layers in bit order.
    pub fn layers(&self) -> impl Iterator<Item = (CanonicalClass, &Raster)> {
        self.layers.iter().map(|(class, raster)| (*class, raster))
    }

    /// Packs all layers into one byte per pixel (bitwise OR of class bits).
    ///
    /// `out` must hold exactly `width * height` bytes.
    pub fn encode_into(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.width as usize * self.height as usize);
        out.fill(0);
        for (class, raster) in &self.layers {
            let bit = class.bit();
            for (dst, &cell) in out.iter_mut().zip(raster.as_slice()) {
                if cell != 0 {
                    *dst |= bit;
                }
            }
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0; self.width as usize * self.height as usize];
        self.encode_into(&mut out);
        out
    }

    fn layer_index(&self, class: CanonicalClass) -> Option<usize> {
        self.layers.iter().position(|(c, _)| *c == class)
    }

    fn resolve_overlap(&mut self, priority: OverlapPriority) {
        let (winner, loser) = priority.winner_and_loser();
        let (Some(w), Some(l)) = (self.layer_index(winner), self.layer_index(loser)) else {
            return;
        };

        let winning = std::mem::replace(&mut self.layers[w].1, Raster::new(0, 0));
        self.layers[l].1.subtract(&winning);
        self.layers[w].1 = winning;
    }
}

/// Builds [`CompositeMask`]s from annotation shapes.
#[derive(Clone, Debug)]
pub struct MaskCompositor {
    labels: LabelTable,
    priority: OverlapPriority,
}

impl MaskCompositor {
    pub fn new(labels: LabelTable, priority: OverlapPriority) -> Self {
        Self { labels, priority }
    }

    pub fn scheme(&self) -> MaskScheme {
        self.labels.scheme()
    }

    pub fn priority(&self) -> OverlapPriority {
        self.priority
    }

    /// Composite `shapes` onto a `width × height` canvas.
    pub fn composite(&self, shapes: &[Shape], width: u32, height: u32) -> CompositeMask {
        self.composite_with_stats(shapes, width, height).0
    }

    /// Like [`composite`](Self::composite), also reporting skipped shapes.
    pub fn composite_with_stats(
        &self,
        shapes: &[Shape],
        width: u32,
        height: u32,
    ) -> (CompositeMask, CompositeStats) {
        let mut mask = CompositeMask::empty(self.scheme(), width, height);
        let mut stats = CompositeStats::default();

        for shape in shapes {
            let Some(class) = self.labels.normalize(&shape.label) else {
                let label = shape.label.trim().to_string();
                if !stats.unrecognized.contains(&label) {
                    stats.unrecognized.push(label);
                }
                continue;
            };
            if !shape.is_polygon() {
                stats.non_polygon += 1;
                continue;
            }
            if !shape.is_usable_polygon() {
                stats.degenerate += 1;
                continue;
            }
            let Some(idx) = mask.layer_index(class) else {
                continue;
            };

            let polygon = rasterize_polygon(width, height, &shape.points);
            mask.layers[idx].1.union_with(&polygon);
            stats.used += 1;
        }

        if self.scheme() == MaskScheme::ThreeClass {
            mask.resolve_overlap(self.priority);
        }

        (mask, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Point;

    fn rect(label: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> Shape {
        Shape::polygon(
            label,
            [
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ],
        )
    }

    fn three_class(priority: OverlapPriority) -> MaskCompositor {
        MaskCompositor::new(LabelTable::for_scheme(MaskScheme::ThreeClass), priority)
    }

    #[test]
    fn torso_and_body_produce_identical_rasters() {
        let compositor = three_class(OverlapPriority::Head);
        let a = compositor.composite(&[rect("torso", 2.0, 3.0, 9.0, 11.0)], 16, 16);
        let b = compositor.composite(&[rect("body", 2.0, 3.0, 9.0, 11.0)], 16, 16);

        assert_eq!(a.layer(CanonicalClass::Body), b.layer(CanonicalClass::Body));
        assert!(a.layer(CanonicalClass::Body).unwrap().count_set() > 0);
    }

    #[test]
    fn hand_inside_head_is_cleared_under_head_priority() {
        let compositor = three_class(OverlapPriority::Head);
        let head_only = compositor.composite(&[rect("head", 2.0, 2.0, 12.0, 12.0)], 16, 16);
        let mask = compositor.composite(
            &[
                rect("hand", 4.0, 4.0, 8.0, 8.0),
                rect("head", 2.0, 2.0, 12.0, 12.0),
            ],
            16,
            16,
        );

        assert!(mask.layer(CanonicalClass::Hand).unwrap().is_clear());
        assert_eq!(
            mask.layer(CanonicalClass::Head),
            head_only.layer(CanonicalClass::Head)
        );
    }

    #[test]
    fn hand_priority_clears_head_instead() {
        let compositor = three_class(OverlapPriority::Hand);
        let mask = compositor.composite(
            &[
                rect("head", 2.0, 2.0, 12.0, 12.0),
                rect("hand", 4.0, 4.0, 8.0, 8.0),
            ],
            16,
            16,
        );

        let head = mask.layer(CanonicalClass::Head).unwrap();
        let hand = mask.layer(CanonicalClass::Hand).unwrap();
        assert_eq!(hand.count_set(), 25);
        assert!(!head.intersects(hand));
        assert_eq!(head.count_set(), 121 - 25);
    }

    #[test]
    fn shape_order_does_not_matter() {
        let compositor = three_class(OverlapPriority::Head);
        let shapes = vec![
            rect("hand", 0.0, 0.0, 6.0, 6.0),
            rect("head", 4.0, 4.0, 10.0, 10.0),
            rect("hands", 8.0, 0.0, 12.0, 5.0),
            rect("body", 1.0, 1.0, 14.0, 14.0),
        ];
        let forward = compositor.composite(&shapes, 16, 16);
        let mut reversed = shapes.clone();
        reversed.reverse();
        let backward = compositor.composite(&reversed, 16, 16);

        assert_eq!(forward, backward);
    }

    #[test]
    fn body_is_unaffected_by_priority() {
        let shapes = vec![
            rect("body", 0.0, 0.0, 10.0, 10.0),
            rect("head", 0.0, 0.0, 5.0, 5.0),
            rect("hand", 3.0, 3.0, 8.0, 8.0),
        ];
        let head_first = three_class(OverlapPriority::Head).composite(&shapes, 12, 12);
        let hand_first = three_class(OverlapPriority::Hand).composite(&shapes, 12, 12);

        assert_eq!(
            head_first.layer(CanonicalClass::Body),
            hand_first.layer(CanonicalClass::Body)
        );
        assert_eq!(
            head_first.layer(CanonicalClass::Body).unwrap().count_set(),
            121
        );
    }

    #[test]
    fn skipped_shapes_contribute_nothing() {
        let compositor = three_class(OverlapPriority::Head);
        let shapes = vec![
            rect("leg", 0.0, 0.0, 5.0, 5.0),
            rect("head", 0.0, 0.0, 5.0, 5.0).with_shape_type("rectangle"),
            Shape::polygon("hand", [Point::new(0.0, 0.0), Point::new(5.0, 5.0)]),
            rect("", 1.0, 1.0, 2.0, 2.0),
        ];
        let (mask, stats) = compositor.composite_with_stats(&shapes, 8, 8);

        assert!(mask.layers().all(|(_, raster)| raster.is_clear()));
        assert_eq!(stats.used, 0);
        assert_eq!(stats.unrecognized, vec!["leg".to_string(), String::new()]);
        assert_eq!(stats.non_polygon, 1);
        assert_eq!(stats.degenerate, 1);
    }

    #[test]
    fn encode_uses_class_bits() {
        let compositor = three_class(OverlapPriority::Head);
        let mask = compositor.composite(
            &[
                rect("head", 0.0, 0.0, 1.0, 0.0),
                rect("body", 0.0, 0.0, 3.0, 0.0),
                rect("hand", 3.0, 0.0, 3.0, 0.0),
            ],
            4,
            1,
        );
        assert_eq!(mask.encode(), vec![0b101, 0b101, 0b100, 0b110]);
    }

    #[test]
    fn binary_scheme_encodes_zero_or_one() {
        let compositor = MaskCompositor::new(
            LabelTable::for_scheme(MaskScheme::Binary),
            OverlapPriority::Head,
        );
        let mask = compositor.composite(
            &[
                rect("baby", 0.0, 0.0, 2.0, 2.0),
                rect("baby", 1.0, 1.0, 3.0, 3.0),
                rect("head", 0.0, 0.0, 3.0, 3.0),
            ],
            4,
            4,
        );
        let encoded = mask.encode();
        assert!(encoded.iter().all(|&v| v <= 1));
        assert_eq!(encoded.iter().filter(|&&v| v == 1).count(), 14);
        assert!(mask.layer(CanonicalClass::Head).is_none());
    }
}
