//! Fuzz target for LabelMe annotation parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run labelme_json_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use maskpack::annotation::from_annotation_slice;
use maskpack::labels::{LabelTable, MaskScheme};
use maskpack::raster::{MaskCompositor, OverlapPriority};

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    // Anything that parses must also composite without panicking.
    if let Ok(annotation) = from_annotation_slice(data) {
        let compositor = MaskCompositor::new(
            LabelTable::for_scheme(MaskScheme::ThreeClass),
            OverlapPriority::Head,
        );
        let mask = compositor.composite(&annotation.shapes, 32, 32);
        let _ = mask.encode();
    }
});
