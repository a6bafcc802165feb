//! Fuzz target for polygon scan conversion with arbitrary coordinates.
//!
//! Run with:
//!   cargo +nightly fuzz run polygon_rasterize

#![no_main]

use libfuzzer_sys::fuzz_target;
use maskpack::annotation::Point;
use maskpack::raster::rasterize_polygon;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 || data.len() > 4096 {
        return;
    }

    let width = u32::from(data[0] % 64);
    let height = u32::from(data[1] % 64);
    let points: Vec<Point> = data[2..]
        .chunks_exact(16)
        .map(|chunk| {
            let mut x = [0u8; 8];
            let mut y = [0u8; 8];
            x.copy_from_slice(&chunk[..8]);
            y.copy_from_slice(&chunk[8..]);
            Point::new(f64::from_le_bytes(x), f64::from_le_bytes(y))
        })
        .collect();

    let raster = rasterize_polygon(width, height, &points);
    assert_eq!(raster.dims(), (width, height));
});
