#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use serde_json::json;

pub type Polygon<'a> = (&'a str, Vec<(f64, f64)>);

/// Axis-aligned square polygon with corners at `lo` and `hi`.
pub fn square(lo: f64, hi: f64) -> Vec<(f64, f64)> {
    vec![(lo, lo), (hi, lo), (hi, hi), (lo, hi)]
}

pub fn write_png(path: &Path, width: u32, height: u32, color: [u8; 3]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    RgbImage::from_pixel(width, height, Rgb(color))
        .save(path)
        .expect("write png file");
}

/// Write a LabelMe annotation with polygon shapes.
pub fn write_labelme(
    path: &Path,
    image_path: &str,
    declared: (i64, i64),
    shapes: &[Polygon<'_>],
) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    let shapes: Vec<_> = shapes
        .iter()
        .map(|(label, points)| {
            json!({
                "label": label,
                "points": points.iter().map(|&(x, y)| [x, y]).collect::<Vec<_>>(),
                "group_id": null,
                "shape_type": "polygon",
                "flags": {}
            })
        })
        .collect();
    let doc = json!({
        "version": "5.4.1",
        "flags": {},
        "shapes": shapes,
        "imagePath": image_path,
        "imageData": null,
        "imageWidth": declared.0,
        "imageHeight": declared.1
    });
    fs::write(path, serde_json::to_string_pretty(&doc).expect("serialize labelme"))
        .expect("write labelme file");
}

/// Write `<dir>/<stem>.png` (square, `size` pixels) and its annotation.
pub fn write_sample(dir: &Path, stem: &str, size: u32, shapes: &[Polygon<'_>]) -> PathBuf {
    write_png(&dir.join(format!("{stem}.png")), size, size, [40, 80, 120]);
    let annotation = dir.join(format!("{stem}.json"));
    write_labelme(
        &annotation,
        &format!("{stem}.png"),
        (i64::from(size), i64::from(size)),
        shapes,
    );
    annotation
}

/// `count` samples named `img_00`, `img_01`, ... with one body polygon each.
pub fn write_samples(dir: &Path, count: usize, size: u32) {
    let body = square(1.0, f64::from(size) - 2.0);
    for i in 0..count {
        write_sample(dir, &format!("img_{i:02}"), size, &[("body", body.clone())]);
    }
}
