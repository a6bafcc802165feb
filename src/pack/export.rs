//! Optional PNG export of packed samples for eyeballing.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

use super::PackedSplit;
use crate::error::MaskpackError;
use crate::labels::{CanonicalClass, MaskScheme};

/// Color of a mask byte: head red, hand green, body blue; foreground white.
fn mask_color(scheme: MaskScheme, value: u8) -> Rgb<u8> {
    let on = |class: CanonicalClass| {
        if value & class.bit() != 0 {
            255
        } else {
            0
        }
    };
    match scheme {
        MaskScheme::ThreeClass => Rgb([
            on(CanonicalClass::Head),
            on(CanonicalClass::Hand),
            on(CanonicalClass::Body),
        ]),
        MaskScheme::Binary => {
            let v = on(CanonicalClass::Foreground);
            Rgb([v, v, v])
        }
    }
}

/// Write `<out>/<split>/<index:04>.png` and `<index:04>_mask.png` for every
/// sample of `split`. Returns the written paths.
pub fn export_png(
    split: &PackedSplit,
    out_dir: &Path,
    scheme: MaskScheme,
) -> Result<Vec<PathBuf>, MaskpackError> {
    let dir = out_dir.join(&split.name);
    fs::create_dir_all(&dir).map_err(MaskpackError::Io)?;

    let (width, height) = (split.width, split.height);
    let plane = width as usize * height as usize;
    let mut written = Vec::with_capacity(split.count * 2);

    for index in 0..split.count {
        let (Some(chw), Some(mask)) = (split.sample_image(index), split.sample_mask(index)) else {
            break;
        };

        let image = RgbImage::from_fn(width, height, |x, y| {
            let i = y as usize * width as usize + x as usize;
            Rgb([chw[i], chw[plane + i], chw[2 * plane + i]])
        });
        let colored = RgbImage::from_fn(width, height, |x, y| {
            mask_color(scheme, mask[y as usize * width as usize + x as usize])
        });

        for (name, img) in [
            (format!("{index:04}.png"), &image),
            (format!("{index:04}_mask.png"), &colored),
        ] {
            let path = dir.join(name);
            img.save(&path).map_err(|source| MaskpackError::ImageWrite {
                path: path.clone(),
                source,
            })?;
            written.push(path);
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_colors() {
        assert_eq!(mask_color(MaskScheme::ThreeClass, 0), Rgb([0, 0, 0]));
        assert_eq!(mask_color(MaskScheme::ThreeClass, 0b101), Rgb([255, 0, 255]));
        assert_eq!(mask_color(MaskScheme::ThreeClass, 0b010), Rgb([0, 255, 0]));
        assert_eq!(mask_color(MaskScheme::Binary, 1), Rgb([255, 255, 255]));
    }

    #[test]
    fn exports_image_and_mask_per_sample() {
        let dir = tempfile::tempdir().unwrap();
        let split = PackedSplit {
            name: "val".to_string(),
            count: 2,
            width: 2,
            height: 1,
            // Sample 0: red pixel then blue pixel. Sample 1: all grey.
            images: vec![255, 0, 0, 0, 0, 255, 9, 9, 9, 9, 9, 9],
            masks: vec![1, 4, 0, 2],
        };

        let written = export_png(&split, dir.path(), MaskScheme::ThreeClass).unwrap();
        assert_eq!(written.len(), 4);
        assert_eq!(written[0], dir.path().join("val/0000.png"));
        assert_eq!(written[3], dir.path().join("val/0001_mask.png"));

        let image = image::open(&written[0]).unwrap().into_rgb8();
        assert_eq!(image.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(1, 0), &Rgb([0, 0, 255]));

        let mask = image::open(&written[3]).unwrap().into_rgb8();
        assert_eq!(mask.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(mask.get_pixel(1, 0), &Rgb([0, 255, 0]));
    }
}
