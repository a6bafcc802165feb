//! Packing (image, mask) pairs into fixed-shape binary buffers.
//!
//! Each split becomes two flat row-major `uint8` files:
//! - images: `count × 3 × H × W` (channel-major RGB)
//! - masks: `count × 1 × H × W` (one byte per pixel, bitwise OR of the
//!   [`CanonicalClass::bit`](crate::labels::CanonicalClass::bit) of every
//!   class covering the pixel)
//!
//! A pair that fails for any reason is skipped and recorded in the
//! [`BuildReport`]; only a split where every pair failed is an error.

mod arena;
pub mod export;
pub mod metadata;

pub use arena::SampleArena;
pub use export::export_png;
pub use metadata::{DatasetMetadata, METADATA_FILE};

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{ImageError, ImageReader, RgbImage};
use serde::{Deserialize, Serialize};

use crate::annotation::read_annotation;
use crate::error::MaskpackError;
use crate::pairs::Pair;
use crate::raster::MaskCompositor;
use crate::report::{BuildIssue, BuildReport, IssueCode, Stage};

/// Channels of a packed image sample.
pub const IMAGE_CHANNELS: usize = 3;
/// Channels of a packed mask sample.
pub const MASK_CHANNELS: usize = 1;
/// Default output edge length in pixels.
pub const DEFAULT_SIZE: u32 = 768;
/// Element type of both buffers.
pub const DTYPE: &str = "uint8";

pub const TRAIN_SPLIT: &str = "train";
pub const VAL_SPLIT: &str = "val";

/// Interpolation used when a square image is scaled to the target size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    #[default]
    Bicubic,
}

impl ResizeFilter {
    fn filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::Bicubic => FilterType::CatmullRom,
        }
    }
}

/// Packer configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackOptions {
    pub width: u32,
    pub height: u32,
    pub filter: ResizeFilter,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self::square(DEFAULT_SIZE)
    }
}

impl PackOptions {
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
            filter: ResizeFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    fn plane_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// The packed buffers of one split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedSplit {
    pub name: String,
    pub count: usize,
    pub width: u32,
    pub height: u32,
    pub images: Vec<u8>,
    pub masks: Vec<u8>,
}

impl PackedSplit {
    /// `[count, 3, height, width]`
    pub fn image_shape(&self) -> [usize; 4] {
        [
            self.count,
            IMAGE_CHANNELS,
            self.height as usize,
            self.width as usize,
        ]
    }

    /// `[count, 1, height, width]`
    pub fn mask_shape(&self) -> [usize; 4] {
        [
            self.count,
            MASK_CHANNELS,
            self.height as usize,
            self.width as usize,
        ]
    }

    fn plane_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Channel-major image bytes of one sample.
    pub fn sample_image(&self, index: usize) -> Option<&[u8]> {
        let stride = IMAGE_CHANNELS * self.plane_len();
        (index < self.count).then(|| &self.images[index * stride..(index + 1) * stride])
    }

    /// Mask bytes of one sample.
    pub fn sample_mask(&self, index: usize) -> Option<&[u8]> {
        let stride = MASK_CHANNELS * self.plane_len();
        (index < self.count).then(|| &self.masks[index * stride..(index + 1) * stride])
    }

    /// Write both buffers into `dir` under temporary names and release them.
    ///
    /// Nothing is visible under the final names until
    /// [`StagedSplit::commit`].
    pub fn stage(self, dir: &Path) -> Result<StagedSplit, MaskpackError> {
        let staged = StagedSplit {
            name: self.name,
            count: self.count,
            width: self.width,
            height: self.height,
            dir: dir.to_path_buf(),
        };
        let [images, masks] = staged.partial_paths();
        let written = fs::write(&images, &self.images).and_then(|()| fs::write(&masks, &self.masks));
        if let Err(err) = written {
            staged.discard();
            return Err(MaskpackError::Io(err));
        }
        Ok(staged)
    }
}

/// A split whose buffers sit in the output directory under temporary names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedSplit {
    pub name: String,
    pub count: usize,
    pub width: u32,
    pub height: u32,
    dir: PathBuf,
}

impl StagedSplit {
    fn partial_paths(&self) -> [PathBuf; 2] {
        [image_file_name(&self.name), mask_file_name(&self.name)]
            .map(|file| self.dir.join(format!(".{file}.partial")))
    }

    /// `[images, masks]` paths once committed.
    pub fn final_paths(&self) -> [PathBuf; 2] {
        [
            self.dir.join(image_file_name(&self.name)),
            self.dir.join(mask_file_name(&self.name)),
        ]
    }

    /// Move both buffers to their final names.
    pub fn commit(&self) -> Result<[PathBuf; 2], MaskpackError> {
        let finals = self.final_paths();
        for (from, to) in self.partial_paths().iter().zip(&finals) {
            fs::rename(from, to).map_err(MaskpackError::Io)?;
        }
        Ok(finals)
    }

    /// Remove the temporary files. Missing files are ignored.
    pub fn discard(&self) {
        for path in self.partial_paths() {
            let _ = fs::remove_file(path);
        }
    }

    /// Read the committed buffers back.
    pub fn load(&self) -> Result<PackedSplit, MaskpackError> {
        let [images, masks] = self.final_paths();
        Ok(PackedSplit {
            name: self.name.clone(),
            count: self.count,
            width: self.width,
            height: self.height,
            images: fs::read(images).map_err(MaskpackError::Io)?,
            masks: fs::read(masks).map_err(MaskpackError::Io)?,
        })
    }
}

pub fn image_file_name(split: &str) -> String {
    format!("{split}.bin")
}

pub fn mask_file_name(split: &str) -> String {
    format!("{split}_mask.bin")
}

/// Turns pairs into a [`PackedSplit`].
#[derive(Clone, Debug)]
pub struct Packer {
    options: PackOptions,
    compositor: MaskCompositor,
}

impl Packer {
    pub fn new(options: PackOptions, compositor: MaskCompositor) -> Self {
        Self {
            options,
            compositor,
        }
    }

    /// Pack `pairs` in order. Slot `i` holds the `i`-th surviving pair.
    ///
    /// # Errors
    /// [`MaskpackError::NoSamplesPacked`] if `pairs` is non-empty and every
    /// pair was skipped.
    pub fn pack(
        &self,
        split: &str,
        pairs: &[Pair],
        report: &mut BuildReport,
    ) -> Result<PackedSplit, MaskpackError> {
        let plane = self.options.plane_len();
        let mut arena = SampleArena::new(pairs.len(), IMAGE_CHANNELS * plane, MASK_CHANNELS * plane);

        for pair in pairs {
            let mut notes = Vec::new();
            let outcome =
                arena.fill_next(|image, mask| self.pack_pair(pair, image, mask, &mut notes));
            record_outcome(pair, outcome.map(drop), notes, report);
        }

        let (images, masks, count) = arena.finish();
        ensure_packed(split, pairs.len(), count)?;

        Ok(PackedSplit {
            name: split.to_string(),
            count,
            width: self.options.width,
            height: self.options.height,
            images,
            masks,
        })
    }

    /// Run every pair through the packing checks without keeping the result.
    ///
    /// Skips and notes land in `report` exactly as [`pack`](Self::pack)
    /// records them. Returns the positions in `pairs` that would be packed.
    pub fn check(
        &self,
        split: &str,
        pairs: &[Pair],
        report: &mut BuildReport,
    ) -> Result<Vec<usize>, MaskpackError> {
        let plane = self.options.plane_len();
        let mut image = vec![0; IMAGE_CHANNELS * plane];
        let mut mask = vec![0; MASK_CHANNELS * plane];

        let mut packable = Vec::new();
        for (position, pair) in pairs.iter().enumerate() {
            let mut notes = Vec::new();
            let outcome = self.pack_pair(pair, &mut image, &mut mask, &mut notes);
            if record_outcome(pair, outcome, notes, report) {
                packable.push(position);
            }
        }

        ensure_packed(split, pairs.len(), packable.len())?;
        Ok(packable)
    }

    fn pack_pair(
        &self,
        pair: &Pair,
        image_slot: &mut [u8],
        mask_slot: &mut [u8],
        notes: &mut Vec<BuildIssue>,
    ) -> Result<(), MaskpackError> {
        let mut annotation = read_annotation(&pair.annotation)?;
        if annotation.has_non_positive_dimension() {
            return Err(MaskpackError::InvalidAnnotation {
                path: pair.annotation.clone(),
                message: format!(
                    "non-positive declared size {}x{}",
                    annotation.image_width.unwrap_or_default(),
                    annotation.image_height.unwrap_or_default()
                ),
            });
        }
        let (image, source_size) = self.load_image(&pair.image)?;
        let size = image.dimensions();

        match annotation.declared_size() {
            Some(declared) if declared == source_size => {}
            Some((w, h)) => notes.push(BuildIssue::note(
                Stage::Pack,
                IssueCode::DeclaredSizeOverridden,
                &pair.annotation,
                format!(
                    "declared {}x{} but image is {}x{}; using the image size",
                    w, h, source_size.0, source_size.1
                ),
            )),
            None => notes.push(BuildIssue::note(
                Stage::Pack,
                IssueCode::DeclaredSizeOverridden,
                &pair.annotation,
                format!(
                    "missing imageWidth/imageHeight; using the image size {}x{}",
                    source_size.0, source_size.1
                ),
            )),
        }

        annotation.rescale(source_size, size);
        annotation.reconcile_size(size.0, size.1);
        let (width, height) =
            annotation
                .declared_size()
                .ok_or_else(|| MaskpackError::InvalidAnnotation {
                    path: pair.annotation.clone(),
                    message: "image has no pixels".to_string(),
                })?;

        let (mask, stats) = self
            .compositor
            .composite_with_stats(&annotation.shapes, width, height);
        if !stats.unrecognized.is_empty() {
            let labels: Vec<String> = stats
                .unrecognized
                .iter()
                .map(|label| format!("{label:?}"))
                .collect();
            notes.push(BuildIssue::note(
                Stage::Pack,
                IssueCode::UnrecognizedLabels,
                &pair.annotation,
                format!("dropped shapes with unrecognized label(s): {}", labels.join(", ")),
            ));
        }

        let expected = (self.options.width, self.options.height);
        if mask.dims() != expected {
            return Err(MaskpackError::MaskShapeMismatch {
                path: pair.annotation.clone(),
                width: mask.dims().0,
                height: mask.dims().1,
                expected_width: expected.0,
                expected_height: expected.1,
            });
        }

        write_chw(&image, image_slot);
        mask.encode_into(mask_slot);
        Ok(())
    }

    /// Decode as RGB8 and bring to the target size.
    ///
    /// Returns the image and its size before resizing.
    fn load_image(&self, path: &Path) -> Result<(RgbImage, (u32, u32)), MaskpackError> {
        let decode_err = |source: ImageError| MaskpackError::ImageDecode {
            path: path.to_path_buf(),
            source,
        };

        let reader = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|err| decode_err(ImageError::IoError(err)))?;
        let image = reader.decode().map_err(decode_err)?.into_rgb8();

        let source = image.dimensions();
        let target = (self.options.width, self.options.height);
        if source == target {
            return Ok((image, source));
        }
        if source.0 != source.1 {
            return Err(MaskpackError::NonSquareImage {
                path: path.to_path_buf(),
                width: source.0,
                height: source.1,
                target: self.options.width,
            });
        }

        let resized = image::imageops::resize(
            &image,
            target.0,
            target.1,
            self.options.filter.filter_type(),
        );
        Ok((resized, source))
    }
}

/// Record a skip for a failed pair, or its notes for a packed one.
///
/// Returns whether the pair was packed.
fn record_outcome(
    pair: &Pair,
    outcome: Result<(), MaskpackError>,
    notes: Vec<BuildIssue>,
    report: &mut BuildReport,
) -> bool {
    match outcome {
        Ok(()) => {
            report.issues.extend(notes);
            true
        }
        Err(err) => {
            report.add(BuildIssue::skip(
                Stage::Pack,
                issue_code(&err),
                &pair.annotation,
                err.to_string(),
            ));
            false
        }
    }
}

fn ensure_packed(split: &str, attempted: usize, packed: usize) -> Result<(), MaskpackError> {
    if packed == 0 && attempted > 0 {
        return Err(MaskpackError::NoSamplesPacked {
            split: split.to_string(),
            attempted,
        });
    }
    Ok(())
}

fn issue_code(err: &MaskpackError) -> IssueCode {
    match err {
        MaskpackError::AnnotationParse { .. } | MaskpackError::InvalidAnnotation { .. } => {
            IssueCode::AnnotationUnreadable
        }
        MaskpackError::ImageDecode { .. } => IssueCode::ImageUnreadable,
        MaskpackError::NonSquareImage { .. } => IssueCode::NonSquareImage,
        MaskpackError::MaskShapeMismatch { .. } => IssueCode::MaskShapeMismatch,
        _ => IssueCode::Other,
    }
}

/// Interleaved RGB to planar `[R..., G..., B...]`.
fn write_chw(image: &RgbImage, out: &mut [u8]) {
    let plane = image.width() as usize * image.height() as usize;
    debug_assert_eq!(out.len(), IMAGE_CHANNELS * plane);

    let (red, rest) = out.split_at_mut(plane);
    let (green, blue) = rest.split_at_mut(plane);
    for (i, px) in image.as_raw().chunks_exact(IMAGE_CHANNELS).enumerate() {
        red[i] = px[0];
        green[i] = px[1];
        blue[i] = px[2];
    }
}
