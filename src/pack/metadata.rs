//! `info.json`: shapes and encoding of a packed dataset.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{DTYPE, IMAGE_CHANNELS, MASK_CHANNELS};
use crate::error::MaskpackError;
use crate::labels::{CanonicalClass, MaskScheme};
use crate::raster::OverlapPriority;

pub const METADATA_FILE: &str = "info.json";

/// One mask class and the bit it sets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassBit {
    pub name: String,
    pub bit: u8,
}

impl From<CanonicalClass> for ClassBit {
    fn from(class: CanonicalClass) -> Self {
        Self {
            name: class.name().to_string(),
            bit: class.bit(),
        }
    }
}

/// Dataset description written next to the buffers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub num_train_samples: usize,
    pub num_val_samples: usize,
    pub width: u32,
    pub height: u32,
    pub dtype: String,
    #[serde(default = "default_image_channels")]
    pub channels: usize,
    #[serde(default = "default_mask_channels")]
    pub mask_channels: usize,
    #[serde(default)]
    pub scheme: MaskScheme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<OverlapPriority>,
    #[serde(default)]
    pub classes: Vec<ClassBit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,
}

fn default_image_channels() -> usize {
    IMAGE_CHANNELS
}

fn default_mask_channels() -> usize {
    MASK_CHANNELS
}

impl DatasetMetadata {
    /// Describe `width × height` samples encoded with `scheme`, no samples yet.
    pub fn new(width: u32, height: u32, scheme: MaskScheme, priority: OverlapPriority) -> Self {
        Self {
            num_train_samples: 0,
            num_val_samples: 0,
            width,
            height,
            dtype: DTYPE.to_string(),
            channels: IMAGE_CHANNELS,
            mask_channels: MASK_CHANNELS,
            scheme,
            priority: (scheme == MaskScheme::ThreeClass).then_some(priority),
            classes: scheme.classes().iter().copied().map(ClassBit::from).collect(),
            seed: None,
            archive: None,
        }
    }

    pub fn with_counts(mut self, train: usize, validation: usize) -> Self {
        self.num_train_samples = train;
        self.num_val_samples = validation;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_archive(mut self, name: impl Into<String>) -> Self {
        self.archive = Some(name.into());
        self
    }

    /// Expected byte length of an image buffer holding `count` samples.
    pub fn image_bytes(&self, count: usize) -> u64 {
        self.plane_bytes() * (count * self.channels) as u64
    }

    /// Expected byte length of a mask buffer holding `count` samples.
    pub fn mask_bytes(&self, count: usize) -> u64 {
        self.plane_bytes() * (count * self.mask_channels) as u64
    }

    fn plane_bytes(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Bits a valid mask byte may contain.
    pub fn allowed_bits(&self) -> u8 {
        self.classes.iter().fold(0, |acc, class| acc | class.bit)
    }

    pub fn write(&self, path: &Path) -> Result<(), MaskpackError> {
        let file = File::create(path).map_err(MaskpackError::Io)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|source| {
            MaskpackError::MetadataWrite {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.write_all(b"\n").map_err(MaskpackError::Io)?;
        writer.flush().map_err(MaskpackError::Io)
    }

    pub fn read(path: &Path) -> Result<Self, MaskpackError> {
        let file = File::open(path).map_err(MaskpackError::Io)?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            MaskpackError::MetadataParse {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}
