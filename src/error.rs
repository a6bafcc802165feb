use std::path::PathBuf;
use thiserror::Error;

use crate::verify::VerifyReport;

/// The main error type for maskpack operations.
#[derive(Debug, Error)]
pub enum MaskpackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse annotation JSON from {path}: {source}")]
    AnnotationParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write annotation JSON to {path}: {source}")]
    AnnotationWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid annotation {path}: {message}")]
    InvalidAnnotation { path: PathBuf, message: String },

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Image {path} is {width}x{height}; only square images can be resized to {target}x{target}")]
    NonSquareImage {
        path: PathBuf,
        width: u32,
        height: u32,
        target: u32,
    },

    #[error("Mask for {path} is {width}x{height}, expected {expected_width}x{expected_height}")]
    MaskShapeMismatch {
        path: PathBuf,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("No usable (annotation, image) pairs found")]
    NoUsablePairs,

    #[error("All {attempted} sample(s) of the {split} split were skipped")]
    NoSamplesPacked { split: String, attempted: usize },

    #[error("Failed to write archive {path}: {source}")]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to read archive {path}: {source}")]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to parse dataset metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write dataset metadata to {path}: {source}")]
    MetadataWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Verification failed with {problem_count} problem(s)")]
    VerifyFailed {
        problem_count: usize,
        report: VerifyReport,
    },
}
