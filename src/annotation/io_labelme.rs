//! LabelMe annotation JSON reader and writer.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::model::Annotation;
use crate::error::MaskpackError;

/// Reads an annotation from a LabelMe JSON file.
///
/// # Errors
/// Returns an error if the file cannot be opened or is not a LabelMe
/// record (for example when `shapes` is not a list).
pub fn read_annotation(path: &Path) -> Result<Annotation, MaskpackError> {
    let file = File::open(path).map_err(MaskpackError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| MaskpackError::AnnotationParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes an annotation as pretty-printed LabelMe JSON.
pub fn write_annotation(path: &Path, annotation: &Annotation) -> Result<(), MaskpackError> {
    let file = File::create(path).map_err(MaskpackError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, annotation).map_err(|source| {
        MaskpackError::AnnotationWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Parses an annotation from a JSON string.
pub fn from_annotation_str(json: &str) -> Result<Annotation, serde_json::Error> {
    serde_json::from_str(json)
}

/// Parses an annotation from JSON bytes.
pub fn from_annotation_slice(bytes: &[u8]) -> Result<Annotation, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Serializes an annotation to a JSON string.
pub fn to_annotation_string(annotation: &Annotation) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(annotation)
}
