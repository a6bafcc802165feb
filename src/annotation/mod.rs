//! Polygon annotations as written by the labeling tool.
//!
//! Files are hand-edited, so the reader accepts missing and `null` fields;
//! see [`model`] for the fallback rules.

pub mod io_labelme;
mod model;

pub use io_labelme::{
    from_annotation_slice, from_annotation_str, read_annotation, to_annotation_string,
    write_annotation,
};
pub use model::{Annotation, Point, Shape, MIN_POLYGON_POINTS, POLYGON_SHAPE_TYPE};
