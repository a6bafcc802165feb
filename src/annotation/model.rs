//! LabelMe-style polygon annotation model.
//!
//! The model is deliberately permissive: annotators hand-edit these files,
//! so missing or `null` fields fall back to defaults, declared image sizes
//! may be stale, and malformed point lists degrade to an empty polygon
//! (which is then skipped) instead of failing the whole file.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shape type that the mask pipeline understands.
pub const POLYGON_SHAPE_TYPE: &str = "polygon";

/// Minimum number of vertices for a usable polygon.
pub const MIN_POLYGON_POINTS: usize = 3;

/// A 2-D point in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// One annotation file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Annotation {
    /// Declared image width. Advisory only.
    #[serde(
        rename = "imageWidth",
        default,
        deserialize_with = "lenient_dimension",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_width: Option<i64>,

    /// Declared image height. Advisory only.
    #[serde(
        rename = "imageHeight",
        default,
        deserialize_with = "lenient_dimension",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_height: Option<i64>,

    /// Reference to the image, usually relative to the annotation file.
    #[serde(rename = "imagePath", default, deserialize_with = "null_as_default")]
    pub image_path: String,

    /// Shapes in file order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub shapes: Vec<Shape>,
}

impl Annotation {
    /// Declared `(width, height)` if both are present and positive.
    pub fn declared_size(&self) -> Option<(u32, u32)> {
        let width = u32::try_from(self.image_width?).ok()?;
        let height = u32::try_from(self.image_height?).ok()?;
        (width > 0 && height > 0).then_some((width, height))
    }

    /// Whether a declared dimension is present but zero or negative.
    pub fn has_non_positive_dimension(&self) -> bool {
        [self.image_width, self.image_height]
            .into_iter()
            .flatten()
            .any(|dimension| dimension <= 0)
    }

    /// Overwrite the declared size with the real one.
    ///
    /// Returns `true` when the declared size was missing or different.
    pub fn reconcile_size(&mut self, width: u32, height: u32) -> bool {
        let changed = self.declared_size() != Some((width, height));
        self.image_width = Some(i64::from(width));
        self.image_height = Some(i64::from(height));
        changed
    }

    /// Rescale every shape from a `from` sized image to a `to` sized image.
    ///
    /// Pixel centers sit on integer coordinates, so the mapping keeps
    /// centers aligned rather than corners.
    pub fn rescale(&mut self, from: (u32, u32), to: (u32, u32)) {
        if from == to || from.0 == 0 || from.1 == 0 {
            return;
        }
        let sx = f64::from(to.0) / f64::from(from.0);
        let sy = f64::from(to.1) / f64::from(from.1);

        for shape in &mut self.shapes {
            for point in &mut shape.points {
                point.x = (point.x + 0.5) * sx - 0.5;
                point.y = (point.y + 0.5) * sy - 0.5;
            }
        }
    }
}

/// A labelled shape.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Shape {
    /// Free-text label as typed by the annotator.
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,

    /// Shape kind; absent means polygon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_type: Option<String>,

    /// Vertices in order.
    #[serde(default, deserialize_with = "lenient_points")]
    pub points: Vec<Point>,
}

impl Shape {
    /// Creates a polygon shape.
    pub fn polygon(label: impl Into<String>, points: impl IntoIterator<Item = Point>) -> Self {
        Self {
            label: label.into(),
            shape_type: Some(POLYGON_SHAPE_TYPE.to_string()),
            points: points.into_iter().collect(),
        }
    }

    pub fn with_shape_type(mut self, shape_type: impl Into<String>) -> Self {
        self.shape_type = Some(shape_type.into());
        self
    }

    pub fn is_polygon(&self) -> bool {
        self.shape_type.as_deref().unwrap_or(POLYGON_SHAPE_TYPE) == POLYGON_SHAPE_TYPE
    }

    /// A polygon with enough vertices to enclose an area.
    pub fn is_usable_polygon(&self) -> bool {
        self.is_polygon() && self.points.len() >= MIN_POLYGON_POINTS
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept integers, floats and numeric strings; anything else is "absent".
fn lenient_dimension<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let dimension = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite()).map(|v| v as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(dimension)
}

/// Parse `[[x, y], ...]`; any malformed vertex yields an empty list.
fn lenient_points<'de, D>(deserializer: D) -> Result<Vec<Point>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(rows) = value else {
        return Ok(Vec::new());
    };

    let mut points = Vec::with_capacity(rows.len());
    for row in &rows {
        match parse_vertex(row) {
            Some(point) => points.push(point),
            None => return Ok(Vec::new()),
        }
    }
    Ok(points)
}

fn parse_vertex(row: &Value) -> Option<Point> {
    let coords = row.as_array()?;
    if coords.len() < 2 {
        return None;
    }
    let x = coords[0].as_f64()?;
    let y = coords[1].as_f64()?;
    Some(Point::new(x, y))
}
