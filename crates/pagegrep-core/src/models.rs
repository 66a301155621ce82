//! Document model persisted by every store.
//!
//! A [`Document`] exclusively owns its pages, a [`Page`] its lines, and a
//! [`Line`] its [`Coordinates`]. All coordinates are normalized to the page
//! (`[0,1]²`) and use the OCR-native axis convention (`y` grows downward).

use serde::{Deserialize, Serialize};

/// Identity key of a stored document, used for cascaded deletion.
pub type DocumentKey = String;

/// A point on a page, normalized to `[0,1]²`, `y` growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box as produced by OCR: origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// The four corners of a line's bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub id: String,
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl Coordinates {
    /// Derive the four corners from an OCR bounding box.
    ///
    /// Values are clamped into `[0,1]`, and a negative width or height
    /// collapses to zero, so the corners always satisfy
    /// `top_left.x <= top_right.x` and `top_left.y <= bottom_left.y`.
    pub fn from_bounding_box(id: String, bbox: &BoundingBox) -> Self {
        let left = unit(bbox.left);
        let top = unit(bbox.top);
        let right = unit(bbox.left + bbox.width).max(left);
        let bottom = unit(bbox.top + bbox.height).max(top);

        Self {
            id,
            top_left: Point::new(left, top),
            top_right: Point::new(right, top),
            bottom_left: Point::new(left, bottom),
            bottom_right: Point::new(right, bottom),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            left: self.top_left.x,
            top: self.top_left.y,
            width: self.bottom_right.x - self.top_left.x,
            height: self.bottom_right.y - self.top_left.y,
        }
    }
}

fn unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// A single line of recognized text. The text is stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: String,
    pub text: String,
    pub coordinates: Coordinates,
}

/// A page within a document. `page_number` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub page_number: i64,
    pub lines: Vec<Line>,
}

/// One indexed file. `(bucket, key)` is unique across documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub bucket: String,
    pub key: String,
    pub pages: Vec<Page>,
}

impl Document {
    /// True when this document was produced from `bucket/key`.
    pub fn is_file(&self, bucket: &str, key: &str) -> bool {
        self.bucket == bucket && self.key == key
    }

    pub fn line_count(&self) -> usize {
        self.pages.iter().map(|p| p.lines.len()).sum()
    }
}
