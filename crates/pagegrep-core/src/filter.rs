//! Backend-neutral filter expressions over stored documents.
//!
//! A [`Filter`] is what the compiler emits and what every store executes.
//! Bounds are stated against stored corner fields, so they are always in
//! the store's axis convention (`y` grows downward).
//!
//! The in-memory store evaluates filters directly with
//! [`Query::matches`]; the SQLite store renders them to SQL.

use serde::Serialize;

use crate::models::{Coordinates, Document, Line, Page, Point};

/// One of the four stored corners of a line's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub fn as_str(self) -> &'static str {
        match self {
            Corner::TopLeft => "top_left",
            Corner::TopRight => "top_right",
            Corner::BottomLeft => "bottom_left",
            Corner::BottomRight => "bottom_right",
        }
    }

    pub fn of(self, c: &Coordinates) -> Point {
        match self {
            Corner::TopLeft => c.top_left,
            Corner::TopRight => c.top_right,
            Corner::BottomLeft => c.bottom_left,
            Corner::BottomRight => c.bottom_right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
        }
    }

    pub fn of(self, p: Point) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }
}

/// Comparison of a stored field against a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// `field <= value`
    Le,
    /// `field >= value`
    Ge,
}

impl Comparison {
    pub fn as_sql(self) -> &'static str {
        match self {
            Comparison::Le => "<=",
            Comparison::Ge => ">=",
        }
    }

    pub fn holds(self, field: f64, value: f64) -> bool {
        match self {
            Comparison::Le => field <= value,
            Comparison::Ge => field >= value,
        }
    }
}

/// `corner.axis <op> value` on a line's stored coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bound {
    pub corner: Corner,
    pub axis: Axis,
    pub op: Comparison,
    pub value: f64,
}

impl Bound {
    pub fn new(corner: Corner, axis: Axis, op: Comparison, value: f64) -> Self {
        Self {
            corner,
            axis,
            op,
            value,
        }
    }

    /// Stored column holding this bound's field, e.g. `bottom_right_x`.
    pub fn column(&self) -> String {
        format!("{}_{}", self.corner.as_str(), self.axis.as_str())
    }

    pub fn holds(&self, c: &Coordinates) -> bool {
        self.op.holds(self.axis.of(self.corner.of(c)), self.value)
    }
}

/// Matches documents with at least one line on `page_number` whose text
/// equals `text` and whose coordinates satisfy every bound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineFilter {
    pub page_number: i64,
    pub text: String,
    pub bounds: Vec<Bound>,
}

impl LineFilter {
    pub fn matches_line(&self, page: &Page, line: &Line) -> bool {
        page.page_number == self.page_number
            && line.text == self.text
            && self.bounds.iter().all(|b| b.holds(&line.coordinates))
    }

    fn matches(&self, doc: &Document) -> bool {
        doc.pages
            .iter()
            .any(|page| page.lines.iter().any(|line| self.matches_line(page, line)))
    }
}

/// Matches documents produced from `bucket` under any of `keys`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFilter {
    pub bucket: String,
    pub keys: Vec<String>,
}

/// Filter expression tree.
///
/// Combinators act on document sets: `And` intersects, `Or` unions, and
/// `Not` keeps documents matching none of its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Line(LineFilter),
    File(FileFilter),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Vec<Filter>),
}

impl Filter {
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Line(f) => f.matches(doc),
            Filter::File(f) => doc.bucket == f.bucket && f.keys.iter().any(|k| *k == doc.key),
            Filter::And(children) => children.iter().all(|c| c.matches(doc)),
            Filter::Or(children) => children.iter().any(|c| c.matches(doc)),
            Filter::Not(children) => !children.iter().any(|c| c.matches(doc)),
        }
    }
}

/// Opaque payload handed to a store: a filter plus the caller's scope.
///
/// `scope` restricts the candidate documents to a set of buckets; `None`
/// means every stored document. `Not` complements within the scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub filter: Filter,
    pub scope: Option<Vec<String>>,
}

impl Query {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            scope: None,
        }
    }

    /// Query for the documents produced from `keys` in `bucket`.
    pub fn file_info(bucket: impl Into<String>, keys: Vec<String>) -> Self {
        Self::new(Filter::File(FileFilter {
            bucket: bucket.into(),
            keys,
        }))
    }

    pub fn within(mut self, buckets: Vec<String>) -> Self {
        self.scope = Some(buckets);
        self
    }

    pub fn in_scope(&self, doc: &Document) -> bool {
        match &self.scope {
            Some(buckets) => buckets.iter().any(|b| *b == doc.bucket),
            None => true,
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.in_scope(doc) && self.filter.matches(doc)
    }
}
