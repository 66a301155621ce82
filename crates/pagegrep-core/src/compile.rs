//! Search DSL → [`Filter`] compiler.
//!
//! Validates each search object, reconciles the caller's axis convention
//! with the store's, and folds the syntax tree into a filter expression.
//!
//! # Axis reconciliation
//!
//! Callers describe a region with `y` growing upward: index 0 is the
//! top-left corner and carries the larger `y`, index 1 is the bottom-right
//! corner. Stored coordinates have `y` growing downward, where the top edge
//! is the smaller `y`. [`store_region`] exchanges the two corners along the
//! y-axis to get the store-frame rectangle:
//!
//! ```text
//!   caller (y up)                    store (y down)
//!   c0 = (x0, y_top) ─┐              (x0, min y) ─┐
//!                     │      ──▶                  │
//!   └─ c1 = (x1, y_bot)              └─ (x1, max y)
//! ```
//!
//! The swap is defined by edge order, so a caller that already sends the
//! smaller `y` first describes the same store-frame rectangle.
//!
//! A line matches when its box intersects the region (closed intervals):
//!
//! | caller wording | emitted bound |
//! |---|---|
//! | region left ≤ line right | `bottom_right_x >= left` |
//! | region right ≥ line left | `top_left_x <= right` |
//! | region top ≤ line bottom | `bottom_left_y >= top` |
//! | region bottom ≥ line top | `top_right_y <= bottom` |

use serde_json::Value;

use crate::dsl::{Node, QueryError, SearchObject};
use crate::filter::{Axis, Bound, Comparison, Corner, Filter, LineFilter};

/// A search rectangle in store coordinates (`y` grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Region {
    /// The four bounds that select lines intersecting this region.
    pub fn intersecting_bounds(&self) -> Vec<Bound> {
        vec![
            Bound::new(Corner::BottomRight, Axis::X, Comparison::Ge, self.left),
            Bound::new(Corner::TopLeft, Axis::X, Comparison::Le, self.right),
            Bound::new(Corner::BottomLeft, Axis::Y, Comparison::Ge, self.top),
            Bound::new(Corner::TopRight, Axis::Y, Comparison::Le, self.bottom),
        ]
    }
}

/// Convert a caller rectangle (`y` up) into the store frame (`y` down).
///
/// This is the only place the two axis conventions meet.
pub fn store_region(search: &SearchObject) -> Region {
    let [[x0, y0], [x1, y1]] = search.coordinates;
    Region {
        left: x0,
        top: y0.min(y1),
        right: x1,
        bottom: y0.max(y1),
    }
}

/// Check a search object and return its store-frame region.
///
/// Checks run in a fixed order so that a request with several problems
/// always reports the same one.
pub fn validate(search: &SearchObject) -> Result<Region, QueryError> {
    if search.text.is_empty() {
        return Err(QueryError::MissingText);
    }
    if search.page_number == 0 {
        return Err(QueryError::PageZero);
    }

    let region = store_region(search);
    if region.right == 0.0 || region.bottom == 0.0 {
        return Err(QueryError::BottomCoordZero);
    }
    if !(region.left < region.right && region.top < region.bottom) {
        return Err(QueryError::CoordMisplaced);
    }
    Ok(region)
}

/// Fold a syntax tree into a filter, validating every search object.
pub fn compile(node: &Node) -> Result<Filter, QueryError> {
    match node {
        Node::Search(search) => {
            let region = validate(search)?;
            Ok(Filter::Line(LineFilter {
                page_number: search.page_number,
                text: search.text.clone(),
                bounds: region.intersecting_bounds(),
            }))
        }
        Node::And(children) => compile_all(children).map(Filter::And),
        Node::Or(children) => compile_all(children).map(Filter::Or),
        Node::Not(children) => compile_all(children).map(Filter::Not),
    }
}

fn compile_all(children: &[Node]) -> Result<Vec<Filter>, QueryError> {
    children.iter().map(compile).collect()
}

/// Parse and compile a request body in one step.
pub fn compile_value(value: &Value) -> Result<Filter, QueryError> {
    compile(&Node::parse(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, Coordinates, Document, Line, Page};
    use serde_json::json;

    fn search(text: &str, page: i64, coordinates: [[f64; 2]; 2]) -> SearchObject {
        SearchObject::new(text, page, coordinates)
    }

    fn doc_with_line(bbox: BoundingBox) -> Document {
        Document {
            id: "d".into(),
            bucket: "b1".into(),
            key: "p.jpg".into(),
            pages: vec![Page {
                id: "p".into(),
                page_number: 1,
                lines: vec![Line {
                    id: "l".into(),
                    text: "alpha".into(),
                    coordinates: Coordinates::from_bounding_box("c".into(), &bbox),
                }],
            }],
        }
    }

    fn scenario_line() -> Document {
        doc_with_line(BoundingBox {
            left: 0.1,
            top: 0.1,
            width: 0.4,
            height: 0.2,
        })
    }

    fn compiled(coordinates: [[f64; 2]; 2]) -> Filter {
        compile(&Node::Search(search("alpha", 1, coordinates))).unwrap()
    }

    #[test]
    fn test_region_swaps_y_corners() {
        let r = store_region(&search("a", 1, [[0.0, 0.6], [0.6, 0.0]]));
        assert_eq!(
            r,
            Region {
                left: 0.0,
                top: 0.0,
                right: 0.6,
                bottom: 0.6
            }
        );
    }

    #[test]
    fn test_ascending_y_gives_the_same_region() {
        let a = store_region(&search("a", 1, [[0.2, 0.7], [0.6, 0.3]]));
        let b = store_region(&search("a", 1, [[0.2, 0.3], [0.6, 0.7]]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_validation_order_and_kinds() {
        let cases = [
            (search("", 0, [[0.0, 0.0], [0.0, 0.0]]), QueryError::MissingText),
            (search("a", 0, [[0.1, 0.1], [0.5, 0.5]]), QueryError::PageZero),
            (search("a", 1, [[0.1, 0.1], [0.0, 0.5]]), QueryError::BottomCoordZero),
            (search("a", 1, [[0.0, 0.0], [0.5, 0.0]]), QueryError::BottomCoordZero),
            (search("a", 1, [[0.5, 0.1], [0.5, 0.6]]), QueryError::CoordMisplaced),
            (search("a", 1, [[0.6, 0.1], [0.5, 0.6]]), QueryError::CoordMisplaced),
            (search("a", 1, [[0.1, 0.4], [0.5, 0.4]]), QueryError::CoordMisplaced),
            (search("a", 1, [[0.3, 0.3], [0.3, 0.3]]), QueryError::CoordMisplaced),
        ];
        for (s, expected) in cases {
            assert_eq!(validate(&s).unwrap_err(), expected, "input: {:?}", s);
        }
    }

    #[test]
    fn test_empty_text_reported_first() {
        let v = json!({"search": {"text": "", "page_number": 1, "coordinates": [[0.1, 0.1], [0.5, 0.5]]}});
        assert_eq!(compile_value(&v).unwrap_err().code(), "MISSING_TEXT");
    }

    #[test]
    fn test_emits_four_intersection_bounds() {
        match compiled([[0.0, 0.6], [0.6, 0.0]]) {
            Filter::Line(f) => {
                assert_eq!(f.page_number, 1);
                assert_eq!(f.text, "alpha");
                let cols: Vec<String> = f.bounds.iter().map(|b| b.column()).collect();
                assert_eq!(
                    cols,
                    vec!["bottom_right_x", "top_left_x", "bottom_left_y", "top_right_y"]
                );
                let values: Vec<f64> = f.bounds.iter().map(|b| b.value).collect();
                assert_eq!(values, vec![0.0, 0.6, 0.0, 0.6]);
            }
            other => panic!("expected line filter, got {:?}", other),
        }
    }

    #[test]
    fn test_containing_region_matches() {
        assert!(compiled([[0.0, 0.6], [0.6, 0.0]]).matches(&scenario_line()));
        assert!(compiled([[0.0, 1.0], [1.0, 0.0]]).matches(&scenario_line()));
    }

    #[test]
    fn test_disjoint_region_rejects() {
        assert!(!compiled([[0.6, 0.6], [0.9, 0.9]]).matches(&scenario_line()));
        assert!(!compiled([[0.0, 0.9], [0.9, 0.5]]).matches(&scenario_line()));
    }

    #[test]
    fn test_partial_overlap_matches() {
        // Covers only the right end of the line.
        assert!(compiled([[0.4, 0.25], [0.9, 0.2]]).matches(&scenario_line()));
        // Shares only the line's left edge.
        assert!(compiled([[0.05, 0.5], [0.1, 0.05]]).matches(&scenario_line()));
    }

    #[test]
    fn test_predicate_agrees_with_rectangle_intersection() {
        let steps = [0.0, 0.15, 0.3, 0.45, 0.6, 0.75, 0.9, 1.0];
        let line = scenario_line();
        let c = &line.pages[0].lines[0].coordinates;
        for &x0 in &steps {
            for &x1 in &steps {
                for &ya in &steps {
                    for &yb in &steps {
                        let s = search("alpha", 1, [[x0, ya], [x1, yb]]);
                        let Ok(region) = validate(&s) else { continue };
                        let expected = region.left <= c.bottom_right.x
                            && region.right >= c.top_left.x
                            && region.top <= c.bottom_left.y
                            && region.bottom >= c.top_left.y;
                        let filter = compile(&Node::Search(s.clone())).unwrap();
                        assert_eq!(filter.matches(&line), expected, "region {:?}", s);
                    }
                }
            }
        }
    }

    #[test]
    fn test_combinators_compile_recursively() {
        let v = json!({"and": [
            {"search": {"text": "alpha", "page_number": 1, "coordinates": [[0.0, 1.0], [1.0, 0.0]]}},
            {"not": [{"search": {"text": "beta", "page_number": 1, "coordinates": [[0.0, 1.0], [1.0, 0.0]]}}]}
        ]});
        let filter = compile_value(&v).unwrap();
        assert!(matches!(&filter, Filter::And(c) if c.len() == 2));
        assert!(filter.matches(&scenario_line()));
    }

    #[test]
    fn test_invalid_leaf_fails_whole_tree() {
        let v = json!({"or": [
            {"search": {"text": "alpha", "page_number": 1, "coordinates": [[0.0, 1.0], [1.0, 0.0]]}},
            {"search": {"text": "beta", "page_number": 0, "coordinates": [[0.0, 1.0], [1.0, 0.0]]}}
        ]});
        assert_eq!(compile_value(&v).unwrap_err(), QueryError::PageZero);
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let v = json!({"or": [
            {"search": {"text": "alpha", "page_number": 3, "coordinates": [[0.1, 0.8], [0.7, 0.2]]}},
            {"not": [{"search": {"text": "b", "page_number": 1, "coordinates": [[0.0, 1.0], [1.0, 0.0]]}}]}
        ]});
        assert_eq!(compile_value(&v).unwrap(), compile_value(&v).unwrap());
    }
}
