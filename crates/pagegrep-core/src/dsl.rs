//! Search DSL: parsing and structural validation.
//!
//! ```text
//! Value      ::= SearchWrap | BoolWrap
//! SearchWrap ::= {"search": Search}
//! Search     ::= {"text": string, "page_number": int64, "coordinates": [[f64,f64],[f64,f64]]}
//! BoolWrap   ::= {"and"|"or"|"not": [Value, ...]}
//! ```
//!
//! Every object carries exactly one key. Coordinates arrive in the caller's
//! convention (`y` grows upward, index 0 top-left, index 1 bottom-right);
//! this module keeps them verbatim. Field-level validation and the axis
//! swap happen in [`crate::compile`].

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// The atomic DSL unit: text on a page within a rectangle.
///
/// Missing fields take their zero values so that the per-field checks
/// report them (`""` → `MISSING_TEXT`, `0` → `PAGE_ZERO`, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchObject {
    pub text: String,
    pub page_number: i64,
    pub coordinates: [[f64; 2]; 2],
}

impl SearchObject {
    pub fn new(text: impl Into<String>, page_number: i64, coordinates: [[f64; 2]; 2]) -> Self {
        Self {
            text: text.into(),
            page_number,
            coordinates,
        }
    }
}

/// Search DSL syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Search(SearchObject),
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Vec<Node>),
}

/// Rejected search request. Every variant is a client error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("search text must not be empty")]
    MissingText,
    #[error("page_number must not be 0")]
    PageZero,
    #[error("bottom-right coordinate must not be 0")]
    BottomCoordZero,
    #[error("top-left coordinate must be above and to the left of the bottom-right coordinate")]
    CoordMisplaced,
    #[error("query object must have exactly one attribute, found {0}")]
    TooManyAttrs(usize),
    #[error("unsupported query key: {0}")]
    KeyUnsupported(String),
    #[error("incorrect type for {0}")]
    TypeIncorrect(String),
}

impl QueryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingText => "MISSING_TEXT",
            Self::PageZero => "PAGE_ZERO",
            Self::BottomCoordZero => "BOTTOM_COORD_ZERO",
            Self::CoordMisplaced => "COORD_MISPLACED",
            Self::TooManyAttrs(_) => "TOO_MANY_ATTRS",
            Self::KeyUnsupported(_) => "KEY_UNSUPPORTED",
            Self::TypeIncorrect(_) => "TYPE_INCORRECT",
        }
    }
}

impl Node {
    /// Parse a JSON value into a syntax tree, checking structure only.
    pub fn parse(value: &Value) -> Result<Node, QueryError> {
        let map = match value {
            Value::Object(map) if !map.is_empty() => map,
            Value::Object(_) => return Err(QueryError::TypeIncorrect("empty query object".into())),
            other => {
                return Err(QueryError::TypeIncorrect(format!(
                    "query (expected object, got {})",
                    json_type(other)
                )))
            }
        };
        if map.len() > 1 {
            return Err(QueryError::TooManyAttrs(map.len()));
        }

        let (key, inner) = map
            .iter()
            .next()
            .ok_or_else(|| QueryError::TypeIncorrect("empty query object".into()))?;

        match key.as_str() {
            "search" => parse_search(inner).map(Node::Search),
            "and" => parse_list(key, inner).map(Node::And),
            "or" => parse_list(key, inner).map(Node::Or),
            "not" => parse_list(key, inner).map(Node::Not),
            other => Err(QueryError::KeyUnsupported(other.to_string())),
        }
    }

    /// Number of search objects in the tree.
    #[cfg(test)]
    fn leaf_count(&self) -> usize {
        match self {
            Node::Search(_) => 1,
            Node::And(c) | Node::Or(c) | Node::Not(c) => c.iter().map(Node::leaf_count).sum(),
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Node::Search(_) => "search",
            Node::And(_) => "and",
            Node::Or(_) => "or",
            Node::Not(_) => "not",
        }
    }
}

fn parse_search(value: &Value) -> Result<SearchObject, QueryError> {
    if !value.is_object() {
        return Err(QueryError::TypeIncorrect(format!(
            "search (expected object, got {})",
            json_type(value)
        )));
    }
    SearchObject::deserialize(value).map_err(|e| QueryError::TypeIncorrect(format!("search: {}", e)))
}

fn parse_list(key: &str, value: &Value) -> Result<Vec<Node>, QueryError> {
    match value {
        Value::Array(items) => items.iter().map(Node::parse).collect(),
        other => Err(QueryError::TypeIncorrect(format!(
            "{} (expected array, got {})",
            key,
            json_type(other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Node::Search(s) => map.serialize_entry(self.tag(), s)?,
            Node::And(c) | Node::Or(c) | Node::Not(c) => map.serialize_entry(self.tag(), c)?,
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_search_object() {
        let v = json!({"search": {"text": "alpha", "page_number": 1, "coordinates": [[0.0, 0.6], [0.6, 0.0]]}});
        let node = Node::parse(&v).unwrap();
        assert_eq!(
            node,
            Node::Search(SearchObject::new("alpha", 1, [[0.0, 0.6], [0.6, 0.0]]))
        );
    }

    #[test]
    fn test_parses_nested_booleans() {
        let s = json!({"search": {"text": "a", "page_number": 1, "coordinates": [[0.1, 0.1], [0.5, 0.5]]}});
        let v = json!({"and": [s.clone(), {"or": [s.clone(), {"not": [s]}]}]});
        let node = Node::parse(&v).unwrap();
        match &node {
            Node::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[1], Node::Or(inner) if inner.len() == 2));
            }
            other => panic!("expected and, got {:?}", other),
        }
        assert_eq!(node.leaf_count(), 3);
    }

    #[test]
    fn test_two_top_level_keys() {
        let v = json!({"search": {"text": "a"}, "extra": {}});
        let err = Node::parse(&v).unwrap_err();
        assert_eq!(err.code(), "TOO_MANY_ATTRS");
    }

    #[test]
    fn test_unknown_key() {
        let err = Node::parse(&json!({"xor": []})).unwrap_err();
        assert_eq!(err, QueryError::KeyUnsupported("xor".into()));
        assert_eq!(err.code(), "KEY_UNSUPPORTED");
    }

    #[test]
    fn test_search_value_must_be_search_object() {
        for bad in [
            json!({"search": "alpha"}),
            json!({"search": [1, 2]}),
            json!({"search": {"text": 5}}),
            json!({"search": {"text": "a", "page_number": 1.5}}),
            json!({"search": {"text": "a", "coordinates": [[0.1], [0.2, 0.3]]}}),
        ] {
            let err = Node::parse(&bad).unwrap_err();
            assert_eq!(err.code(), "TYPE_INCORRECT", "input: {}", bad);
        }
    }

    #[test]
    fn test_combinator_value_must_be_array() {
        let err = Node::parse(&json!({"and": {"search": {}}})).unwrap_err();
        assert_eq!(err.code(), "TYPE_INCORRECT");
    }

    #[test]
    fn test_non_object_and_empty_object() {
        assert_eq!(Node::parse(&json!([])).unwrap_err().code(), "TYPE_INCORRECT");
        assert_eq!(Node::parse(&json!({})).unwrap_err().code(), "TYPE_INCORRECT");
    }

    #[test]
    fn test_nested_errors_propagate() {
        let v = json!({"or": [{"search": {"text": "a"}}, {"bogus": 1}]});
        assert_eq!(Node::parse(&v).unwrap_err().code(), "KEY_UNSUPPORTED");
    }

    #[test]
    fn test_missing_fields_take_zero_values() {
        let node = Node::parse(&json!({"search": {}})).unwrap();
        assert_eq!(node, Node::Search(SearchObject::default()));
    }

    #[test]
    fn test_serializes_back_to_the_same_value() {
        let v = json!({"or": [
            {"search": {"text": "a", "page_number": 2, "coordinates": [[0.1, 0.9], [0.5, 0.2]]}},
            {"not": []}
        ]});
        let node = Node::parse(&v).unwrap();
        assert_eq!(serde_json::to_value(&node).unwrap(), v);
    }
}
