//! OCR block model and engine abstraction.
//!
//! An [`OcrEngine`] turns a `(bucket, key)` file reference into a flat,
//! ordered list of [`Block`]s. Only `PAGE` and `LINE` blocks matter to the
//! normalizer; anything else the producer emits is carried as
//! [`BlockType::Other`] and ignored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::BoundingBox;
use crate::BoxError;

/// Kind of an OCR block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Page,
    Line,
    #[serde(other)]
    Other,
}

/// A single block in the producer's flat output.
///
/// `children` lists the identifiers of child blocks; for a page these are
/// usually lines but may reference any block type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub block_type: BlockType,
    /// 1-based page index, when the producer reports one.
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub children: Vec<String>,
}

impl Block {
    pub fn page(id: impl Into<String>, page: Option<i64>, children: Vec<String>) -> Self {
        Self {
            id: id.into(),
            block_type: BlockType::Page,
            page,
            text: None,
            bounding_box: None,
            children,
        }
    }

    pub fn line(id: impl Into<String>, text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            id: id.into(),
            block_type: BlockType::Line,
            page: None,
            text: Some(text.into()),
            bounding_box: Some(bbox),
            children: Vec::new(),
        }
    }
}

/// Failure of a single OCR request. Both kinds are fatal to the event
/// being processed; redelivery is left to the delivery plane.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The service could not be reached or the transfer broke off.
    #[error("ocr service unavailable: {context}")]
    Unavailable {
        context: String,
        #[source]
        source: BoxError,
    },
    /// The service answered but refused or failed this request.
    #[error("ocr request rejected: {context}")]
    Rejected {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl OcrError {
    pub fn unavailable(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Unavailable {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn rejected(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Rejected {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "OCR_UNAVAILABLE",
            Self::Rejected { .. } => "OCR_REJECTED",
        }
    }
}

/// Text detection backend.
///
/// Implementations must be `Send + Sync`; one engine is shared by every
/// in-flight pipeline task.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Detect text lines in the object at `bucket/key`.
    async fn detect(&self, bucket: &str, key: &str) -> Result<Vec<Block>, OcrError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_block_types_deserialize_as_other() {
        let blocks: Vec<Block> = serde_json::from_str(
            r#"[
                {"id": "p", "block_type": "PAGE", "page": 2, "children": ["l", "w"]},
                {"id": "l", "block_type": "LINE", "text": "hi",
                 "bounding_box": {"left": 0.1, "top": 0.1, "width": 0.2, "height": 0.1}},
                {"id": "w", "block_type": "WORD", "text": "hi"}
            ]"#,
        )
        .unwrap();
        assert_eq!(blocks[0].block_type, BlockType::Page);
        assert_eq!(blocks[0].page, Some(2));
        assert_eq!(blocks[1].block_type, BlockType::Line);
        assert_eq!(blocks[2].block_type, BlockType::Other);
        assert!(blocks[2].children.is_empty());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            OcrError::unavailable("connect", "refused").code(),
            "OCR_UNAVAILABLE"
        );
        assert_eq!(OcrError::rejected("status 400", "bad").code(), "OCR_REJECTED");
    }
}
