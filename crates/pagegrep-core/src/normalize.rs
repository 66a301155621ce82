//! Fold a flat OCR block list into a document tree.
//!
//! ```text
//! [PAGE, LINE, LINE, WORD, PAGE, LINE, ...]
//!        │
//!        ▼
//! Document ─┬─ Page 1 ─┬─ Line ── Coordinates
//!           │          └─ Line ── Coordinates
//!           └─ Page 2 ─── Line ── Coordinates
//! ```
//!
//! Pages keep the producer's order. A page's lines follow the order of its
//! child references; references that do not resolve to a `LINE` block are
//! skipped. Every node gets a fresh UUID v4.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{Coordinates, Document, Line, Page};
use crate::ocr::{Block, BlockType};

/// Build the document tree for `bucket/key` from an OCR block list.
pub fn normalize(bucket: &str, key: &str, blocks: &[Block]) -> Document {
    let lines: HashMap<&str, &Block> = blocks
        .iter()
        .filter(|b| b.block_type == BlockType::Line)
        .map(|b| (b.id.as_str(), b))
        .collect();

    let pages = blocks
        .iter()
        .filter(|b| b.block_type == BlockType::Page)
        .map(|page| Page {
            id: fresh_id(),
            page_number: page.page.filter(|n| *n >= 1).unwrap_or(1),
            lines: page
                .children
                .iter()
                .filter_map(|child| lines.get(child.as_str()))
                .map(|line| to_line(line))
                .collect(),
        })
        .collect();

    Document {
        id: fresh_id(),
        bucket: bucket.to_string(),
        key: key.to_string(),
        pages,
    }
}

fn to_line(block: &Block) -> Line {
    let bbox = block.bounding_box.unwrap_or_default();
    Line {
        id: fresh_id(),
        text: block.text.clone().unwrap_or_default(),
        coordinates: Coordinates::from_bounding_box(fresh_id(), &bbox),
    }
}

/// Render a document tree back into a flat block list.
///
/// Page blocks come first in page order, each followed by its line
/// blocks; page children reference the line block ids. Feeding the result
/// to [`normalize`] reproduces the tree up to identifiers.
pub fn flatten(doc: &Document) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(doc.pages.len() + doc.line_count());
    for page in &doc.pages {
        blocks.push(Block::page(
            page.id.clone(),
            Some(page.page_number),
            page.lines.iter().map(|l| l.id.clone()).collect(),
        ));
        for line in &page.lines {
            blocks.push(Block::line(
                line.id.clone(),
                line.text.clone(),
                line.coordinates.bounding_box(),
            ));
        }
    }
    blocks
}

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}
