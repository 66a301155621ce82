//! Grouping of matched documents into the search response shape.

use std::collections::BTreeMap;

use crate::models::Document;

/// `bucket → [key, ...]`. Buckets are sorted; keys keep first-seen order.
pub type SearchResults = BTreeMap<String, Vec<String>>;

/// Group documents by bucket, dropping repeated keys.
pub fn group_by_bucket(documents: &[Document]) -> SearchResults {
    let mut grouped = SearchResults::new();
    for doc in documents {
        let keys = grouped.entry(doc.bucket.clone()).or_default();
        if !keys.contains(&doc.key) {
            keys.push(doc.key.clone());
        }
    }
    grouped
}
