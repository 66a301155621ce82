//! Query service.
//!
//! Parses a search-DSL request body, compiles it, runs it against the
//! store, and groups the matches by bucket. The core pieces live in
//! `pagegrep-core` (`dsl`, `compile`, `search`); this wrapper drives them
//! through a shared [`DocumentStore`] and provides the CLI entry point.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use thiserror::Error;

pub use pagegrep_core::search::{group_by_bucket, SearchResults};

use pagegrep_core::compile::compile_value;
use pagegrep_core::dsl::QueryError;
use pagegrep_core::filter::Query;
use pagegrep_core::store::{DocumentStore, StoreError};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SearchError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Query(e) => e.code(),
            Self::Store(e) => e.code(),
        }
    }
}

/// Runs search requests against a shared store.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn DocumentStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Run a DSL request body. `scope` restricts results to those buckets.
    ///
    /// The whole request is validated before the store is called.
    pub async fn search(
        &self,
        body: &Value,
        scope: Option<Vec<String>>,
    ) -> Result<SearchResults, SearchError> {
        let filter = compile_value(body)?;
        let mut query = Query::new(filter);
        if let Some(buckets) = scope {
            query = query.within(buckets);
        }
        let documents = self.store.query_documents(&query).await?;
        tracing::debug!(matches = documents.len(), "search complete");
        Ok(group_by_bucket(&documents))
    }
}

/// CLI entry point for `pagegrep search`: prints the grouped JSON payload.
pub async fn run_search(config: &Config, body: &str, buckets: Vec<String>) -> Result<()> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| anyhow::anyhow!("Search body is not valid JSON: {}", e))?;

    let pool = db::connect(config).await?;
    let service = QueryService::new(Arc::new(SqliteStore::new(pool.clone())));
    let scope = if buckets.is_empty() { None } else { Some(buckets) };

    let result = service.search(&value, scope).await;
    pool.close().await;
    let results = result.map_err(|e| anyhow::anyhow!("{} ({})", e, e.code()))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "message": "success",
            "data": results,
        }))?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagegrep_core::models::BoundingBox;
    use pagegrep_core::normalize::normalize;
    use pagegrep_core::ocr::Block;
    use pagegrep_core::store::memory::InMemoryStore;
    use serde_json::json;

    async fn service_with(files: &[(&str, &str, &str)]) -> QueryService {
        let store = InMemoryStore::new();
        let docs: Vec<_> = files
            .iter()
            .map(|(bucket, key, text)| {
                normalize(
                    bucket,
                    key,
                    &[
                        Block::page("p", Some(1), vec!["l".into()]),
                        Block::line(
                            "l",
                            *text,
                            BoundingBox {
                                left: 0.1,
                                top: 0.1,
                                width: 0.4,
                                height: 0.2,
                            },
                        ),
                    ],
                )
            })
            .collect();
        store.upsert(&docs).await.unwrap();
        QueryService::new(Arc::new(store))
    }

    fn anywhere(text: &str) -> Value {
        json!({"search": {"text": text, "page_number": 1, "coordinates": [[0.0, 1.0], [1.0, 0.0]]}})
    }

    #[tokio::test]
    async fn test_groups_matches_by_bucket() {
        let service = service_with(&[
            ("b2", "x.jpg", "alpha"),
            ("b1", "p.jpg", "alpha"),
            ("b1", "q.jpg", "beta"),
            ("b1", "r.jpg", "alpha"),
        ])
        .await;
        let results = service.search(&anywhere("alpha"), None).await.unwrap();
        assert_eq!(results["b1"], vec!["p.jpg", "r.jpg"]);
        assert_eq!(results["b2"], vec!["x.jpg"]);
    }

    #[tokio::test]
    async fn test_scope_limits_buckets() {
        let service = service_with(&[("b1", "p.jpg", "alpha"), ("b2", "x.jpg", "alpha")]).await;
        let results = service
            .search(&anywhere("alpha"), Some(vec!["b2".into()]))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results.contains_key("b2"));
    }

    #[tokio::test]
    async fn test_validation_error_is_reported() {
        let service = service_with(&[]).await;
        let err = service
            .search(&json!({"search": {"text": "", "page_number": 1}}), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MISSING_TEXT");
    }
}
