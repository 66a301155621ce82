#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use pagegrep::db;
use pagegrep::sqlite_store::SqliteStore;
use pagegrep_core::filter::Query;
use pagegrep_core::models::{BoundingBox, Document, DocumentKey};
use pagegrep_core::ocr::{Block, OcrEngine, OcrError};
use pagegrep_core::store::{DocumentStore, StoreError};

/// OCR fake returning canned blocks per `bucket/key` and recording calls.
#[derive(Default)]
pub struct ScriptedOcr {
    pages: Mutex<HashMap<String, Vec<Block>>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, bucket: &str, key: &str, lines: &[(&str, BoundingBox)]) -> Self {
        let line_ids: Vec<String> = (0..lines.len()).map(|i| format!("l{}", i)).collect();
        let mut blocks = vec![Block::page("p1", Some(1), line_ids.clone())];
        for (id, (text, bbox)) in line_ids.iter().zip(lines) {
            blocks.push(Block::line(id.clone(), *text, *bbox));
        }
        self.pages
            .lock()
            .unwrap()
            .insert(format!("{}/{}", bucket, key), blocks);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn detect(&self, bucket: &str, key: &str) -> Result<Vec<Block>, OcrError> {
        let file = format!("{}/{}", bucket, key);
        self.calls.lock().unwrap().push(file.clone());
        self.pages
            .lock()
            .unwrap()
            .get(&file)
            .cloned()
            .ok_or_else(|| OcrError::rejected(file, "no such object"))
    }
}

/// Store wrapper counting every call that reaches the backend.
pub struct RecordingStore {
    inner: Arc<dyn DocumentStore>,
    calls: AtomicUsize,
}

impl RecordingStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn setup(&self) -> Result<(), StoreError> {
        self.hit();
        self.inner.setup().await
    }

    async fn upsert(&self, documents: &[Document]) -> Result<(), StoreError> {
        self.hit();
        self.inner.upsert(documents).await
    }

    async fn delete(&self, keys: &[DocumentKey]) -> Result<(), StoreError> {
        self.hit();
        self.inner.delete(keys).await
    }

    async fn delete_by_file_info(&self, query: &Query) -> Result<(), StoreError> {
        self.hit();
        self.inner.delete_by_file_info(query).await
    }

    async fn query_documents(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.hit();
        self.inner.query_documents(query).await
    }

    async fn query_document_keys(&self, query: &Query) -> Result<Vec<DocumentKey>, StoreError> {
        self.hit();
        self.inner.query_document_keys(query).await
    }

    async fn count_documents(&self) -> Result<u64, StoreError> {
        self.hit();
        self.inner.count_documents().await
    }
}

/// A fresh SQLite store with its schema in a temporary directory.
pub async fn sqlite_store() -> (TempDir, Arc<SqliteStore>) {
    let tmp = TempDir::new().unwrap();
    let pool = db::connect_path(&tmp.path().join("data").join("pagegrep.sqlite"))
        .await
        .unwrap();
    let store = Arc::new(SqliteStore::new(pool));
    store.setup().await.unwrap();
    (tmp, store)
}

pub fn bbox(left: f64, top: f64, width: f64, height: f64) -> BoundingBox {
    BoundingBox {
        left,
        top,
        width,
        height,
    }
}

/// The line used throughout the search scenarios.
pub fn alpha_line() -> (&'static str, BoundingBox) {
    ("alpha", bbox(0.1, 0.1, 0.4, 0.2))
}
