//! In-memory [`DocumentStore`] implementation for tests and embedding.
//!
//! Documents are kept as whole trees in insertion order behind a
//! `std::sync::RwLock`. Queries evaluate the [`Filter`](crate::filter::Filter)
//! expression directly against each tree.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::filter::Query;
use crate::models::{Document, DocumentKey};

use super::{DocumentStore, StoreError};

/// In-memory document store.
pub struct InMemoryStore {
    docs: RwLock<Vec<Document>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Document>>, StoreError> {
        self.docs
            .read()
            .map_err(|_| StoreError::read("lock documents", "lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Document>>, StoreError> {
        self.docs
            .write()
            .map_err(|_| StoreError::write("lock documents", "lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn setup(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert(&self, documents: &[Document]) -> Result<(), StoreError> {
        let mut docs = self.write()?;
        for doc in documents {
            match docs.iter_mut().find(|d| d.is_file(&doc.bucket, &doc.key)) {
                Some(existing) => existing.pages = doc.pages.clone(),
                None => docs.push(doc.clone()),
            }
        }
        Ok(())
    }

    async fn delete(&self, keys: &[DocumentKey]) -> Result<(), StoreError> {
        let mut docs = self.write()?;
        docs.retain(|d| !keys.contains(&d.id));
        Ok(())
    }

    async fn delete_by_file_info(&self, query: &Query) -> Result<(), StoreError> {
        let mut docs = self.write()?;
        docs.retain(|d| !query.matches(d));
        Ok(())
    }

    async fn query_documents(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let docs = self.read()?;
        Ok(docs.iter().filter(|d| query.matches(d)).cloned().collect())
    }

    async fn query_document_keys(&self, query: &Query) -> Result<Vec<DocumentKey>, StoreError> {
        let docs = self.read()?;
        Ok(docs
            .iter()
            .filter(|d| query.matches(d))
            .map(|d| d.id.clone())
            .collect())
    }

    async fn count_documents(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.len() as u64)
    }
}
