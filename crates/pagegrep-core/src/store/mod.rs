//! Storage abstraction for document trees.
//!
//! The [`DocumentStore`] trait covers every storage operation the indexing
//! pipeline and query service need, so backends are interchangeable
//! (SQLite in the application crate, [`memory::InMemoryStore`] here).
//!
//! Implementations must be `Send + Sync`; one store is shared by every
//! in-flight task.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::filter::Query;
use crate::models::{Document, DocumentKey};
use crate::BoxError;

/// Storage failure. `context` names the step that failed; the outer
/// message only carries the generic kind.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store write failed")]
    Write {
        context: String,
        #[source]
        source: BoxError,
    },
    #[error("store read failed")]
    Read {
        context: String,
        #[source]
        source: BoxError,
    },
    #[error("stored document could not be decoded")]
    Decode {
        context: String,
        #[source]
        source: BoxError,
    },
    #[error("store schema setup failed")]
    Ddl {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub fn write(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Write {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn read(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Read {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn decode(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Decode {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn ddl(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Ddl {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Write { .. } => "STORE_WRITE",
            Self::Read { .. } => "STORE_READ",
            Self::Decode { .. } => "DECODE",
            Self::Ddl { .. } => "STORE_DDL",
        }
    }

    /// The step that failed, for diagnostics.
    pub fn context(&self) -> &str {
        match self {
            Self::Write { context, .. }
            | Self::Read { context, .. }
            | Self::Decode { context, .. }
            | Self::Ddl { context, .. } => context,
        }
    }
}

/// Abstract storage backend for document trees.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`setup`](DocumentStore::setup) | Ensure schema exists (idempotent) |
/// | [`upsert`](DocumentStore::upsert) | Insert or replace documents by `(bucket, key)` |
/// | [`delete`](DocumentStore::delete) | Delete documents by identity key |
/// | [`delete_by_file_info`](DocumentStore::delete_by_file_info) | Delete documents matching a query |
/// | [`query_documents`](DocumentStore::query_documents) | Full trees of matching documents |
/// | [`query_document_keys`](DocumentStore::query_document_keys) | Identity keys of matching documents |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Ensure tables, indexes, or collections exist. Safe to call repeatedly.
    async fn setup(&self) -> Result<(), StoreError>;

    /// Insert or replace each document, keyed by `(bucket, key)`.
    ///
    /// Each document's subtree is replaced atomically. An existing document
    /// keeps its identity key. Documents are written in order and the first
    /// failure stops the call; earlier documents stay written.
    async fn upsert(&self, documents: &[Document]) -> Result<(), StoreError>;

    /// Delete documents (and their subtrees) by identity key. Unknown keys
    /// are ignored.
    async fn delete(&self, keys: &[DocumentKey]) -> Result<(), StoreError>;

    /// Delete every document matching `query`.
    async fn delete_by_file_info(&self, query: &Query) -> Result<(), StoreError>;

    /// Full trees of matching documents, in insertion order.
    async fn query_documents(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Identity keys of matching documents, in insertion order.
    async fn query_document_keys(&self, query: &Query) -> Result<Vec<DocumentKey>, StoreError>;

    /// Number of stored documents.
    async fn count_documents(&self) -> Result<u64, StoreError>;
}
