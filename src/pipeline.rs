//! Indexing pipeline: change events in, store mutations out.
//!
//! A batch is processed in four steps, strictly in this order:
//!
//! 1. OCR and normalize every created file.
//! 2. Resolve removed files to document identity keys.
//! 3. Upsert the normalized documents.
//! 4. Delete the resolved keys.
//!
//! So within one batch every upsert commits before any delete starts.
//! Routing runs before step 1; an unsupported event fails the batch with no
//! OCR or store call. There are no retries here; a failed batch is expected
//! to be redelivered.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use pagegrep_core::events::{route, ChangeEvent, EventError};
use pagegrep_core::filter::Query;
use pagegrep_core::models::{Document, DocumentKey};
use pagegrep_core::normalize::normalize;
use pagegrep_core::ocr::{OcrEngine, OcrError};
use pagegrep_core::store::{DocumentStore, StoreError};

/// Removed keys per resolution query.
const RESOLVE_CHUNK: usize = 500;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("failed to parse s3://{bucket}/{key}")]
    ParseFailed {
        bucket: String,
        key: String,
        #[source]
        source: OcrError,
    },
    #[error("failed to resolve removed files in bucket {bucket}")]
    Resolve {
        bucket: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to upsert documents")]
    UpsertFailed(#[source] StoreError),
    #[error("failed to delete documents")]
    DeleteFailed(#[source] StoreError),
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Event(e) => e.code(),
            Self::ParseFailed { .. } => "PARSE_FAILED",
            Self::Resolve { source, .. } => source.code(),
            Self::UpsertFailed(_) => "UPSERT_FAILED",
            Self::DeleteFailed(_) => "DELETE_FAILED",
        }
    }

    /// Whether the batch itself was bad, as opposed to a backend failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Event(_))
    }
}

/// Outcome of a processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Documents upserted.
    pub upserted: usize,
    /// Stored documents deleted.
    pub deleted: usize,
    /// Events dropped for an unsupported extension.
    pub skipped: usize,
}

/// Indexing pipeline over a shared OCR engine and store.
#[derive(Clone)]
pub struct Pipeline {
    ocr: Arc<dyn OcrEngine>,
    store: Arc<dyn DocumentStore>,
}

impl Pipeline {
    pub fn new(ocr: Arc<dyn OcrEngine>, store: Arc<dyn DocumentStore>) -> Self {
        Self { ocr, store }
    }

    pub async fn process(&self, events: &[ChangeEvent]) -> Result<BatchReport, PipelineError> {
        let plan = route(events).inspect_err(|e| {
            tracing::warn!(error = %e, events = events.len(), "rejected event batch");
        })?;
        if plan.is_empty() {
            tracing::debug!(skipped = plan.skipped, "nothing to index in batch");
            return Ok(BatchReport {
                skipped: plan.skipped,
                ..BatchReport::default()
            });
        }
        tracing::debug!(
            upserts = plan.upserts.len(),
            removals = plan.delete_count(),
            skipped = plan.skipped,
            "routed event batch"
        );

        let mut documents: Vec<Document> = Vec::with_capacity(plan.upserts.len());
        for file in &plan.upserts {
            let blocks = self.ocr.detect(&file.bucket, &file.key).await.map_err(|source| {
                tracing::error!(bucket = %file.bucket, key = %file.key, error = %source, "OCR failed");
                PipelineError::ParseFailed {
                    bucket: file.bucket.clone(),
                    key: file.key.clone(),
                    source,
                }
            })?;
            documents.push(normalize(&file.bucket, &file.key, &blocks));
        }

        let mut doomed: Vec<DocumentKey> = Vec::new();
        for (bucket, keys) in &plan.deletes {
            for chunk in keys.chunks(RESOLVE_CHUNK) {
                let found = self
                    .store
                    .query_document_keys(&Query::file_info(bucket.clone(), chunk.to_vec()))
                    .await
                    .map_err(|source| PipelineError::Resolve {
                        bucket: bucket.clone(),
                        source,
                    })?;
                doomed.extend(found);
            }
        }
        // A key removed twice in one batch resolves once per chunk it lands in.
        doomed.sort();
        doomed.dedup();

        if !documents.is_empty() {
            self.store
                .upsert(&documents)
                .await
                .map_err(PipelineError::UpsertFailed)?;
        }
        if !doomed.is_empty() {
            self.store
                .delete(&doomed)
                .await
                .map_err(PipelineError::DeleteFailed)?;
        }

        let report = BatchReport {
            upserted: documents.len(),
            deleted: doomed.len(),
            skipped: plan.skipped,
        };
        tracing::info!(
            upserted = report.upserted,
            deleted = report.deleted,
            skipped = report.skipped,
            "processed event batch"
        );
        Ok(report)
    }
}
