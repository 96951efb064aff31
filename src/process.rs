//! Pipeline orchestrator: drive one document through the state machine.
//!
//! ```text
//! uploaded → processing → classified → {completed | flagged}
//! ```
//!
//! [`Processor::process`] is the single produced interface of this crate:
//! it returns once the document has reached a terminal status and side-
//! effects only through the storage collaborator. Any failure at any stage
//! is trapped at this boundary, written onto the document, and turned into
//! a `flagged` status — a run is fire-and-forget from its caller's
//! perspective, so an escaped error would otherwise vanish.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use crate::config::ProcessorConfig;
use crate::error::PipelineError;
use crate::intel::IntelligenceClient;
use crate::model::{
    Document, DocumentPatch, DocumentStatus, IssueKind, NewExtraction, NewReviewFlag, PageImage,
};
use crate::pipeline::{classify, extract, raster, triage};
use crate::store::DocumentStore;

/// Field name used on whole-document flags raised when no extractor exists
/// for the classified category.
const DOCUMENT_TYPE_FIELD: &str = "Document Type";

/// Sequences the pipeline stages per document and owns all status writes.
///
/// Shared safely across concurrent runs: the intelligence client is
/// stateless apart from its audit log, and the store guarantees per-call
/// atomicity.
pub struct Processor {
    store: Arc<dyn DocumentStore>,
    intel: Arc<IntelligenceClient>,
    config: ProcessorConfig,
}

impl Processor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        intel: Arc<IntelligenceClient>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            store,
            intel,
            config,
        }
    }

    /// Process one uploaded document to a terminal status.
    ///
    /// `content` is the document's extracted text (the file-access
    /// collaborator's output). Never returns an error: failures are
    /// recorded on the document and force `flagged`.
    pub async fn process(&self, document: &Document, content: &str) {
        info!(
            document_id = %document.id,
            original_name = %document.original_name,
            content_len = content.len(),
            "processing document"
        );

        if let Err(err) = self.run(document, content).await {
            error!(document_id = %document.id, error = %err, "pipeline run failed");
            let patch = DocumentPatch {
                status: Some(DocumentStatus::Flagged),
                processing_error: Some(err.to_string()),
                ..Default::default()
            };
            if let Err(store_err) = self.store.update_document(document.id, patch).await {
                // Nothing left to do but make the failure visible in logs:
                // the document row itself could not be updated.
                error!(
                    document_id = %document.id,
                    error = %store_err,
                    "failed to record pipeline failure on document"
                );
            }
        }
    }

    async fn run(&self, document: &Document, content: &str) -> Result<(), PipelineError> {
        self.store
            .update_document(document.id, DocumentPatch::status(DocumentStatus::Processing))
            .await?;

        // Rasterisation is best-effort: a conversion failure downgrades the
        // run to text-only instead of aborting it.
        let images = self.rasterize_if_pdf(document).await;

        let classification = classify::classify(&self.intel, content, &images).await?;
        info!(
            document_id = %document.id,
            category = classification.category.label(),
            confidence = classification.confidence,
            "document classified"
        );
        self.store
            .update_document(
                document.id,
                DocumentPatch {
                    status: Some(DocumentStatus::Classified),
                    classification: Some(classification.category),
                    classification_confidence: Some(classification.confidence),
                    ..Default::default()
                },
            )
            .await?;

        if !classification.category.has_extractor() {
            self.store
                .create_flag(NewReviewFlag {
                    document_id: document.id,
                    customer_id: document.customer_id,
                    issue: IssueKind::NotSpecified,
                    field_name: Some(DOCUMENT_TYPE_FIELD.into()),
                    current_value: Some(classification.category.label().into()),
                })
                .await?;
            self.store
                .update_document(document.id, DocumentPatch::status(DocumentStatus::Flagged))
                .await?;
            return Ok(());
        }

        let extraction =
            extract::extract(&self.intel, classification.category, content, &images).await?;
        self.store
            .create_extraction(NewExtraction {
                document_id: document.id,
                customer_id: document.customer_id,
                payload: extraction.payload.clone(),
                overall_confidence: extraction.overall_confidence,
            })
            .await?;

        for candidate in triage::triage(&extraction.payload) {
            self.store
                .create_flag(NewReviewFlag {
                    document_id: document.id,
                    customer_id: document.customer_id,
                    issue: IssueKind::LowConfidence,
                    field_name: Some(candidate.field_path),
                    current_value: Some(candidate.value),
                })
                .await?;
        }

        self.store
            .update_document(
                document.id,
                DocumentPatch {
                    status: Some(DocumentStatus::Completed),
                    processed_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        info!(document_id = %document.id, "document completed");
        Ok(())
    }

    async fn rasterize_if_pdf(&self, document: &Document) -> Vec<PageImage> {
        if !document.is_pdf() {
            return Vec::new();
        }
        let path = self.config.upload_dir.join(&document.filename);
        match raster::rasterize(&path, self.config.max_raster_pixels).await {
            Ok(images) => {
                info!(
                    document_id = %document.id,
                    pages = images.len(),
                    "rasterised for vision processing"
                );
                images
            }
            Err(err) => {
                warn!(
                    document_id = %document.id,
                    error = %err,
                    "rasterisation failed, falling back to text-only processing"
                );
                Vec::new()
            }
        }
    }

    /// Process a batch of documents concurrently.
    ///
    /// Runs are independent: no ordering is guaranteed between them, and a
    /// failure in one neither aborts nor delays the others.
    pub async fn process_batch(&self, batch: Vec<(Document, String)>) {
        stream::iter(batch.into_iter().map(|(document, content)| async move {
            self.process(&document, &content).await;
        }))
        .buffer_unordered(self.config.concurrency)
        .collect::<Vec<()>>()
        .await;
    }
}
