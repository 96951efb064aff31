//! Storage collaborator: the persistence seam the pipeline writes through.
//!
//! The pipeline never talks to a database directly — it holds an
//! `Arc<dyn DocumentStore>` and assumes each call is atomic per document,
//! returning the persisted row with server-assigned identifiers and
//! timestamps. [`MemoryStore`] is a complete in-process implementation used
//! by the test suite and embeddable by hosts that do not need durability.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    Document, DocumentPatch, DocumentStatus, ExtractionRecord, ManualCorrection, NewDocument,
    NewExtraction, NewManualCorrection, NewReviewFlag, ReviewFlag,
};

/// Persistence operations consumed by the pipeline.
///
/// Writes to one document are sequential within a run, so implementations
/// need only per-call atomicity — no cross-call locking.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document row with status `uploaded`.
    async fn create_document(&self, new: NewDocument) -> Result<Document, StoreError>;

    /// Fetch one document.
    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Apply a partial update and return the updated row.
    async fn update_document(&self, id: Uuid, patch: DocumentPatch)
        -> Result<Document, StoreError>;

    /// Persist an extraction record. One per document; a second create for
    /// the same document is a conflict (records are immutable once written).
    async fn create_extraction(&self, new: NewExtraction)
        -> Result<ExtractionRecord, StoreError>;

    /// Fetch the extraction record for a document, if one exists.
    async fn extraction_for_document(
        &self,
        document_id: Uuid,
    ) -> Result<Option<ExtractionRecord>, StoreError>;

    /// Persist a review flag.
    async fn create_flag(&self, new: NewReviewFlag) -> Result<ReviewFlag, StoreError>;

    /// Flags raised against one document, in creation order.
    async fn flags_for_document(&self, document_id: Uuid)
        -> Result<Vec<ReviewFlag>, StoreError>;

    /// Mark a flag resolved and stamp its resolution time.
    async fn resolve_flag(&self, id: Uuid) -> Result<ReviewFlag, StoreError>;

    /// Append a manual-correction audit row.
    async fn create_correction(
        &self,
        new: NewManualCorrection,
    ) -> Result<ManualCorrection, StoreError>;
}

// ── In-memory implementation ─────────────────────────────────────────────

#[derive(Default)]
struct MemoryInner {
    documents: HashMap<Uuid, Document>,
    extractions: HashMap<Uuid, ExtractionRecord>, // keyed by document id
    flags: Vec<ReviewFlag>,
    corrections: Vec<ManualCorrection>,
}

/// In-process [`DocumentStore`] backed by hash maps behind a mutex.
///
/// Each trait method takes the lock once, so every call is atomic with
/// respect to every other — the same guarantee a transactional backend
/// provides per statement.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A poisoned mutex means a panic mid-write; propagating the inner
        // state is still safe because every write is a single insert.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_document(&self, new: NewDocument) -> Result<Document, StoreError> {
        let document = Document {
            id: Uuid::new_v4(),
            customer_id: new.customer_id,
            filename: new.filename,
            original_name: new.original_name,
            file_url: new.file_url,
            classification: None,
            classification_confidence: None,
            status: DocumentStatus::Uploaded,
            processing_error: None,
            uploaded_at: Utc::now(),
            processed_at: None,
        };
        self.lock().documents.insert(document.id, document.clone());
        Ok(document)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
        Ok(self.lock().documents.get(&id).cloned())
    }

    async fn update_document(
        &self,
        id: Uuid,
        patch: DocumentPatch,
    ) -> Result<Document, StoreError> {
        let mut inner = self.lock();
        let document = inner
            .documents
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "document",
                id: id.to_string(),
            })?;
        if let Some(status) = patch.status {
            document.status = status;
        }
        if let Some(classification) = patch.classification {
            document.classification = Some(classification);
        }
        if let Some(confidence) = patch.classification_confidence {
            document.classification_confidence = Some(confidence);
        }
        if let Some(error) = patch.processing_error {
            document.processing_error = Some(error);
        }
        if let Some(at) = patch.processed_at {
            document.processed_at = Some(at);
        }
        Ok(document.clone())
    }

    async fn create_extraction(
        &self,
        new: NewExtraction,
    ) -> Result<ExtractionRecord, StoreError> {
        let mut inner = self.lock();
        if inner.extractions.contains_key(&new.document_id) {
            return Err(StoreError::ExtractionExists {
                document_id: new.document_id.to_string(),
            });
        }
        let record = ExtractionRecord {
            id: Uuid::new_v4(),
            document_id: new.document_id,
            customer_id: new.customer_id,
            payload: new.payload,
            overall_confidence: new.overall_confidence,
            extracted_at: Utc::now(),
        };
        inner.extractions.insert(record.document_id, record.clone());
        Ok(record)
    }

    async fn extraction_for_document(
        &self,
        document_id: Uuid,
    ) -> Result<Option<ExtractionRecord>, StoreError> {
        Ok(self.lock().extractions.get(&document_id).cloned())
    }

    async fn create_flag(&self, new: NewReviewFlag) -> Result<ReviewFlag, StoreError> {
        let flag = ReviewFlag {
            id: Uuid::new_v4(),
            document_id: new.document_id,
            customer_id: new.customer_id,
            issue: new.issue,
            field_name: new.field_name,
            current_value: new.current_value,
            corrected_value: None,
            resolved: false,
            created_at: Utc::now(),
            resolved_at: None,
        };
        self.lock().flags.push(flag.clone());
        Ok(flag)
    }

    async fn flags_for_document(
        &self,
        document_id: Uuid,
    ) -> Result<Vec<ReviewFlag>, StoreError> {
        Ok(self
            .lock()
            .flags
            .iter()
            .filter(|f| f.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn resolve_flag(&self, id: Uuid) -> Result<ReviewFlag, StoreError> {
        let mut inner = self.lock();
        let flag = inner
            .flags
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "review flag",
                id: id.to_string(),
            })?;
        flag.resolved = true;
        flag.resolved_at = Some(Utc::now());
        Ok(flag.clone())
    }

    async fn create_correction(
        &self,
        new: NewManualCorrection,
    ) -> Result<ManualCorrection, StoreError> {
        let correction = ManualCorrection {
            id: Uuid::new_v4(),
            document_id: new.document_id,
            customer_id: new.customer_id,
            field_name: new.field_name,
            original_value: new.original_value,
            corrected_value: new.corrected_value,
            corrected_by: new.corrected_by,
            corrected_at: Utc::now(),
        };
        self.lock().corrections.push(correction.clone());
        Ok(correction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfidenceField, ConfidenceLevel, ExtractionPayload, InvoiceRecord, IssueKind};

    fn new_document() -> NewDocument {
        NewDocument {
            customer_id: 7,
            filename: "abc-invoice.pdf".into(),
            original_name: "invoice.pdf".into(),
            file_url: None,
        }
    }

    fn invoice_payload() -> ExtractionPayload {
        ExtractionPayload::Invoice(InvoiceRecord {
            invoice_number: ConfidenceField::new("4042", ConfidenceLevel::High),
            invoice_date: ConfidenceField::new("07/11/2024", ConfidenceLevel::Medium),
        })
    }

    #[tokio::test]
    async fn create_starts_uploaded() {
        let store = MemoryStore::new();
        let doc = store.create_document(new_document()).await.unwrap();
        assert_eq!(doc.status, DocumentStatus::Uploaded);
        assert!(doc.classification.is_none());
    }

    #[tokio::test]
    async fn patch_updates_only_given_fields() {
        let store = MemoryStore::new();
        let doc = store.create_document(new_document()).await.unwrap();

        let updated = store
            .update_document(doc.id, DocumentPatch::status(DocumentStatus::Processing))
            .await
            .unwrap();
        assert_eq!(updated.status, DocumentStatus::Processing);
        assert_eq!(updated.original_name, "invoice.pdf");

        let updated = store
            .update_document(
                doc.id,
                DocumentPatch {
                    processing_error: Some("oracle down".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        // status untouched by the second patch
        assert_eq!(updated.status, DocumentStatus::Processing);
        assert_eq!(updated.processing_error.as_deref(), Some("oracle down"));
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let result = store
            .update_document(Uuid::new_v4(), DocumentPatch::default())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn second_extraction_for_document_conflicts() {
        let store = MemoryStore::new();
        let doc = store.create_document(new_document()).await.unwrap();
        let new = NewExtraction {
            document_id: doc.id,
            customer_id: doc.customer_id,
            payload: invoice_payload(),
            overall_confidence: 0.85,
        };
        store.create_extraction(new.clone()).await.unwrap();
        let result = store.create_extraction(new).await;
        assert!(matches!(result, Err(StoreError::ExtractionExists { .. })));
    }

    #[tokio::test]
    async fn resolve_flag_stamps_time() {
        let store = MemoryStore::new();
        let doc = store.create_document(new_document()).await.unwrap();
        let flag = store
            .create_flag(NewReviewFlag {
                document_id: doc.id,
                customer_id: doc.customer_id,
                issue: IssueKind::LowConfidence,
                field_name: Some("invoice_date".into()),
                current_value: Some("Not Found".into()),
            })
            .await
            .unwrap();
        assert!(!flag.resolved);
        assert!(flag.resolved_at.is_none());

        let resolved = store.resolve_flag(flag.id).await.unwrap();
        assert!(resolved.resolved);
        assert!(resolved.resolved_at.is_some());
    }

    #[tokio::test]
    async fn corrections_are_append_only() {
        let store = MemoryStore::new();
        let doc = store.create_document(new_document()).await.unwrap();
        let correction = store
            .create_correction(NewManualCorrection {
                document_id: doc.id,
                customer_id: doc.customer_id,
                field_name: "invoice_number".into(),
                original_value: Some("Not Found".into()),
                corrected_value: "4042".into(),
                corrected_by: "reviewer@example.com".into(),
            })
            .await
            .unwrap();
        assert_eq!(correction.corrected_value, "4042");
    }
}
