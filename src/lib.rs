//! # tradedoc-pipeline
//!
//! Turn scanned trade-finance documents (PDF) into structured,
//! confidence-scored records, routing low-certainty or unrecognised
//! content to a human review queue.
//!
//! ## Why this crate?
//!
//! OCR text from scanned customs forms, shipping bills, and remittance
//! advices is unreliable — multi-column layouts, stamps, and small-print
//! codes come out garbled. Instead this crate rasterises each page into a
//! PNG and lets a vision-capable LLM read it as a human would, extracting
//! category-specific fields with per-field confidence tags. Anything the
//! oracle is unsure about becomes a review flag instead of silently wrong
//! data.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Source    read stored file, best-effort text extraction
//!  ├─ 2. Raster    pages → PNG via pdfium (best-effort, text fallback)
//!  ├─ 3. Classify  remittance-first ordered category decision
//!  ├─ 4. Extract   category schema, strict parse, "Not Found" sentinel
//!  ├─ 5. Triage    flag every Low-confidence leaf with an indexed path
//!  └─ 6. Persist   document status + extraction record + review flags
//! ```
//!
//! Each uploaded file runs this pipeline independently; the orchestrator
//! traps every failure and records it on the document, so a run always
//! ends in `completed` or `flagged` — never stuck in `processing`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tradedoc_pipeline::{
//!     EdgequakeModel, IntelligenceClient, MemoryStore, NewDocument, Processor,
//!     ProcessorConfig, DocumentStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let model = Arc::new(EdgequakeModel::from_env()?);
//!     let config = ProcessorConfig::default();
//!     let store = Arc::new(MemoryStore::new());
//!     let intel = Arc::new(IntelligenceClient::new(model, &config));
//!     let processor = Processor::new(store.clone(), intel, config);
//!
//!     let document = store
//!         .create_document(NewDocument {
//!             customer_id: 1,
//!             filename: "3f2a-shipping-bill.pdf".into(),
//!             original_name: "shipping-bill.pdf".into(),
//!             file_url: None,
//!         })
//!         .await?;
//!
//!     let content = tradedoc_pipeline::source::read_content(
//!         std::path::Path::new("uploads/3f2a-shipping-bill.pdf"),
//!     )
//!     .await?;
//!     processor.process(&document, &content).await;
//!
//!     let done = store.get_document(document.id).await?.unwrap();
//!     println!("{:?}: {:?}", done.status, done.classification);
//!     Ok(())
//! }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod intel;
pub mod model;
pub mod pipeline;
pub mod pool;
pub mod process;
pub mod prompts;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ProcessorConfig, ProcessorConfigBuilder};
pub use error::{ModelCallError, PipelineError, RasterError, StoreError};
pub use intel::{
    AuditEntry, AuditLog, ChatModel, Classification, EdgequakeModel, IntelligenceClient,
    ModelReply, ModelRequest,
};
pub use model::{
    ConfidenceField, ConfidenceLevel, Document, DocumentCategory, DocumentPatch, DocumentStatus,
    ExtractionPayload, ExtractionRecord, FieldNode, FobValue, InvoiceLine, InvoiceRecord,
    IssueKind, LogisticsRecord, ManualCorrection, NewDocument, NewExtraction,
    NewManualCorrection, NewReviewFlag, PageImage, RemittanceRecord, ReviewFlag, SettlementLeg,
    ShippingBillRecord, NOT_FOUND,
};
pub use pipeline::extract::Extraction;
pub use pipeline::source;
pub use pipeline::triage::{lookup, triage, FlagCandidate};
pub use pool::{PipelineJob, PipelinePool};
pub use process::Processor;
pub use store::{DocumentStore, MemoryStore};
