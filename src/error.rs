//! Error types for the tradedoc-pipeline library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`PipelineError`] — **Fatal for one run**: the pipeline cannot take the
//!   document to `completed` (oracle exhausted its retries, malformed
//!   extraction payload, storage write failed). Caught at the orchestrator
//!   boundary, which records the message on the document and forces its
//!   status to `flagged` so no run ever dies silently.
//!
//! * [`RasterError`] — **Recoverable**: page rasterisation failed but the
//!   document can still be processed from its extracted text. The
//!   orchestrator logs it and falls back to text-only mode.
//!
//! * [`ModelCallError`] — **Transport-level**: a single oracle call failed in
//!   a way that retrying may fix (network, rate limit, timeout). The
//!   intelligence client retries these with exponential backoff; a payload
//!   that came back intact but does not parse is NOT a `ModelCallError` — it
//!   becomes [`PipelineError::MalformedResponse`] and is never retried.

use std::path::PathBuf;
use thiserror::Error;

/// A single oracle call failed at the transport level.
///
/// These are the only errors the retry loop in
/// [`crate::intel::IntelligenceClient`] will retry.
#[derive(Debug, Clone, Error)]
pub enum ModelCallError {
    /// Network / provider / 5xx failure reported by the model backend.
    #[error("oracle transport failure: {0}")]
    Transport(String),

    /// The caller-enforced per-call timeout elapsed.
    #[error("oracle call timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// A non-fatal rasterisation failure.
///
/// The orchestrator treats any of these as a signal to fall back to
/// text-only processing rather than aborting the run.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The file does not start with the `%PDF` magic bytes.
    #[error("file is not a valid PDF: '{path}' (first bytes: {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// pdfium could not open the document at all.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium returned an error for a specific page.
    #[error("rasterisation failed for page {page}: {detail}")]
    PageRender { page: usize, detail: String },

    /// PNG encoding of a rendered page failed.
    #[error("image encoding failed for page {page}: {detail}")]
    Encode { page: usize, detail: String },

    /// Could not read the stored file.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking render task panicked or was cancelled.
    #[error("render task failed: {0}")]
    TaskFailed(String),
}

/// A storage collaborator failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// An extraction record already exists for the document (1:1, immutable).
    #[error("extraction record already exists for document {document_id}")]
    ExtractionExists { document_id: String },

    /// Backend-specific failure (connection, constraint, serialization).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// All errors that abort one pipeline run.
///
/// Never escapes [`crate::process::Processor::process`]: the catch-all there
/// converts any of these into a `flagged` document with the message recorded
/// in its `processing_error` field.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The oracle failed on every attempt of the retry budget.
    #[error("oracle call failed after {attempts} attempts: {source}")]
    OracleExhausted {
        attempts: u32,
        #[source]
        source: ModelCallError,
    },

    /// The oracle returned content that does not parse into the expected
    /// structured shape. Carries the raw text for diagnostics; never retried.
    #[error("oracle returned a malformed payload: {detail}")]
    MalformedResponse { detail: String, raw: String },

    /// A storage collaborator call failed.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// The stored document file is missing or unreadable.
    #[error("document file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// A PDF was opened but yielded no extractable text.
    #[error("PDF contains no extractable text: '{path}'")]
    EmptyText { path: PathBuf },

    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The pipeline pool is shut down and no longer accepts work.
    #[error("pipeline pool is closed")]
    PoolClosed,

    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}
