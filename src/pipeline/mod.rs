//! Pipeline stages for document processing.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap
//! implementations (e.g. a different rasterisation backend) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ raster ──▶ classify ──▶ extract ──▶ triage
//! (bytes+text) (page PNGs) (category)  (payload)   (flags)
//! ```
//!
//! 1. [`source`]   — read the stored file; best-effort text extraction for
//!    PDFs (failure here is tolerable if rasterisation succeeds)
//! 2. [`raster`]   — rasterise pages to encoded images; runs in
//!    `spawn_blocking` because pdfium is not async-safe; failure falls back
//!    to text-only processing
//! 3. [`classify`] — decide the document category; remittance indicators
//!    outrank every other signal
//! 4. [`extract`]  — category-specific structured extraction, strictly
//!    validated against the payload schema
//! 5. [`triage`]   — walk the payload and flag every Low-confidence leaf

pub mod classify;
pub mod extract;
pub mod raster;
pub mod source;
pub mod triage;
