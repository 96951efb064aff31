//! Document-intelligence oracle: abstraction, concrete backend, retrying
//! client, and audit trail.
//!
//! The pipeline depends only on the [`ChatModel`] capability — a single
//! vision-capable completion call. [`EdgequakeModel`] adapts the
//! `edgequake-llm` provider family to it; tests inject scripted fakes.
//! [`IntelligenceClient`] layers retry/backoff, the per-call timeout, and
//! the audit trail on top, and owns the confidence policies.

pub mod audit;
pub mod client;
pub mod provider;

pub use audit::{AuditEntry, AuditLog};
pub use client::{
    aggregate_confidence, Classification, IntelligenceClient, CLASSIFICATION_CONFIDENT,
    CLASSIFICATION_UNCERTAIN,
};
pub use provider::{ChatModel, EdgequakeModel, ModelReply, ModelRequest};
