//! The retrying oracle client.
//!
//! Wraps any [`ChatModel`] with:
//!
//! * **Retry with exponential backoff** — up to the configured attempt
//!   count, delay doubling each time (`backoff * 2^n`). Only transport
//!   failures are retried; a payload that arrived intact but does not parse
//!   is surfaced immediately as `MalformedResponse` (retrying cannot help).
//! * **A caller-enforced per-call timeout** — one stuck call must not pin a
//!   worker for the life of the process.
//! * **An audit trail** — every attempt's outcome is recorded with request
//!   and response previews and token usage.
//!
//! The client also owns the two confidence policies: the fixed
//! classification constants, and mean-of-leaf-weights aggregation for
//! extraction payloads.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::ProcessorConfig;
use crate::error::PipelineError;
use crate::intel::audit::{AuditEntry, AuditLog};
use crate::intel::provider::{ChatModel, ModelReply, ModelRequest};
use crate::model::{DocumentCategory, FieldNode, PageImage};
use crate::prompts;

/// Confidence assigned to any successful, non-"Not Specified" label.
///
/// A fixed constant rather than a signal derived from the oracle — kept for
/// compatibility with the existing review thresholds. See DESIGN.md.
pub const CLASSIFICATION_CONFIDENT: f64 = 0.85;

/// Confidence assigned when the oracle returns "Not Specified" or an
/// unrecognised label.
pub const CLASSIFICATION_UNCERTAIN: f64 = 0.5;

/// Outcome of a classification call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub category: DocumentCategory,
    pub confidence: f64,
}

/// Retrying, auditing wrapper around a [`ChatModel`].
///
/// Stateless apart from the audit log, so one instance is shared across all
/// concurrent pipeline runs.
pub struct IntelligenceClient {
    model: Arc<dyn ChatModel>,
    audit: Arc<AuditLog>,
    max_attempts: u32,
    backoff_base_secs: u64,
    call_timeout: Duration,
}

impl IntelligenceClient {
    pub fn new(model: Arc<dyn ChatModel>, config: &ProcessorConfig) -> Self {
        Self {
            model,
            audit: Arc::new(AuditLog::default()),
            max_attempts: config.max_attempts,
            backoff_base_secs: config.retry_backoff_secs,
            call_timeout: Duration::from_secs(config.oracle_timeout_secs),
        }
    }

    /// The audit trail of every oracle interaction this client has made.
    pub fn audit_log(&self) -> Arc<AuditLog> {
        Arc::clone(&self.audit)
    }

    /// Ask the oracle for the document's category.
    ///
    /// The returned label is parsed against the known category set; anything
    /// unrecognised degrades to `NotSpecified`. Confidence is the fixed
    /// policy constant, not an oracle signal.
    pub async fn classify(
        &self,
        content: &str,
        images: &[PageImage],
    ) -> Result<Classification, PipelineError> {
        let request = ModelRequest {
            system: None,
            prompt: prompts::classification_prompt(content, !images.is_empty()),
            images: images.to_vec(),
            max_tokens: prompts::CLASSIFY_MAX_TOKENS,
        };
        let reply = self.complete("document_classification", &request).await?;

        let category = DocumentCategory::from_label(reply.text.trim())
            .unwrap_or(DocumentCategory::NotSpecified);
        let confidence = if category == DocumentCategory::NotSpecified {
            CLASSIFICATION_UNCERTAIN
        } else {
            CLASSIFICATION_CONFIDENT
        };
        debug!(category = category.label(), confidence, "classification result");

        Ok(Classification {
            category,
            confidence,
        })
    }

    /// Run one oracle call to completion under the retry budget.
    ///
    /// Returns the raw reply; schema parsing is the extractor stage's job so
    /// that a parse failure is visibly distinct from a transport failure and
    /// never consumes retry attempts.
    pub async fn complete(
        &self,
        operation: &str,
        request: &ModelRequest,
    ) -> Result<ModelReply, PipelineError> {
        let mut last_err = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let backoff = self.backoff_base_secs * 2u64.pow(attempt - 1);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    max = self.max_attempts,
                    backoff_secs = backoff,
                    "retrying oracle call"
                );
                sleep(Duration::from_secs(backoff)).await;
            }

            let outcome = match timeout(self.call_timeout, self.model.generate(request)).await {
                Ok(result) => result,
                Err(_) => Err(crate::error::ModelCallError::Timeout {
                    secs: self.call_timeout.as_secs(),
                }),
            };

            match outcome {
                Ok(reply) => {
                    self.audit.record(AuditEntry {
                        timestamp: Utc::now(),
                        operation: operation.to_string(),
                        request_preview: prompts::excerpt(&request.prompt, 200),
                        image_count: request.images.len(),
                        response_preview: Some(prompts::excerpt(&reply.text, 200)),
                        input_tokens: Some(reply.input_tokens),
                        output_tokens: Some(reply.output_tokens),
                        error: None,
                    });
                    debug!(
                        operation,
                        input_tokens = reply.input_tokens,
                        output_tokens = reply.output_tokens,
                        "oracle call succeeded"
                    );
                    return Ok(reply);
                }
                Err(err) => {
                    self.audit.record(AuditEntry {
                        timestamp: Utc::now(),
                        operation: operation.to_string(),
                        request_preview: prompts::excerpt(&request.prompt, 200),
                        image_count: request.images.len(),
                        response_preview: None,
                        input_tokens: None,
                        output_tokens: None,
                        error: Some(err.to_string()),
                    });
                    warn!(operation, attempt = attempt + 1, error = %err, "oracle call failed");
                    last_err = Some(err);
                }
            }
        }

        Err(PipelineError::OracleExhausted {
            attempts: self.max_attempts,
            source: last_err.unwrap_or_else(|| {
                crate::error::ModelCallError::Transport("no attempt was made".into())
            }),
        })
    }
}

/// Mean leaf weight of an extraction payload.
///
/// Every leaf contributes its confidence weight (High→0.95, Medium→0.75,
/// Low→0.5); sequence elements contribute each of their leaves
/// individually. A payload with no tagged leaves scores 0.5, so the result
/// always lies in `[0.5, 0.95]`.
pub fn aggregate_confidence(tree: &FieldNode<'_>) -> f64 {
    let mut weights = Vec::new();
    collect_weights(tree, &mut weights);
    if weights.is_empty() {
        0.5
    } else {
        weights.iter().sum::<f64>() / weights.len() as f64
    }
}

fn collect_weights(node: &FieldNode<'_>, weights: &mut Vec<f64>) {
    match node {
        FieldNode::Leaf { confidence, .. } => weights.push(confidence.weight()),
        FieldNode::Record(fields) => {
            for (_, child) in fields {
                collect_weights(child, weights);
            }
        }
        FieldNode::Seq(items) => {
            for child in items {
                collect_weights(child, weights);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ConfidenceField, ConfidenceLevel, ExtractionPayload, InvoiceLine, InvoiceRecord,
        ShippingBillRecord,
    };

    fn field(level: ConfidenceLevel) -> ConfidenceField {
        ConfidenceField::new("x", level)
    }

    fn invoice(level: ConfidenceLevel) -> ExtractionPayload {
        ExtractionPayload::Invoice(InvoiceRecord {
            invoice_number: field(level),
            invoice_date: field(level),
        })
    }

    #[test]
    fn all_high_scores_095() {
        let payload = invoice(ConfidenceLevel::High);
        let score = aggregate_confidence(&payload.field_tree());
        assert!((score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn mixed_levels_take_mean() {
        let payload = ExtractionPayload::Invoice(InvoiceRecord {
            invoice_number: field(ConfidenceLevel::High),
            invoice_date: field(ConfidenceLevel::Low),
        });
        let score = aggregate_confidence(&payload.field_tree());
        assert!((score - 0.725).abs() < 1e-9);
    }

    #[test]
    fn sequence_elements_count_individually() {
        let line = |level| InvoiceLine {
            invoice_number: field(level),
            invoice_date: field(level),
            invoice_value: field(level),
        };
        let record = ShippingBillRecord {
            sb_number: field(ConfidenceLevel::High),
            sb_date: field(ConfidenceLevel::High),
            cb_name: field(ConfidenceLevel::High),
            port_of_loading: field(ConfidenceLevel::High),
            hawb_number: field(ConfidenceLevel::High),
            iec_number: field(ConfidenceLevel::High),
            port_of_final_destination: field(ConfidenceLevel::High),
            account_number: field(ConfidenceLevel::High),
            invoice_term: field(ConfidenceLevel::High),
            fob_value: vec![],
            exporter_name_address: field(ConfidenceLevel::High),
            consignee_name_address: field(ConfidenceLevel::High),
            invoices: vec![line(ConfidenceLevel::Low), line(ConfidenceLevel::Low)],
            ad_code: field(ConfidenceLevel::High),
            buyer_name_address: field(ConfidenceLevel::High),
            freight: field(ConfidenceLevel::High),
            insurance: field(ConfidenceLevel::High),
            discount: field(ConfidenceLevel::High),
            commission: field(ConfidenceLevel::High),
        };
        let payload = ExtractionPayload::ShippingBill(record);
        // 17 scalar leaves at 0.95 plus 6 invoice-line leaves at 0.5
        let expected = (17.0 * 0.95 + 6.0 * 0.5) / 23.0;
        let score = aggregate_confidence(&payload.field_tree());
        assert!((score - expected).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn bounds_hold_for_extremes() {
        let high = aggregate_confidence(&invoice(ConfidenceLevel::High).field_tree());
        let low = aggregate_confidence(&invoice(ConfidenceLevel::Low).field_tree());
        assert!(high <= 0.95 && high >= 0.5);
        assert!(low <= 0.95 && low >= 0.5);
    }

    #[test]
    fn empty_tree_scores_half() {
        let tree = FieldNode::Record(vec![]);
        assert_eq!(aggregate_confidence(&tree), 0.5);
    }
}
