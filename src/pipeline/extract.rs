//! Extractor stage: category-specific structured extraction.
//!
//! Each category is handed a fixed machine-readable target schema (the
//! payload types in [`crate::model`]) and the oracle's reply is
//! deserialized strictly against it — data that does not match is rejected
//! and propagated as `MalformedResponse`, never coerced. The prompts demand
//! the `"Not Found"` sentinel for missing fields and complete arrays for
//! repeated sub-records; the typed parse then guarantees the stable shape
//! downstream rendering relies on.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::PipelineError;
use crate::intel::{aggregate_confidence, IntelligenceClient, ModelRequest};
use crate::model::{
    DocumentCategory, ExtractionPayload, InvoiceRecord, LogisticsRecord, PageImage,
    RemittanceRecord, ShippingBillRecord,
};
use crate::prompts;

/// A parsed extraction payload with its aggregated confidence.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub payload: ExtractionPayload,
    pub overall_confidence: f64,
}

/// Run the category's extractor over the document content.
///
/// `content` must be the full extracted text; when page images are present
/// the oracle prompt carries a bounded text reference and the images are
/// the primary evidence.
///
/// # Errors
/// `Internal` for categories without an extractor (the orchestrator routes
/// those to the flag path before ever calling here); `MalformedResponse`
/// when the oracle's reply does not match the category schema;
/// `OracleExhausted` when transport keeps failing.
pub async fn extract(
    intel: &IntelligenceClient,
    category: DocumentCategory,
    content: &str,
    images: &[PageImage],
) -> Result<Extraction, PipelineError> {
    let prompt_content = if images.is_empty() {
        content.to_string()
    } else {
        prompts::vision_extraction_frame(content)
    };

    let (operation, prompt, max_tokens) = match category {
        DocumentCategory::ShippingBill => (
            "shipping_bill_extraction",
            prompts::shipping_bill_prompt(&prompt_content),
            prompts::SHIPPING_BILL_MAX_TOKENS,
        ),
        DocumentCategory::Invoice => (
            "invoice_extraction",
            prompts::invoice_prompt(&prompt_content),
            prompts::INVOICE_MAX_TOKENS,
        ),
        DocumentCategory::LogisticsDocument => (
            "logistics_extraction",
            prompts::logistics_prompt(&prompt_content),
            prompts::LOGISTICS_MAX_TOKENS,
        ),
        DocumentCategory::RemittanceAdvice => (
            "remittance_extraction",
            prompts::remittance_prompt(&prompt_content),
            prompts::REMITTANCE_MAX_TOKENS,
        ),
        DocumentCategory::BankStatement | DocumentCategory::NotSpecified => {
            return Err(PipelineError::Internal(format!(
                "no extractor for category '{}'",
                category.label()
            )))
        }
    };

    let request = ModelRequest {
        system: Some(prompts::EXTRACTION_SYSTEM_PROMPT.to_string()),
        prompt,
        images: images.to_vec(),
        max_tokens,
    };
    let reply = intel.complete(operation, &request).await?;

    let payload = parse_payload(category, &reply.text)?;
    let overall_confidence = aggregate_confidence(&payload.field_tree());
    debug!(
        category = category.label(),
        overall_confidence, "extraction parsed"
    );

    Ok(Extraction {
        payload,
        overall_confidence,
    })
}

/// Strictly deserialize the oracle's reply against the category schema.
fn parse_payload(
    category: DocumentCategory,
    text: &str,
) -> Result<ExtractionPayload, PipelineError> {
    let cleaned = strip_code_fences(text.trim());
    match category {
        DocumentCategory::ShippingBill => {
            parse_as::<ShippingBillRecord>(cleaned, text).map(ExtractionPayload::ShippingBill)
        }
        DocumentCategory::Invoice => {
            parse_as::<InvoiceRecord>(cleaned, text).map(ExtractionPayload::Invoice)
        }
        DocumentCategory::LogisticsDocument => {
            parse_as::<LogisticsRecord>(cleaned, text).map(ExtractionPayload::Logistics)
        }
        DocumentCategory::RemittanceAdvice => {
            parse_as::<RemittanceRecord>(cleaned, text).map(ExtractionPayload::RemittanceAdvice)
        }
        DocumentCategory::BankStatement | DocumentCategory::NotSpecified => {
            Err(PipelineError::Internal(format!(
                "no extraction schema for category '{}'",
                category.label()
            )))
        }
    }
}

fn parse_as<T: DeserializeOwned>(cleaned: &str, raw: &str) -> Result<T, PipelineError> {
    serde_json::from_str(cleaned).map_err(|e| PipelineError::MalformedResponse {
        detail: e.to_string(),
        raw: raw.to_string(),
    })
}

/// Remove a wrapping markdown code fence, if the model added one.
fn strip_code_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // skip the info string ("json") on the opening fence line
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
