//! Domain model: documents, confidence-scored extraction payloads, review
//! flags, and manual corrections.
//!
//! Every scalar the oracle extracts is a [`ConfidenceField`] — a string value
//! paired with a High/Medium/Low tag. Fields the oracle could not locate are
//! represented with the literal `"Not Found"` value rather than being absent,
//! so downstream rendering never has to branch on presence.
//!
//! The four category payloads ([`ShippingBillRecord`], [`InvoiceRecord`],
//! [`LogisticsRecord`], [`RemittanceRecord`]) deserialize strictly from the
//! oracle's JSON: a missing or mistyped field is a parse failure, not a
//! silently-defaulted value.
//!
//! [`FieldNode`] is the typed view both confidence aggregation and triage
//! walk: a closed set of node kinds (leaf, record, sequence) handled by
//! pattern matching instead of runtime type inspection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Documents ────────────────────────────────────────────────────────────

/// Lifecycle status of an uploaded document.
///
/// `uploaded → processing → classified → {completed | flagged}`.
/// `flagged` is reachable directly after classification (unrecognised
/// category) and on any trapped pipeline failure; `completed` is the only
/// other terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Classified,
    Flagged,
    Completed,
}

/// Document category as decided by the classifier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentCategory {
    #[serde(rename = "Logistics Document")]
    LogisticsDocument,
    #[serde(rename = "Invoice")]
    Invoice,
    #[serde(rename = "Bank Statement")]
    BankStatement,
    #[serde(rename = "Shipping Bill")]
    ShippingBill,
    #[serde(rename = "Remittance Advice")]
    RemittanceAdvice,
    #[serde(rename = "Not Specified")]
    NotSpecified,
}

impl DocumentCategory {
    /// The wire label the oracle exchanges for this category.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentCategory::LogisticsDocument => "Logistics Document",
            DocumentCategory::Invoice => "Invoice",
            DocumentCategory::BankStatement => "Bank Statement",
            DocumentCategory::ShippingBill => "Shipping Bill",
            DocumentCategory::RemittanceAdvice => "Remittance Advice",
            DocumentCategory::NotSpecified => "Not Specified",
        }
    }

    /// Parse an oracle-returned label. Unknown labels yield `None`; callers
    /// treat that the same as `Not Specified`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Logistics Document" => Some(DocumentCategory::LogisticsDocument),
            "Invoice" => Some(DocumentCategory::Invoice),
            "Bank Statement" => Some(DocumentCategory::BankStatement),
            "Shipping Bill" => Some(DocumentCategory::ShippingBill),
            "Remittance Advice" | "FIRA/FIRC" => Some(DocumentCategory::RemittanceAdvice),
            "Not Specified" => Some(DocumentCategory::NotSpecified),
            _ => None,
        }
    }

    /// Whether an extractor exists for this category.
    ///
    /// `BankStatement` is a recognised classification with no extraction
    /// schema: such documents take the review-flag path instead.
    pub fn has_extractor(&self) -> bool {
        matches!(
            self,
            DocumentCategory::LogisticsDocument
                | DocumentCategory::Invoice
                | DocumentCategory::ShippingBill
                | DocumentCategory::RemittanceAdvice
        )
    }
}

/// One uploaded artifact. Created on upload; mutated only by the
/// orchestrator; never deleted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub customer_id: i64,
    /// Stored (uniquified) filename under the upload directory.
    pub filename: String,
    /// Filename as the customer uploaded it.
    pub original_name: String,
    pub file_url: Option<String>,
    pub classification: Option<DocumentCategory>,
    pub classification_confidence: Option<f64>,
    pub status: DocumentStatus,
    pub processing_error: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Whether the stored file is a PDF (by extension, matching how the
    /// upload path names files).
    pub fn is_pdf(&self) -> bool {
        self.filename.to_lowercase().ends_with(".pdf")
    }
}

/// Fields required to create a document row.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub customer_id: i64,
    pub filename: String,
    pub original_name: String,
    pub file_url: Option<String>,
}

/// Partial update applied to a document row. `None` fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub status: Option<DocumentStatus>,
    pub classification: Option<DocumentCategory>,
    pub classification_confidence: Option<f64>,
    pub processing_error: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl DocumentPatch {
    /// Patch that only moves the status.
    pub fn status(status: DocumentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

// ── Confidence fields ────────────────────────────────────────────────────

/// Sentinel value for a field the oracle looked for but did not find.
pub const NOT_FOUND: &str = "Not Found";

/// Oracle-assigned confidence tag on one extracted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// Numeric weight used for overall-confidence aggregation.
    pub fn weight(&self) -> f64 {
        match self {
            ConfidenceLevel::High => 0.95,
            ConfidenceLevel::Medium => 0.75,
            ConfidenceLevel::Low => 0.5,
        }
    }
}

/// A value paired with the oracle's confidence in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceField {
    pub value: String,
    pub confidence: ConfidenceLevel,
}

impl ConfidenceField {
    pub fn new(value: impl Into<String>, confidence: ConfidenceLevel) -> Self {
        Self {
            value: value.into(),
            confidence,
        }
    }

    /// The explicit not-found sentinel (always Low confidence).
    pub fn not_found() -> Self {
        Self::new(NOT_FOUND, ConfidenceLevel::Low)
    }
}

// ── Category payloads ────────────────────────────────────────────────────

/// One FOB valuation in a specific currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FobValue {
    pub currency: String,
    pub value: String,
    pub confidence: ConfidenceLevel,
}

/// One invoice listed inside a shipping bill. A shipping bill may carry
/// many; the extractor contract requires every one of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub invoice_number: ConfidenceField,
    pub invoice_date: ConfidenceField,
    pub invoice_value: ConfidenceField,
}

/// Export-declaration (shipping bill) extraction payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingBillRecord {
    pub sb_number: ConfidenceField,
    pub sb_date: ConfidenceField,
    pub cb_name: ConfidenceField,
    pub port_of_loading: ConfidenceField,
    pub hawb_number: ConfidenceField,
    pub iec_number: ConfidenceField,
    pub port_of_final_destination: ConfidenceField,
    pub account_number: ConfidenceField,
    pub invoice_term: ConfidenceField,
    pub fob_value: Vec<FobValue>,
    pub exporter_name_address: ConfidenceField,
    pub consignee_name_address: ConfidenceField,
    pub invoices: Vec<InvoiceLine>,
    pub ad_code: ConfidenceField,
    pub buyer_name_address: ConfidenceField,
    pub freight: ConfidenceField,
    pub insurance: ConfidenceField,
    pub discount: ConfidenceField,
    pub commission: ConfidenceField,
}

/// Commercial-invoice extraction payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_number: ConfidenceField,
    pub invoice_date: ConfidenceField,
}

/// Logistics / transport-document extraction payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticsRecord {
    pub primary_transport_id: ConfidenceField,
    pub shipping_bill_number: ConfidenceField,
    pub invoice_number: ConfidenceField,
    pub document_date: ConfidenceField,
    /// Ocean / Air / Postal / Multi-modal, as detected by the oracle.
    pub transport_type_detected: String,
}

/// One settlement leg inside a remittance advice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementLeg {
    pub reference_no: ConfidenceField,
    pub buyer_name: ConfidenceField,
    pub buyer_address: ConfidenceField,
    pub buyer_country: ConfidenceField,
    pub date: ConfidenceField,
    pub amount_inr: ConfidenceField,
    pub amount_foreign_currency: ConfidenceField,
    pub currency: ConfidenceField,
}

/// Remittance-advice extraction payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemittanceRecord {
    pub provider: ConfidenceField,
    pub utr_number: ConfidenceField,
    pub date: ConfidenceField,
    pub total_settlement_amount_inr: ConfidenceField,
    pub account_number: ConfidenceField,
    pub remitter: ConfidenceField,
    pub receiver: ConfidenceField,
    pub purpose_code: ConfidenceField,
    pub transaction_breakup: Vec<SettlementLeg>,
}

/// The category-shaped payload of one extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category", content = "data")]
pub enum ExtractionPayload {
    #[serde(rename = "Shipping Bill")]
    ShippingBill(ShippingBillRecord),
    #[serde(rename = "Invoice")]
    Invoice(InvoiceRecord),
    #[serde(rename = "Logistics Document")]
    Logistics(LogisticsRecord),
    #[serde(rename = "Remittance Advice")]
    RemittanceAdvice(RemittanceRecord),
}

impl ExtractionPayload {
    pub fn category(&self) -> DocumentCategory {
        match self {
            ExtractionPayload::ShippingBill(_) => DocumentCategory::ShippingBill,
            ExtractionPayload::Invoice(_) => DocumentCategory::Invoice,
            ExtractionPayload::Logistics(_) => DocumentCategory::LogisticsDocument,
            ExtractionPayload::RemittanceAdvice(_) => DocumentCategory::RemittanceAdvice,
        }
    }
}

/// Persisted extraction output for one document. 1:1 with its document,
/// keyed by document id with the customer id denormalized for single-join
/// listings. Created once; corrections go through [`ManualCorrection`],
/// never a rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub id: Uuid,
    pub document_id: Uuid,
    pub customer_id: i64,
    pub payload: ExtractionPayload,
    /// Mean leaf weight, in `[0.5, 0.95]`; 0.5 when no tagged leaves exist.
    pub overall_confidence: f64,
    pub extracted_at: DateTime<Utc>,
}

/// Fields required to create an extraction record.
#[derive(Debug, Clone)]
pub struct NewExtraction {
    pub document_id: Uuid,
    pub customer_id: i64,
    pub payload: ExtractionPayload,
    pub overall_confidence: f64,
}

// ── Review flags / corrections ───────────────────────────────────────────

/// Why a flag was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    /// The classifier could not (or had no extractor to) place the document.
    #[serde(rename = "Not Specified")]
    NotSpecified,
    /// One extracted field carries Low confidence.
    #[serde(rename = "Low Confidence")]
    LowConfidence,
}

impl IssueKind {
    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::NotSpecified => "Not Specified",
            IssueKind::LowConfidence => "Low Confidence",
        }
    }
}

/// A unit of required human attention. Created by triage or the
/// classifier-rejection path; resolved (never deleted) by an explicit
/// resolve action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewFlag {
    pub id: Uuid,
    pub document_id: Uuid,
    pub customer_id: i64,
    pub issue: IssueKind,
    /// Dotted / indexed path into the extraction payload, e.g.
    /// `invoices[2].invoice_number`, or `Document Type` for whole-document
    /// flags.
    pub field_name: Option<String>,
    pub current_value: Option<String>,
    pub corrected_value: Option<String>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Fields required to create a review flag.
#[derive(Debug, Clone)]
pub struct NewReviewFlag {
    pub document_id: Uuid,
    pub customer_id: i64,
    pub issue: IssueKind,
    pub field_name: Option<String>,
    pub current_value: Option<String>,
}

/// Append-only audit record of a human override. The pipeline never reads
/// these back to alter automated behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualCorrection {
    pub id: Uuid,
    pub document_id: Uuid,
    pub customer_id: i64,
    pub field_name: String,
    pub original_value: Option<String>,
    pub corrected_value: String,
    pub corrected_by: String,
    pub corrected_at: DateTime<Utc>,
}

/// Fields required to create a manual correction.
#[derive(Debug, Clone)]
pub struct NewManualCorrection {
    pub document_id: Uuid,
    pub customer_id: i64,
    pub field_name: String,
    pub original_value: Option<String>,
    pub corrected_value: String,
    pub corrected_by: String,
}

// ── Page images ──────────────────────────────────────────────────────────

/// One rasterised page, self-describing: encoding plus base64 payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageImage {
    /// MIME type of the encoded image, e.g. `image/png`.
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

// ── Field tree ───────────────────────────────────────────────────────────

/// Typed view of an extraction payload for traversal.
///
/// A leaf is any object carrying a value/confidence pairing (including
/// [`FobValue`], whose extra `currency` tag does not stop it being a leaf);
/// everything else is a record of named children or an ordered sequence.
#[derive(Debug)]
pub enum FieldNode<'a> {
    Leaf {
        value: &'a str,
        confidence: ConfidenceLevel,
    },
    Record(Vec<(&'static str, FieldNode<'a>)>),
    Seq(Vec<FieldNode<'a>>),
}

impl ConfidenceField {
    fn node(&self) -> FieldNode<'_> {
        FieldNode::Leaf {
            value: &self.value,
            confidence: self.confidence,
        }
    }
}

impl FobValue {
    fn node(&self) -> FieldNode<'_> {
        FieldNode::Leaf {
            value: &self.value,
            confidence: self.confidence,
        }
    }
}

impl InvoiceLine {
    fn node(&self) -> FieldNode<'_> {
        FieldNode::Record(vec![
            ("invoice_number", self.invoice_number.node()),
            ("invoice_date", self.invoice_date.node()),
            ("invoice_value", self.invoice_value.node()),
        ])
    }
}

impl SettlementLeg {
    fn node(&self) -> FieldNode<'_> {
        FieldNode::Record(vec![
            ("reference_no", self.reference_no.node()),
            ("buyer_name", self.buyer_name.node()),
            ("buyer_address", self.buyer_address.node()),
            ("buyer_country", self.buyer_country.node()),
            ("date", self.date.node()),
            ("amount_inr", self.amount_inr.node()),
            ("amount_foreign_currency", self.amount_foreign_currency.node()),
            ("currency", self.currency.node()),
        ])
    }
}

impl ShippingBillRecord {
    fn node(&self) -> FieldNode<'_> {
        FieldNode::Record(vec![
            ("sb_number", self.sb_number.node()),
            ("sb_date", self.sb_date.node()),
            ("cb_name", self.cb_name.node()),
            ("port_of_loading", self.port_of_loading.node()),
            ("hawb_number", self.hawb_number.node()),
            ("iec_number", self.iec_number.node()),
            (
                "port_of_final_destination",
                self.port_of_final_destination.node(),
            ),
            ("account_number", self.account_number.node()),
            ("invoice_term", self.invoice_term.node()),
            (
                "fob_value",
                FieldNode::Seq(self.fob_value.iter().map(FobValue::node).collect()),
            ),
            ("exporter_name_address", self.exporter_name_address.node()),
            ("consignee_name_address", self.consignee_name_address.node()),
            (
                "invoices",
                FieldNode::Seq(self.invoices.iter().map(InvoiceLine::node).collect()),
            ),
            ("ad_code", self.ad_code.node()),
            ("buyer_name_address", self.buyer_name_address.node()),
            ("freight", self.freight.node()),
            ("insurance", self.insurance.node()),
            ("discount", self.discount.node()),
            ("commission", self.commission.node()),
        ])
    }
}

impl InvoiceRecord {
    fn node(&self) -> FieldNode<'_> {
        FieldNode::Record(vec![
            ("invoice_number", self.invoice_number.node()),
            ("invoice_date", self.invoice_date.node()),
        ])
    }
}

impl LogisticsRecord {
    fn node(&self) -> FieldNode<'_> {
        // transport_type_detected is a plain string, not a confidence field:
        // it is deliberately absent from the tree.
        FieldNode::Record(vec![
            ("primary_transport_id", self.primary_transport_id.node()),
            ("shipping_bill_number", self.shipping_bill_number.node()),
            ("invoice_number", self.invoice_number.node()),
            ("document_date", self.document_date.node()),
        ])
    }
}

impl RemittanceRecord {
    fn node(&self) -> FieldNode<'_> {
        FieldNode::Record(vec![
            ("provider", self.provider.node()),
            ("utr_number", self.utr_number.node()),
            ("date", self.date.node()),
            (
                "total_settlement_amount_inr",
                self.total_settlement_amount_inr.node(),
            ),
            ("account_number", self.account_number.node()),
            ("remitter", self.remitter.node()),
            ("receiver", self.receiver.node()),
            ("purpose_code", self.purpose_code.node()),
            (
                "transaction_breakup",
                FieldNode::Seq(self.transaction_breakup.iter().map(SettlementLeg::node).collect()),
            ),
        ])
    }
}

impl ExtractionPayload {
    /// Typed traversal view over the whole payload.
    pub fn field_tree(&self) -> FieldNode<'_> {
        match self {
            ExtractionPayload::ShippingBill(r) => r.node(),
            ExtractionPayload::Invoice(r) => r.node(),
            ExtractionPayload::Logistics(r) => r.node(),
            ExtractionPayload::RemittanceAdvice(r) => r.node(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_label_round_trip() {
        for cat in [
            DocumentCategory::LogisticsDocument,
            DocumentCategory::Invoice,
            DocumentCategory::BankStatement,
            DocumentCategory::ShippingBill,
            DocumentCategory::RemittanceAdvice,
            DocumentCategory::NotSpecified,
        ] {
            assert_eq!(DocumentCategory::from_label(cat.label()), Some(cat));
        }
    }

    #[test]
    fn unknown_label_is_none() {
        assert_eq!(DocumentCategory::from_label("Packing List"), None);
        assert_eq!(DocumentCategory::from_label(""), None);
    }

    #[test]
    fn legacy_remittance_label_accepted() {
        assert_eq!(
            DocumentCategory::from_label("FIRA/FIRC"),
            Some(DocumentCategory::RemittanceAdvice)
        );
    }

    #[test]
    fn bank_statement_has_no_extractor() {
        assert!(!DocumentCategory::BankStatement.has_extractor());
        assert!(!DocumentCategory::NotSpecified.has_extractor());
        assert!(DocumentCategory::ShippingBill.has_extractor());
    }

    #[test]
    fn confidence_field_deserializes_from_oracle_shape() {
        let field: ConfidenceField =
            serde_json::from_str(r#"{"value": "2093726", "confidence": "High"}"#).unwrap();
        assert_eq!(field.value, "2093726");
        assert_eq!(field.confidence, ConfidenceLevel::High);
    }

    #[test]
    fn confidence_field_rejects_unknown_tag() {
        let result: Result<ConfidenceField, _> =
            serde_json::from_str(r#"{"value": "x", "confidence": "Certain"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn confidence_field_rejects_missing_value() {
        let result: Result<ConfidenceField, _> =
            serde_json::from_str(r#"{"confidence": "High"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn not_found_sentinel_is_low() {
        let f = ConfidenceField::not_found();
        assert_eq!(f.value, NOT_FOUND);
        assert_eq!(f.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn weights_match_policy() {
        assert_eq!(ConfidenceLevel::High.weight(), 0.95);
        assert_eq!(ConfidenceLevel::Medium.weight(), 0.75);
        assert_eq!(ConfidenceLevel::Low.weight(), 0.5);
    }

    #[test]
    fn logistics_tree_skips_transport_type() {
        let record = LogisticsRecord {
            primary_transport_id: ConfidenceField::new("AWB123", ConfidenceLevel::High),
            shipping_bill_number: ConfidenceField::not_found(),
            invoice_number: ConfidenceField::new("INV-1", ConfidenceLevel::Medium),
            document_date: ConfidenceField::new("01.02.2025", ConfidenceLevel::High),
            transport_type_detected: "Air".into(),
        };
        match record.node() {
            FieldNode::Record(fields) => assert_eq!(fields.len(), 4),
            _ => panic!("logistics record must be a record node"),
        }
    }
}
