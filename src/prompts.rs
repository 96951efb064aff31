//! Prompt construction for oracle calls.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tuning a classification rule or an
//!    extraction target requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect prompts directly without a
//!    live oracle, so prompt regressions are cheap to catch.
//!
//! The JSON shapes embedded in the extraction prompts mirror the payload
//! types in [`crate::model`]; the client deserializes the oracle's reply
//! strictly against those types.

/// Output-token budget for a classification call (a single label).
pub const CLASSIFY_MAX_TOKENS: usize = 100;
/// Output-token budget for shipping-bill extraction (largest schema).
pub const SHIPPING_BILL_MAX_TOKENS: usize = 4000;
/// Output-token budget for invoice extraction.
pub const INVOICE_MAX_TOKENS: usize = 1000;
/// Output-token budget for logistics extraction.
pub const LOGISTICS_MAX_TOKENS: usize = 1500;
/// Output-token budget for remittance-advice extraction.
pub const REMITTANCE_MAX_TOKENS: usize = 3000;

/// System prompt shared by every extraction call.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a data extraction API that only returns valid JSON. Never include explanations, comments, or conversational text. Only return the requested JSON structure.";

/// Truncate `text` to at most `max_chars` characters, appending an ellipsis
/// when anything was cut. Operates on character boundaries, never bytes.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

/// Content frame sent to the classifier when page images carry the evidence:
/// a short text preview so the oracle sees both modalities.
pub fn vision_classification_frame(content: &str) -> String {
    format!(
        "Scanned PDF processed as page images.\nText preview: {}",
        excerpt(content, 200)
    )
}

/// Content frame sent to an extractor when page images carry the evidence.
pub fn vision_extraction_frame(content: &str) -> String {
    format!(
        "Scanned PDF processed as page images.\nExtracted text reference: {}",
        excerpt(content, 500)
    )
}

/// Build the classification prompt.
///
/// The rule ordering in the prompt matches the classifier stage's own
/// decision policy: remittance indicators first, then transport, export
/// declaration, and invoice signals.
pub fn classification_prompt(content: &str, vision: bool) -> String {
    let vision_note = if vision {
        "\n\nNOTE: Page images are attached. Prioritize visual analysis over the text preview — extracted text from scanned documents is unreliable."
    } else {
        ""
    };
    format!(
        r#"You are a document classification specialist for trade compliance. Analyze the provided document and classify it into one of these EXACT categories:

CLASSIFICATION OPTIONS:
- Logistics Document
- Invoice
- Bank Statement
- Shipping Bill
- Remittance Advice
- Not Specified

CLASSIFICATION RULES (apply in order):
1. FIRST check for remittance advice. If the document contains ANY of:
   "FOREIGN INWARD REMITTANCE", "FIRA", "FIRC", "PAYEE ADVICE",
   "REMITTANCE ADVICE", "UTR", "UNIQUE TRANSACTION REFERENCE",
   "NOSTRO ACCOUNT", "VOSTRO ACCOUNT", "REMITTER" together with
   "BENEFICIARY", or "SETTLEMENT AMOUNT" with foreign currency references,
   classify it as "Remittance Advice". A document with both invoice
   elements AND remittance elements is "Remittance Advice", never "Invoice".
2. THEN check for a logistics document: "AWB", "WAYBILL", "BILL OF LADING",
   "B/L", "SEA WAYBILL", "CN23", courier companies, shipping lines,
   vessel names, port references.
3. THEN check for a shipping bill: "SB NO", "SHIPPING BILL", "CSB",
   export declaration references, customs forms, IEC numbers.
4. THEN check for an invoice: "INVOICE", itemized charges, billing
   information WITHOUT remittance or transport elements.
5. A bank statement shows a bank letterhead with account transactions and
   balances.
6. If uncertain or the document is unclear, return "Not Specified".

OUTPUT FORMAT:
Return ONLY the exact category name from the list above. No explanations.

DOCUMENT TO CLASSIFY:
{content}{vision_note}"#
    )
}

/// Shared tail of every extraction prompt: exactness, the explicit
/// not-found sentinel, and the completeness mandate for repeated records.
const EXTRACTION_RULES: &str = r#"CRITICAL INSTRUCTIONS:
- Extract EXACT values as they appear in the document
- Maintain original formatting for codes, dates, and addresses
- If a field is not found, return the literal value "Not Found"
- Do not infer or guess values
- COMPLETE DATA MANDATE: extract ALL individual records without truncation
- NEVER summarize, abbreviate, or use "..." for repetitive data
- RETURN EVERY SINGLE RECORD: all invoices, all transactions, all entries"#;

/// Build the shipping-bill extraction prompt.
pub fn shipping_bill_prompt(content: &str) -> String {
    format!(
        r#"You are an expert trade compliance document processor specializing in shipping bill analysis. Extract the following fields with individual confidence scores from ANY type of shipping bill document:

EXTRACTION TARGETS:
SB Number ("SB NO", "CSB Number", "SHIPPING BILL"), SB Date, CB Name
(customs broker), Port of Loading, HAWB Number, IEC Number, Port of Final
Destination, Account Number ("FOREX BANK A/C NO"), Invoice Term (FOB, CIF,
EXW), FOB Value (currency-value pairs, one entry per currency), Exporter
Name & Address, Consignee Name & Address, Invoice Information (array — one
entry per invoice), AD Code, Buyer Name & Address, Freight, Insurance,
Discount, Commission.

{rules}

OUTPUT FORMAT (JSON):
{{
    "sb_number": {{"value": "extracted_value_or_Not_Found", "confidence": "High/Medium/Low"}},
    "sb_date": {{"value": "...", "confidence": "..."}},
    "cb_name": {{"value": "...", "confidence": "..."}},
    "port_of_loading": {{"value": "...", "confidence": "..."}},
    "hawb_number": {{"value": "...", "confidence": "..."}},
    "iec_number": {{"value": "...", "confidence": "..."}},
    "port_of_final_destination": {{"value": "...", "confidence": "..."}},
    "account_number": {{"value": "...", "confidence": "..."}},
    "invoice_term": {{"value": "...", "confidence": "..."}},
    "fob_value": [
        {{"currency": "...", "value": "...", "confidence": "..."}}
    ],
    "exporter_name_address": {{"value": "...", "confidence": "..."}},
    "consignee_name_address": {{"value": "...", "confidence": "..."}},
    "invoices": [
        {{
            "invoice_number": {{"value": "...", "confidence": "..."}},
            "invoice_date": {{"value": "...", "confidence": "..."}},
            "invoice_value": {{"value": "...", "confidence": "..."}}
        }}
    ],
    "ad_code": {{"value": "...", "confidence": "..."}},
    "buyer_name_address": {{"value": "...", "confidence": "..."}},
    "freight": {{"value": "...", "confidence": "..."}},
    "insurance": {{"value": "...", "confidence": "..."}},
    "discount": {{"value": "...", "confidence": "..."}},
    "commission": {{"value": "...", "confidence": "..."}}
}}

DOCUMENT TO PROCESS: {content}"#,
        rules = EXTRACTION_RULES
    )
}

/// Build the commercial-invoice extraction prompt.
pub fn invoice_prompt(content: &str) -> String {
    format!(
        r#"You are an expert trade compliance document processor specializing in invoice analysis. Extract the following fields with individual confidence scores from ANY type of invoice document:

EXTRACTION TARGETS:
Invoice Number ("INVOICE NO", "Invoice #", "INV NO" — the primary invoice
number, not order or reference numbers) and Invoice Date ("DATE",
"Invoice Date", "Dated" — the primary invoice date, not due dates).

{rules}

OUTPUT FORMAT (JSON):
{{
    "invoice_number": {{"value": "extracted_value_or_Not_Found", "confidence": "High/Medium/Low"}},
    "invoice_date": {{"value": "extracted_value_or_Not_Found", "confidence": "High/Medium/Low"}}
}}

DOCUMENT TO PROCESS: {content}"#,
        rules = EXTRACTION_RULES
    )
}

/// Build the logistics-document extraction prompt.
pub fn logistics_prompt(content: &str) -> String {
    format!(
        r#"You are an expert trade compliance document processor specializing in logistics document analysis. Extract the following fields with individual confidence scores from ANY type of logistics document:

EXTRACTION TARGETS:
Primary Transport ID (B/L number for ocean, AWB for air, CN23/CN22 for
postal — detect the transport mode and use the matching identifier),
Shipping Bill Number ("SB NO", often with "DTD" references), Invoice
Number, Document Date (prefer operational dates such as "SHIPPED ON BOARD
DATE" over issue dates).

{rules}

OUTPUT FORMAT (JSON):
{{
    "primary_transport_id": {{"value": "extracted_value_or_Not_Found", "confidence": "High/Medium/Low"}},
    "shipping_bill_number": {{"value": "...", "confidence": "..."}},
    "invoice_number": {{"value": "...", "confidence": "..."}},
    "document_date": {{"value": "...", "confidence": "..."}},
    "transport_type_detected": "Ocean/Air/Postal/Multi-modal"
}}

DOCUMENT TO PROCESS: {content}"#,
        rules = EXTRACTION_RULES
    )
}

/// Build the remittance-advice extraction prompt.
pub fn remittance_prompt(content: &str) -> String {
    format!(
        r#"You are an expert trade compliance document processor specializing in inward remittance analysis. Extract the following fields with individual confidence scores from the remittance advice document:

EXTRACTION TARGETS:
Provider, UTR Number, Date, Total Settlement Amount (INR), Account Number,
Remitter, Receiver, Purpose Code, Transaction Breakup (array — one entry
per settlement leg).

{rules}

OUTPUT FORMAT (JSON):
{{
    "provider": {{"value": "extracted_value_or_Not_Found", "confidence": "High/Medium/Low"}},
    "utr_number": {{"value": "...", "confidence": "..."}},
    "date": {{"value": "...", "confidence": "..."}},
    "total_settlement_amount_inr": {{"value": "...", "confidence": "..."}},
    "account_number": {{"value": "...", "confidence": "..."}},
    "remitter": {{"value": "...", "confidence": "..."}},
    "receiver": {{"value": "...", "confidence": "..."}},
    "purpose_code": {{"value": "...", "confidence": "..."}},
    "transaction_breakup": [
        {{
            "reference_no": {{"value": "...", "confidence": "..."}},
            "buyer_name": {{"value": "...", "confidence": "..."}},
            "buyer_address": {{"value": "...", "confidence": "..."}},
            "buyer_country": {{"value": "...", "confidence": "..."}},
            "date": {{"value": "...", "confidence": "..."}},
            "amount_inr": {{"value": "...", "confidence": "..."}},
            "amount_foreign_currency": {{"value": "...", "confidence": "..."}},
            "currency": {{"value": "...", "confidence": "..."}}
        }}
    ]
}}

DOCUMENT TO PROCESS: {content}"#,
        rules = EXTRACTION_RULES
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_short_text_unchanged() {
        assert_eq!(excerpt("hello", 10), "hello");
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        let text = "déjà vu all over again";
        let cut = excerpt(text, 4);
        assert_eq!(cut, "déjà...");
    }

    #[test]
    fn classification_prompt_orders_remittance_first() {
        let prompt = classification_prompt("some content", false);
        let remittance_pos = prompt.find("Remittance Advice").unwrap();
        let invoice_rule_pos = prompt.find("THEN check for an invoice").unwrap();
        assert!(remittance_pos < invoice_rule_pos);
    }

    #[test]
    fn vision_note_only_with_images() {
        assert!(classification_prompt("x", true).contains("Page images are attached"));
        assert!(!classification_prompt("x", false).contains("Page images are attached"));
    }

    #[test]
    fn extraction_prompts_carry_completeness_mandate() {
        for prompt in [
            shipping_bill_prompt("doc"),
            invoice_prompt("doc"),
            logistics_prompt("doc"),
            remittance_prompt("doc"),
        ] {
            assert!(prompt.contains("COMPLETE DATA MANDATE"));
            assert!(prompt.contains("Not Found"));
        }
    }
}
