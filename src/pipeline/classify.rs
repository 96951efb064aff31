//! Classifier stage: decide the document's category.
//!
//! The oracle proposes a label, but the ordering of the decision policy is
//! enforced here in code, not just in prompt text: remittance-advice
//! indicators take absolute priority over every other category. Remittance
//! documents routinely contain invoice-like line items, and one misfiled as
//! an invoice silently skips settlement reconciliation — so an oracle
//! answer of "Invoice" on a document carrying remittance semantics is
//! overridden. Only after remittance is ruled out are transport, export
//! declaration, and invoice signals distinguished; anything unmatched
//! resolves to `NotSpecified`.

use once_cell::sync::Lazy;
use regex::RegexSet;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::intel::{Classification, IntelligenceClient, CLASSIFICATION_CONFIDENT, CLASSIFICATION_UNCERTAIN};
use crate::model::{DocumentCategory, PageImage};
use crate::prompts;

static REMITTANCE_SIGNALS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)FOREIGN\s+INWARD\s+REMITTANCE",
        r"(?i)\bFIRA\b",
        r"(?i)\bFIRC\b",
        r"(?i)PAYEE\s+ADVICE",
        r"(?i)REMITTANCE\s+ADVICE",
        r"(?i)INWARD\s+REMITTANCE",
        r"(?i)\bUTR\b",
        r"(?i)UNIQUE\s+TRANSACTION\s+REFERENCE",
        r"(?i)\bNOSTRO\s+ACCOUNT\b",
        r"(?i)\bVOSTRO\s+ACCOUNT\b",
        r"(?i)SETTLEMENT\s+AMOUNT",
    ])
    .expect("remittance signal patterns are valid")
});

// REMITTER and BENEFICIARY individually appear on many bank forms; only the
// pair marks remittance processing.
static REMITTER_SIGNAL: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([r"(?i)\bREMITTER\b", r"(?i)\bBENEFICIARY\b"])
        .expect("remitter signal patterns are valid")
});

static TRANSPORT_SIGNALS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)\bAWB\b",
        r"(?i)\bWAYBILL\b",
        r"(?i)BILL\s+OF\s+LADING",
        r"(?i)\bB/L\b",
        r"(?i)SEA\s+WAYBILL",
        r"(?i)\bCN2[23]\b",
        r"(?i)\bDHL\b",
        r"(?i)\bFEDEX\b",
        r"(?i)\bVESSEL\b",
    ])
    .expect("transport signal patterns are valid")
});

static EXPORT_SIGNALS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)\bSB\s*NO\b",
        r"(?i)SHIPPING\s+BILL",
        r"(?i)\bCSB\b",
        r"(?i)\bIEC\b",
        r"(?i)EXPORT\s+DECLARATION",
    ])
    .expect("export signal patterns are valid")
});

static INVOICE_SIGNALS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([r"(?i)\bINVOICE\b", r"(?i)\bINV\s*NO\b", r"(?i)\bPROFORMA\b"])
        .expect("invoice signal patterns are valid")
});

/// Which indicator families the document content matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalHits {
    pub remittance: bool,
    pub transport: bool,
    pub export: bool,
    pub invoice: bool,
}

/// Scan the full document text for category indicators.
pub fn scan_signals(content: &str) -> SignalHits {
    let remitter_pair = {
        let matches = REMITTER_SIGNAL.matches(content);
        matches.matched(0) && matches.matched(1)
    };
    SignalHits {
        remittance: REMITTANCE_SIGNALS.is_match(content) || remitter_pair,
        transport: TRANSPORT_SIGNALS.is_match(content),
        export: EXPORT_SIGNALS.is_match(content),
        invoice: INVOICE_SIGNALS.is_match(content),
    }
}

/// Apply the ordered decision policy to the oracle's answer and the local
/// indicator scan.
///
/// The order is a correctness invariant, not an implementation detail:
/// 1. remittance indicators veto everything else;
/// 2. otherwise a recognised oracle label stands;
/// 3. otherwise local transport → export → invoice signals, in that order;
/// 4. otherwise `NotSpecified`.
pub fn resolve_category(oracle: DocumentCategory, hits: SignalHits) -> DocumentCategory {
    if hits.remittance {
        return DocumentCategory::RemittanceAdvice;
    }
    if oracle != DocumentCategory::NotSpecified {
        return oracle;
    }
    if hits.transport {
        DocumentCategory::LogisticsDocument
    } else if hits.export {
        DocumentCategory::ShippingBill
    } else if hits.invoice {
        DocumentCategory::Invoice
    } else {
        DocumentCategory::NotSpecified
    }
}

/// Classify a document from its content and optional page images.
///
/// `content` must be the full extracted text — the indicator scan runs over
/// all of it. When images are present the oracle prompt carries only a
/// short text preview (vision-first); text-only documents send everything.
pub async fn classify(
    intel: &IntelligenceClient,
    content: &str,
    images: &[PageImage],
) -> Result<Classification, PipelineError> {
    let prompt_content = if images.is_empty() {
        content.to_string()
    } else {
        prompts::vision_classification_frame(content)
    };

    let oracle = intel.classify(&prompt_content, images).await?;
    let hits = scan_signals(content);
    let category = resolve_category(oracle.category, hits);

    if category != oracle.category {
        info!(
            oracle = oracle.category.label(),
            resolved = category.label(),
            "indicator scan overrode oracle label"
        );
    }
    debug!(?hits, category = category.label(), "classification resolved");

    let confidence = if category == DocumentCategory::NotSpecified {
        CLASSIFICATION_UNCERTAIN
    } else {
        CLASSIFICATION_CONFIDENT
    };

    Ok(Classification {
        category,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remittance_beats_invoice_signals() {
        let content = "REMITTANCE ADVICE\nUTR: CITIN2024\nINVOICE NO - 4042 itemized charges";
        let hits = scan_signals(content);
        assert!(hits.remittance);
        assert!(hits.invoice);
        assert_eq!(
            resolve_category(DocumentCategory::Invoice, hits),
            DocumentCategory::RemittanceAdvice
        );
    }

    #[test]
    fn remitter_beneficiary_pair_counts_as_remittance() {
        let both = scan_signals("Remitter: ACME GmbH\nBeneficiary: Exports Ltd");
        assert!(both.remittance);
        let only_one = scan_signals("Beneficiary: Exports Ltd");
        assert!(!only_one.remittance);
    }

    #[test]
    fn oracle_label_stands_without_remittance() {
        let hits = scan_signals("BILL OF LADING vessel MSC AURORA");
        assert_eq!(
            resolve_category(DocumentCategory::ShippingBill, hits),
            DocumentCategory::ShippingBill
        );
    }

    #[test]
    fn local_signals_fill_in_for_uncertain_oracle() {
        let transport = scan_signals("SEA WAYBILL No. 884120 vessel ever given");
        assert_eq!(
            resolve_category(DocumentCategory::NotSpecified, transport),
            DocumentCategory::LogisticsDocument
        );

        let export = scan_signals("SB NO: 2093726 DTD 03.04.2025");
        assert_eq!(
            resolve_category(DocumentCategory::NotSpecified, export),
            DocumentCategory::ShippingBill
        );

        let invoice = scan_signals("TAX INVOICE total due 1,200.00");
        assert_eq!(
            resolve_category(DocumentCategory::NotSpecified, invoice),
            DocumentCategory::Invoice
        );
    }

    #[test]
    fn transport_outranks_export_and_invoice_in_fallback() {
        let hits = scan_signals("AWB 176-2241 8993 covering SHIPPING BILL and INVOICE NO 12");
        assert!(hits.transport && hits.export && hits.invoice);
        assert_eq!(
            resolve_category(DocumentCategory::NotSpecified, hits),
            DocumentCategory::LogisticsDocument
        );
    }

    #[test]
    fn no_signals_resolves_not_specified() {
        let hits = scan_signals("Minutes of the quarterly town hall meeting.");
        assert_eq!(hits, SignalHits::default());
        assert_eq!(
            resolve_category(DocumentCategory::NotSpecified, hits),
            DocumentCategory::NotSpecified
        );
    }

    #[test]
    fn utr_matches_whole_word_only() {
        assert!(!scan_signals("neutral futures brochure").remittance);
        assert!(scan_signals("UTR NUMBER HSBCN52024").remittance);
    }
}
