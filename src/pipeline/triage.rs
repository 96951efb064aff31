//! Confidence triage: flag every Low-confidence leaf for human review.
//!
//! The payload is walked depth-first through its [`FieldNode`] view. Paths
//! are index-qualified (`invoices[2].invoice_number`) so a reviewer can
//! locate the exact instance inside repeated sub-records, and [`lookup`]
//! resolves such a path back to its leaf — the same traversal in reverse,
//! which is what makes flag paths stable identifiers rather than display
//! strings.

use crate::model::{ConfidenceLevel, ExtractionPayload, FieldNode};

/// One Low-confidence leaf: its path and current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagCandidate {
    pub field_path: String,
    pub value: String,
}

/// Collect one candidate per leaf whose confidence is Low, in traversal
/// order.
pub fn triage(payload: &ExtractionPayload) -> Vec<FlagCandidate> {
    let mut candidates = Vec::new();
    walk(&payload.field_tree(), String::new(), &mut candidates);
    candidates
}

fn walk(node: &FieldNode<'_>, path: String, out: &mut Vec<FlagCandidate>) {
    match node {
        FieldNode::Leaf { value, confidence } => {
            if *confidence == ConfidenceLevel::Low {
                out.push(FlagCandidate {
                    field_path: path,
                    value: (*value).to_string(),
                });
            }
        }
        FieldNode::Record(fields) => {
            for (name, child) in fields {
                let child_path = if path.is_empty() {
                    (*name).to_string()
                } else {
                    format!("{path}.{name}")
                };
                walk(child, child_path, out);
            }
        }
        FieldNode::Seq(items) => {
            for (index, child) in items.iter().enumerate() {
                walk(child, format!("{path}[{index}]"), out);
            }
        }
    }
}

/// Resolve a triage path back to its leaf.
///
/// Returns the leaf's value and confidence, or `None` when the path does
/// not name a leaf in this payload (e.g. the payload shape changed).
pub fn lookup<'a>(
    payload: &'a ExtractionPayload,
    path: &str,
) -> Option<(&'a str, ConfidenceLevel)> {
    resolve(payload.field_tree(), path)
}

fn resolve<'a>(node: FieldNode<'a>, path: &str) -> Option<(&'a str, ConfidenceLevel)> {
    match node {
        FieldNode::Leaf { value, confidence } => {
            if path.is_empty() {
                Some((value, confidence))
            } else {
                None
            }
        }
        FieldNode::Record(fields) => {
            let (head, rest) = split_head(path)?;
            fields
                .into_iter()
                .find(|(name, _)| *name == head)
                .and_then(|(_, child)| resolve(child, rest))
        }
        FieldNode::Seq(items) => {
            // the sequence consumes the leading "[i]" of the path
            let rest = path.strip_prefix('[')?;
            let (index_str, rest) = rest.split_once(']')?;
            let index: usize = index_str.parse().ok()?;
            let rest = rest.strip_prefix('.').unwrap_or(rest);
            items.into_iter().nth(index).and_then(|child| resolve(child, rest))
        }
    }
}

/// Split `invoices[2].invoice_number` into `("invoices", "[2].invoice_number")`,
/// or `sb_number` into `("sb_number", "")`.
fn split_head(path: &str) -> Option<(&str, &str)> {
    if path.is_empty() {
        return None;
    }
    let end = path
        .find(|c| c == '.' || c == '[')
        .unwrap_or(path.len());
    let head = &path[..end];
    let rest = &path[end..];
    let rest = rest.strip_prefix('.').unwrap_or(rest);
    Some((head, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ConfidenceField, FobValue, InvoiceLine, RemittanceRecord, SettlementLeg,
        ShippingBillRecord,
    };

    fn high(value: &str) -> ConfidenceField {
        ConfidenceField::new(value, ConfidenceLevel::High)
    }

    fn low(value: &str) -> ConfidenceField {
        ConfidenceField::new(value, ConfidenceLevel::Low)
    }

    fn shipping_bill() -> ShippingBillRecord {
        let line = |number: ConfidenceField, date: ConfidenceField| InvoiceLine {
            invoice_number: number,
            invoice_date: date,
            invoice_value: high("1000.00"),
        };
        ShippingBillRecord {
            sb_number: high("2093726"),
            sb_date: high("03-Apr-25"),
            cb_name: high("ACME Logistics"),
            port_of_loading: high("DEL"),
            hawb_number: high("88412055"),
            iec_number: high("0513088731"),
            port_of_final_destination: high("JFK"),
            account_number: high("50200012345678"),
            invoice_term: high("FOB"),
            fob_value: vec![FobValue {
                currency: "USD".into(),
                value: "12,540.00".into(),
                confidence: ConfidenceLevel::Medium,
            }],
            exporter_name_address: low("Not Found"),
            consignee_name_address: high("Orbit Imports LLC, New York"),
            invoices: vec![
                line(high("4042"), high("28-Mar-24")),
                line(high("4043"), low("Not Found")),
                line(low("Not Found"), high("30-Mar-24")),
            ],
            ad_code: high("0510001"),
            buyer_name_address: high("SAME AS CONSIGNEE"),
            freight: high("450.00"),
            insurance: high("35.00"),
            discount: high("Not Found"),
            commission: high("Not Found"),
        }
    }

    #[test]
    fn one_flag_per_low_leaf() {
        let payload = ExtractionPayload::ShippingBill(shipping_bill());
        let candidates = triage(&payload);
        let paths: Vec<&str> = candidates.iter().map(|c| c.field_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "exporter_name_address",
                "invoices[1].invoice_date",
                "invoices[2].invoice_number",
            ]
        );
    }

    #[test]
    fn candidate_carries_current_value() {
        let payload = ExtractionPayload::ShippingBill(shipping_bill());
        let candidates = triage(&payload);
        assert!(candidates.iter().all(|c| c.value == "Not Found"));
    }

    #[test]
    fn no_low_leaves_means_no_candidates() {
        let mut record = shipping_bill();
        record.exporter_name_address = high("Exports Ltd, Delhi");
        record.invoices = vec![InvoiceLine {
            invoice_number: high("4042"),
            invoice_date: high("28-Mar-24"),
            invoice_value: high("1000.00"),
        }];
        let payload = ExtractionPayload::ShippingBill(record);
        assert!(triage(&payload).is_empty());
    }

    #[test]
    fn paths_round_trip_to_the_same_leaf() {
        let payload = ExtractionPayload::ShippingBill(shipping_bill());
        for candidate in triage(&payload) {
            let (value, confidence) = lookup(&payload, &candidate.field_path)
                .unwrap_or_else(|| panic!("path {} must resolve", candidate.field_path));
            assert_eq!(value, candidate.value);
            assert_eq!(confidence, ConfidenceLevel::Low);
        }
    }

    #[test]
    fn lookup_rejects_dangling_paths() {
        let payload = ExtractionPayload::ShippingBill(shipping_bill());
        assert!(lookup(&payload, "invoices[9].invoice_number").is_none());
        assert!(lookup(&payload, "sb_number.value").is_none());
        assert!(lookup(&payload, "no_such_field").is_none());
    }

    #[test]
    fn fob_value_entries_are_leaves() {
        let mut record = shipping_bill();
        record.fob_value = vec![
            FobValue {
                currency: "USD".into(),
                value: "100.00".into(),
                confidence: ConfidenceLevel::High,
            },
            FobValue {
                currency: "INR".into(),
                value: "Not Found".into(),
                confidence: ConfidenceLevel::Low,
            },
        ];
        record.exporter_name_address = high("Exports Ltd");
        record.invoices.clear();
        let payload = ExtractionPayload::ShippingBill(record);
        let candidates = triage(&payload);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].field_path, "fob_value[1]");
    }

    #[test]
    fn settlement_legs_are_index_qualified() {
        let leg = |amount: ConfidenceField| SettlementLeg {
            reference_no: high("REF-1"),
            buyer_name: high("Orbit Imports"),
            buyer_address: high("NY"),
            buyer_country: high("US"),
            date: high("01.02.2025"),
            amount_inr: amount,
            amount_foreign_currency: high("1,500.00"),
            currency: high("USD"),
        };
        let record = RemittanceRecord {
            provider: high("HSBC"),
            utr_number: high("HSBCN52024010412345"),
            date: high("04.01.2024"),
            total_settlement_amount_inr: high("1,24,500.00"),
            account_number: high("50200012345678"),
            remitter: high("Orbit Imports LLC"),
            receiver: high("Exports Ltd"),
            purpose_code: high("P0802"),
            transaction_breakup: vec![leg(high("1,24,500.00")), leg(low("Not Found"))],
        };
        let payload = ExtractionPayload::RemittanceAdvice(record);
        let candidates = triage(&payload);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].field_path, "transaction_breakup[1].amount_inr");
    }
}
