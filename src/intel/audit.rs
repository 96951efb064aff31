//! Audit trail of oracle interactions.
//!
//! Every classify/extract call is recorded — request shape, truncated
//! previews, token usage, or the captured error. This is an observability
//! requirement, not a control-flow one: nothing in the pipeline reads the
//! log back. Hosts surface it on a debug endpoint or ship it to their own
//! sink.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One recorded oracle interaction.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    /// Operation name, e.g. `document_classification`.
    pub operation: String,
    /// Truncated preview of the prompt content.
    pub request_preview: String,
    /// Number of page images attached to the request.
    pub image_count: usize,
    /// Truncated preview of the response text, when the call succeeded.
    pub response_preview: Option<String>,
    pub input_tokens: Option<usize>,
    pub output_tokens: Option<usize>,
    /// Captured error message, when the call failed.
    pub error: Option<String>,
}

/// Bounded in-memory audit log.
///
/// Oldest entries are dropped once `capacity` is reached, so a long-running
/// process never grows without bound.
pub struct AuditLog {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, evicting the oldest if the log is full.
    pub fn record(&self, entry: AuditEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Snapshot of the current entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(op: &str) -> AuditEntry {
        AuditEntry {
            timestamp: Utc::now(),
            operation: op.into(),
            request_preview: "preview".into(),
            image_count: 0,
            response_preview: None,
            input_tokens: None,
            output_tokens: None,
            error: None,
        }
    }

    #[test]
    fn records_in_order() {
        let log = AuditLog::new(10);
        log.record(entry("a"));
        log.record(entry("b"));
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation, "a");
        assert_eq!(entries[1].operation, "b");
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let log = AuditLog::new(2);
        log.record(entry("a"));
        log.record(entry("b"));
        log.record(entry("c"));
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation, "b");
        assert_eq!(entries[1].operation, "c");
    }
}
