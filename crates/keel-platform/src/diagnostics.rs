//! Per-operation diagnostics sink
//!
//! Every lifecycle operation owns one `Diagnostics` value and lends it by
//! `&mut` to the executor and the polling protocols. Entries are only ever
//! appended.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One diagnostic: a short summary plus a detailed explanation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.summary, self.detail)
    }
}

/// Append-only list of diagnostics for one operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Severity::Error, summary, detail);
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Severity::Warning, summary, detail);
    }

    fn push(&mut self, severity: Severity, summary: impl Into<String>, detail: impl Into<String>) {
        self.entries.push(Diagnostic {
            severity,
            summary: summary.into(),
            detail: detail.into(),
        });
    }

    /// Move every entry of `other` to the end of this list
    pub fn append(&mut self, other: &mut Diagnostics) {
        self.entries.append(&mut other.entries);
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&Diagnostic> {
        self.entries.last()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_order_and_counts() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());
        assert!(!diags.has_errors());

        diags.add_warning("slow", "the platform took a while");
        diags.add_error("GET failed", "GET /a returned status code 500");

        assert_eq!(diags.len(), 2);
        assert_eq!(diags.error_count(), 1);
        assert!(diags.has_errors());
        assert_eq!(diags.last().map(|d| d.summary.as_str()), Some("GET failed"));
    }

    #[test]
    fn test_merge_moves_entries() {
        let mut outer = Diagnostics::new();
        let mut inner = Diagnostics::new();
        inner.add_error("build failed", "syntax error");

        outer.append(&mut inner);

        assert_eq!(outer.len(), 1);
        assert!(inner.is_empty());
    }

    #[test]
    fn test_display_and_serialize() {
        let mut diags = Diagnostics::new();
        diags.add_error("POST failed", "POST /x failed with error: refused");

        let line = diags.iter().next().map(ToString::to_string);
        assert_eq!(
            line.as_deref(),
            Some("error: POST failed: POST /x failed with error: refused")
        );

        let json = serde_json::to_value(&diags).unwrap();
        assert_eq!(json[0]["severity"], "error");
        assert_eq!(json[0]["summary"], "POST failed");
    }
}
