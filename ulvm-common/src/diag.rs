//! Diagnostics shared between the compiler boundary and the execution driver
//!
//! Compile errors come from the external compiler; runtime faults from the
//! interpreter. Both are carried as [`Diagnostic`]s so the editor can render
//! them against the source.

use crate::source_loc::SourceSpan;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with location and severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: SourceSpan,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: String, span: SourceSpan) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
        }
    }

    pub fn warning(message: String, span: SourceSpan) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} at {}", self.severity, self.message, self.span)?;

        if !self.notes.is_empty() {
            for note in &self.notes {
                write!(f, "\n  note: {}", note)?;
            }
        }

        Ok(())
    }
}

/// Collects the diagnostics of one run for later inspection
///
/// The driver accumulates runtime faults here; the UI reads them out after
/// execution stops.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Note => {}
        }
        self.diagnostics.push(diagnostic);
    }

    /// Report an error diagnostic
    pub fn error(&mut self, message: String, span: SourceSpan) {
        self.push(Diagnostic::error(message, span));
    }

    /// Report a warning diagnostic
    pub fn warning(&mut self, message: String, span: SourceSpan) {
        self.push(Diagnostic::warning(message, span));
    }

    /// Check if any errors have been reported
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Get all diagnostics
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Clear all diagnostics
    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.error_count = 0;
        self.warning_count = 0;
    }

    /// Create a summary string
    pub fn summary(&self) -> String {
        match (self.error_count, self.warning_count) {
            (0, 0) => "no errors or warnings".to_string(),
            (0, w) => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
            (e, 0) => format!("{} error{}", e, if e == 1 { "" } else { "s" }),
            (e, w) => format!(
                "{} error{} and {} warning{}",
                e,
                if e == 1 { "" } else { "s" },
                w,
                if w == 1 { "" } else { "s" }
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_loc::SourceLocation;

    fn span() -> SourceSpan {
        SourceSpan::new(
            SourceLocation::new("main.ul", 1, 1),
            SourceLocation::new("main.ul", 1, 5),
        )
    }

    #[test]
    fn test_diagnostic_creation() {
        let diag = Diagnostic::error("unexpected token".to_string(), span());
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "unexpected token");
        assert_eq!(diag.span, span());
    }

    #[test]
    fn test_diagnostic_with_notes() {
        let diag = Diagnostic::error("unknown label".to_string(), span())
            .with_note("labels are case sensitive".to_string());

        assert_eq!(diag.notes.len(), 1);
        assert!(format!("{}", diag).contains("note: labels are case sensitive"));
    }

    #[test]
    fn test_sink_counts() {
        let mut sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        assert!(sink.is_empty());

        sink.error("bad memory access".to_string(), span());
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);

        sink.warning("suspicious offset".to_string(), span());
        assert_eq!(sink.warning_count(), 1);
        assert_eq!(sink.diagnostics().len(), 2);

        sink.clear();
        assert!(sink.is_empty());
        assert!(!sink.has_errors());
    }

    #[test]
    fn test_summary() {
        let mut sink = DiagnosticSink::new();
        assert_eq!(sink.summary(), "no errors or warnings");

        sink.error("e1".to_string(), span());
        assert_eq!(sink.summary(), "1 error");

        sink.error("e2".to_string(), span());
        assert_eq!(sink.summary(), "2 errors");

        sink.warning("w1".to_string(), span());
        assert_eq!(sink.summary(), "2 errors and 1 warning");
    }
}
