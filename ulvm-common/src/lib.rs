//! Shared diagnostics and source-location types for the ulvm workspace.

pub mod diag;
pub mod source_loc;

pub use diag::{Diagnostic, DiagnosticSink, Severity};
pub use source_loc::{SourceLocation, SourceSpan};
