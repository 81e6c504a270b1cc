//! Driver-visible error types

use thiserror::Error;
use ulvm_common::Diagnostic;

/// Errors surfaced directly to the caller of the driver API
///
/// Runtime interpreter faults are not part of this enum: they end the run
/// asynchronously and are collected in the driver's diagnostic sink instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecError {
    /// The external compiler rejected the program; no VM instance was created
    #[error("compile failed: {0}")]
    Compile(Diagnostic),
}
