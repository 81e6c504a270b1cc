//! Symbolic breakpoints and their resolution to instruction addresses
//!
//! The editor speaks (file, line) pairs; the interpreter's breakpoint-aware
//! batch primitive wants concrete byte addresses. The resolved table is a
//! derived cache: invalidated whenever the breakpoint set or the loaded
//! program changes, rebuilt lazily the next time a run needs it.

use serde::{Deserialize, Serialize};

use crate::constants::WORD_SIZE;
use crate::engine::Program;

/// A breakpoint requested by the editor; identity is the (file, line) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Breakpoint {
    pub file: String,
    pub line: u32,
}

impl Breakpoint {
    pub fn new(file: &str, line: u32) -> Self {
        Self {
            file: file.to_string(),
            line,
        }
    }
}

/// Resolve breakpoints against a program's address tables
///
/// For each breakpoint, the first instruction slot whose (line, file) pair
/// matches contributes one byte address. A breakpoint that matches no slot
/// (comment line, blank line) is a soft miss and is silently skipped, so the
/// result may be shorter than the input.
pub fn resolve_breakpoints(breakpoints: &[Breakpoint], program: &dyn Program) -> Vec<u32> {
    let lines = program.address_to_line();
    let files = program.address_to_file();
    let names = program.files();

    let mut resolved = Vec::with_capacity(breakpoints.len());
    for bp in breakpoints {
        for (slot, (&line, &file)) in lines.iter().zip(files.iter()).enumerate() {
            if line == bp.line && names.get(file as usize).map(String::as_str) == Some(bp.file.as_str()) {
                resolved.push(slot as u32 * WORD_SIZE);
                break;
            }
        }
    }
    resolved
}

/// The breakpoint set plus its cached resolved table
#[derive(Debug, Default)]
pub struct BreakpointSet {
    breakpoints: Vec<Breakpoint>,
    resolved: Option<Vec<u32>>,
}

impl BreakpointSet {
    /// Replace the whole set; the old resolved table is dropped first
    pub fn set(&mut self, breakpoints: Vec<Breakpoint>) {
        self.resolved = None;
        self.breakpoints = breakpoints;
    }

    /// Drop the cached table (new program loaded)
    pub fn invalidate(&mut self) {
        self.resolved = None;
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// The resolved address table for `program`, recomputing it if stale
    pub fn resolved(&mut self, program: &dyn Program) -> &[u32] {
        self.resolved
            .get_or_insert_with(|| resolve_breakpoints(&self.breakpoints, program))
    }
}
