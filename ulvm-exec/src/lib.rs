//! Execution and debugging driver for the ulang virtual machine
//!
//! The driver sits between an editor front end and the compiler/interpreter
//! subsystem: it owns the session lifecycle (run, pause, resume, step,
//! stop), resolves symbolic breakpoints to instruction addresses, paces
//! execution in instruction batches against a per-frame time budget, and
//! bridges the VM's numbered syscalls onto a [`Host`].
//!
//! The compiler and interpreter themselves are abstract: an embedder
//! supplies an [`Engine`] and a [`Host`] and drives the scheduler by
//! calling [`Driver::pump`] whenever the host's frame request fires.

pub mod breakpoint;
pub mod constants;
pub mod driver;
pub mod engine;
pub mod error;
pub mod host;
pub mod syscall;

mod sched;

pub use breakpoint::{resolve_breakpoints, Breakpoint, BreakpointSet};
pub use driver::{Driver, DriverConfig, ExecState, ExecStats};
pub use engine::{
    Engine, Label, LabelKind, Program, SourceResolver, SyscallHandler, SyscallOutcome, Value, Vm,
    VmContext,
};
pub use error::ExecError;
pub use host::{HeadlessHost, Host, PointerState};
pub use syscall::{HostCall, PrintTag, SyscallTable};
