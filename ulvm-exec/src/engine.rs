//! Interface to the opaque compiler/interpreter subsystem
//!
//! The compiler and the bytecode interpreter are an external collaborator;
//! the driver only ever touches them through the traits in this module:
//! compile, instantiate, step, read registers/memory, push/pop typed values.
//! Instruction semantics live entirely behind [`Vm`] and each step is an
//! atomic, uninterruptible unit from the driver's point of view.

use crate::constants::NUM_REGISTERS;
use ulvm_common::Diagnostic;

/// A 32-bit register or operand-stack cell, viewable as any of the VM's
/// scalar types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Value(u32);

impl Value {
    pub fn from_int(v: i32) -> Self {
        Self(v as u32)
    }

    pub fn from_uint(v: u32) -> Self {
        Self(v)
    }

    pub fn from_float(v: f32) -> Self {
        Self(v.to_bits())
    }

    pub fn int(self) -> i32 {
        self.0 as i32
    }

    pub fn uint(self) -> u32 {
        self.0
    }

    pub fn float(self) -> f32 {
        f32::from_bits(self.0)
    }
}

/// What a program label points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Code,
    Data,
    ReservedData,
}

/// An entry of the program's label table
#[derive(Debug, Clone)]
pub struct Label {
    pub name: String,
    pub kind: LabelKind,
    pub address: u32,
}

/// Read callback handed to the compiler so it can resolve included files
pub trait SourceResolver {
    /// Returns the contents of `name`, or `None` if the file is unknown
    fn read_source(&mut self, name: &str) -> Option<String>;
}

impl<F> SourceResolver for F
where
    F: FnMut(&str) -> Option<String>,
{
    fn read_source(&mut self, name: &str) -> Option<String> {
        self(name)
    }
}

/// The immutable compiled artifact
///
/// `address_to_line` and `address_to_file` are parallel arrays with one
/// entry per instruction slot; `address_to_file` holds indices into
/// [`Program::files`].
pub trait Program {
    fn code_len(&self) -> usize;
    fn data_len(&self) -> usize;
    fn labels(&self) -> &[Label];
    fn files(&self) -> &[String];
    fn address_to_line(&self) -> &[u32];
    fn address_to_file(&self) -> &[u32];
}

/// Typed operand-stack and memory view
///
/// This is the marshalling surface the interpreter hands back to a syscall
/// handler re-entrantly while a step is in flight; it is also the supertrait
/// through which the driver reads VM memory.
pub trait VmContext {
    fn pop_int(&mut self) -> i32;
    fn pop_uint(&mut self) -> u32;
    fn pop_float(&mut self) -> f32;
    fn push_int(&mut self, v: i32);
    fn push_uint(&mut self, v: u32);
    fn push_float(&mut self, v: f32);
    fn memory(&self) -> &[u8];
}

/// Outcome of dispatching one syscall, returned to the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    /// Keep executing within the current batch
    Resume,
    /// End the current step/batch; the driver decides what the yield means
    Yield,
    /// No behavior registered for this number; failure sentinel, not fatal
    Unhandled,
}

/// Receiver for numbered traps raised by the running program
pub trait SyscallHandler {
    fn syscall(&mut self, number: u8, vm: &mut dyn VmContext) -> SyscallOutcome;
}

/// One live interpreter instance: register file, memory image, operand stack
///
/// The step primitives report `false` (or `0`) both for "ran out of program"
/// and for "a syscall yielded"; the driver disambiguates with the yield
/// flags its syscall bridge maintains.
pub trait Vm: VmContext {
    /// Execute exactly one instruction. `false` means the VM did not
    /// continue: halt, fault, or syscall yield.
    fn step(&mut self, syscalls: &mut dyn SyscallHandler) -> bool;

    /// Execute up to `n` instructions. `false` as for [`Vm::step`].
    fn step_batch(&mut self, n: u32, syscalls: &mut dyn SyscallHandler) -> bool;

    /// Execute up to `n` instructions, stopping early if the program counter
    /// lands on any address in `addresses`. Returns a positive value if a
    /// breakpoint was hit, `0` if the VM stopped (halt, fault or yield), and
    /// a negative value if the batch was exhausted and the VM can continue.
    fn step_batch_with_breakpoints(
        &mut self,
        n: u32,
        addresses: &[u32],
        syscalls: &mut dyn SyscallHandler,
    ) -> i32;

    fn registers(&self) -> [Value; NUM_REGISTERS];

    /// The fault that stopped the VM, if any. Checked by the driver whenever
    /// a step primitive reports `false`.
    fn fault(&self) -> Option<Diagnostic>;
}

/// The external compiler plus interpreter factory
pub trait Engine {
    type Program: Program;
    type Vm: Vm;

    /// Compile `entry` (and anything it includes, via `sources`). A
    /// diagnostic aborts the run before any VM instance exists.
    fn compile(
        &self,
        entry: &str,
        sources: &mut dyn SourceResolver,
    ) -> Result<Self::Program, Diagnostic>;

    /// Create a fresh VM instance initialized for `program`
    fn instantiate(&self, program: &Self::Program) -> Self::Vm;
}
