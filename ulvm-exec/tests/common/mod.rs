//! Scripted engine fake shared by the driver scenario tests
//!
//! `ScriptVm` interprets a tiny op list instead of real bytecode but keeps
//! the contract of the interpreter boundary: one op per 4-byte slot, the
//! program counter advances before the op takes effect, syscalls re-enter
//! through the handler, and the step primitives report "did not continue"
//! without saying why.

use ulvm_common::{Diagnostic, SourceSpan};
use ulvm_exec::constants::{NUM_REGISTERS, REG_PC, REG_SP, WORD_SIZE};
use ulvm_exec::{
    Engine, Label, Program, SourceResolver, SyscallHandler, SyscallOutcome, Value, Vm, VmContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Nop,
    Push(u32),
    Syscall(u8),
    Halt,
    Fault(&'static str),
}

#[derive(Clone)]
pub struct ScriptProgram {
    ops: Vec<Op>,
    files: Vec<String>,
    lines: Vec<u32>,
    file_of: Vec<u32>,
}

impl Program for ScriptProgram {
    fn code_len(&self) -> usize {
        self.ops.len() * WORD_SIZE as usize
    }
    fn data_len(&self) -> usize {
        0
    }
    fn labels(&self) -> &[Label] {
        &[]
    }
    fn files(&self) -> &[String] {
        &self.files
    }
    fn address_to_line(&self) -> &[u32] {
        &self.lines
    }
    fn address_to_file(&self) -> &[u32] {
        &self.file_of
    }
}

/// 512 KiB, comfortably larger than one framebuffer
const MEMORY_SIZE: usize = 512 * 1024;

pub struct ScriptVm {
    ops: Vec<Op>,
    pc: u32,
    stack: Vec<u32>,
    memory: Vec<u8>,
    fault: Option<Diagnostic>,
}

impl ScriptVm {
    fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            pc: 0,
            stack: Vec::new(),
            memory: vec![0; MEMORY_SIZE],
            fault: None,
        }
    }
}

impl VmContext for ScriptVm {
    fn pop_int(&mut self) -> i32 {
        self.stack.pop().unwrap_or(0) as i32
    }
    fn pop_uint(&mut self) -> u32 {
        self.stack.pop().unwrap_or(0)
    }
    fn pop_float(&mut self) -> f32 {
        f32::from_bits(self.stack.pop().unwrap_or(0))
    }
    fn push_int(&mut self, v: i32) {
        self.stack.push(v as u32);
    }
    fn push_uint(&mut self, v: u32) {
        self.stack.push(v);
    }
    fn push_float(&mut self, v: f32) {
        self.stack.push(v.to_bits());
    }
    fn memory(&self) -> &[u8] {
        &self.memory
    }
}

impl Vm for ScriptVm {
    fn step(&mut self, syscalls: &mut dyn SyscallHandler) -> bool {
        let slot = (self.pc / WORD_SIZE) as usize;
        let Some(op) = self.ops.get(slot).copied() else {
            return false;
        };
        self.pc += WORD_SIZE;
        match op {
            Op::Nop => true,
            Op::Push(v) => {
                self.stack.push(v);
                true
            }
            Op::Halt => false,
            Op::Fault(message) => {
                self.fault = Some(Diagnostic::error(message.to_string(), SourceSpan::dummy()));
                false
            }
            Op::Syscall(number) => match syscalls.syscall(number, self) {
                SyscallOutcome::Resume => true,
                SyscallOutcome::Yield => false,
                SyscallOutcome::Unhandled => {
                    self.stack.push(u32::MAX);
                    true
                }
            },
        }
    }

    fn step_batch(&mut self, n: u32, syscalls: &mut dyn SyscallHandler) -> bool {
        for _ in 0..n {
            if !self.step(syscalls) {
                return false;
            }
        }
        true
    }

    fn step_batch_with_breakpoints(
        &mut self,
        n: u32,
        addresses: &[u32],
        syscalls: &mut dyn SyscallHandler,
    ) -> i32 {
        for _ in 0..n {
            if addresses.contains(&self.pc) {
                return 1;
            }
            if !self.step(syscalls) {
                return 0;
            }
        }
        -1
    }

    fn registers(&self) -> [Value; NUM_REGISTERS] {
        let mut regs = [Value::default(); NUM_REGISTERS];
        regs[REG_PC] = Value::from_uint(self.pc);
        regs[REG_SP] =
            Value::from_uint((self.memory.len() - self.stack.len() * WORD_SIZE as usize) as u32);
        regs
    }

    fn fault(&self) -> Option<Diagnostic> {
        self.fault.clone()
    }
}

pub struct ScriptEngine {
    program: ScriptProgram,
    fail: Option<Diagnostic>,
}

impl ScriptEngine {
    /// One source file "a.ul", line 10 + slot for every op
    pub fn new(ops: Vec<Op>) -> Self {
        let lines = (0..ops.len()).map(|slot| 10 + slot as u32).collect();
        let file_of = vec![0; ops.len()];
        Self {
            program: ScriptProgram {
                ops,
                files: vec!["a.ul".to_string()],
                lines,
                file_of,
            },
            fail: None,
        }
    }

    pub fn failing(diag: Diagnostic) -> Self {
        let mut engine = Self::new(Vec::new());
        engine.fail = Some(diag);
        engine
    }
}

impl Engine for ScriptEngine {
    type Program = ScriptProgram;
    type Vm = ScriptVm;

    fn compile(
        &self,
        entry: &str,
        sources: &mut dyn SourceResolver,
    ) -> Result<Self::Program, Diagnostic> {
        // the entry file must at least resolve
        if sources.read_source(entry).is_none() {
            return Err(Diagnostic::error(
                format!("cannot open '{}'", entry),
                SourceSpan::dummy(),
            ));
        }
        if let Some(diag) = &self.fail {
            return Err(diag.clone());
        }
        Ok(self.program.clone())
    }

    fn instantiate(&self, program: &Self::Program) -> Self::Vm {
        ScriptVm::new(program.ops.clone())
    }
}

/// Resolver that knows only the entry file
pub fn single_source() -> impl FnMut(&str) -> Option<String> {
    |name: &str| {
        if name == "a.ul" {
            Some(String::new())
        } else {
            None
        }
    }
}
