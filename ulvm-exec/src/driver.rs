//! The execution driver: session lifecycle, state machine, accessors
//!
//! One [`Driver`] owns the whole debugging session: the engine, the host,
//! the current VM instance (if any), the breakpoint set and the diagnostic
//! sink. The scheduler half (the pump loop driving batches against the
//! frame budget) lives in the `sched` module; this module holds everything
//! an editor front end calls directly.

use std::time::{Duration, Instant};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::breakpoint::{Breakpoint, BreakpointSet};
use crate::constants::{
    FRAME_BUDGET_MS, INSTRUCTIONS_PER_BATCH, NUM_REGISTERS, REG_PC, REG_SP, WORD_SIZE,
};
use crate::engine::{Engine, Program, SourceResolver, Value, Vm, VmContext};
use crate::error::ExecError;
use crate::host::Host;
use crate::sched::StepOutcome;
use crate::syscall::SyscallTable;
use ulvm_common::{Diagnostic, DiagnosticSink};

/// The three driver states. Every transition goes through
/// [`Driver::set_state`] so the editor's listener sees each change exactly
/// once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecState {
    /// No VM instance exists
    Stopped,
    /// A VM exists and the pump advances it
    Running,
    /// A VM exists, frozen; registers and memory are inspectable
    Paused,
}

/// Tunable pacing knobs, defaulting to the production values
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    /// Instructions per uninterruptible batch
    pub instructions_per_batch: u32,
    /// Wall-clock budget of one pump before yielding to the host
    pub frame_budget: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            instructions_per_batch: INSTRUCTIONS_PER_BATCH,
            frame_budget: Duration::from_millis(FRAME_BUDGET_MS),
        }
    }
}

/// Throughput counters of the current or just-finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecStats {
    pub executed_instructions: u64,
    pub elapsed: Duration,
}

impl ExecStats {
    pub fn instructions_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.executed_instructions as f64 / secs
    }
}

/// Everything that exists only while a program is loaded
pub(crate) struct Session<E: Engine> {
    pub(crate) program: E::Program,
    pub(crate) vm: E::Vm,
    pub(crate) started: Instant,
    pub(crate) executed_instructions: u64,
    /// Set when a pause was caused by a breakpoint; the next resume steps
    /// over that instruction before re-arming the breakpoint table
    pub(crate) last_step_hit_breakpoint: bool,
}

/// The execution and debugging driver
pub struct Driver<E: Engine, H: Host> {
    pub(crate) engine: E,
    pub(crate) host: H,
    pub(crate) config: DriverConfig,
    pub(crate) state: ExecState,
    pub(crate) session: Option<Session<E>>,
    pub(crate) breakpoints: BreakpointSet,
    pub(crate) syscalls: SyscallTable,
    pub(crate) diagnostics: DiagnosticSink,
    listener: Option<Box<dyn FnMut(ExecState)>>,
}

impl<E: Engine, H: Host> Driver<E, H> {
    pub fn new(engine: E, host: H) -> Self {
        Self::with_config(engine, host, DriverConfig::default())
    }

    pub fn with_config(engine: E, host: H, config: DriverConfig) -> Self {
        Self {
            engine,
            host,
            config,
            state: ExecState::Stopped,
            session: None,
            breakpoints: BreakpointSet::default(),
            syscalls: SyscallTable::new(),
            diagnostics: DiagnosticSink::new(),
            listener: None,
        }
    }

    /// Install the state-change callback; replaces any previous one
    pub fn set_state_listener(&mut self, listener: impl FnMut(ExecState) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Compile `entry` and start executing it from the beginning
    ///
    /// Any previous session is torn down first, whatever state it was in.
    /// On a compile error the driver stays stopped, the diagnostic lands in
    /// the sink and is also returned.
    pub fn run(&mut self, entry: &str, sources: &mut dyn SourceResolver) -> Result<(), ExecError> {
        if self.session.take().is_some() {
            self.log_run_stats();
        }
        self.breakpoints.invalidate();
        self.diagnostics.clear();
        self.set_state(ExecState::Stopped);

        let program = match self.engine.compile(entry, sources) {
            Ok(program) => program,
            Err(diag) => {
                self.diagnostics.push(diag.clone());
                return Err(ExecError::Compile(diag));
            }
        };
        let vm = self.engine.instantiate(&program);
        self.syscalls = SyscallTable::new();
        self.session = Some(Session {
            program,
            vm,
            started: Instant::now(),
            executed_instructions: 0,
            last_step_hit_breakpoint: false,
        });

        self.set_state(ExecState::Running);
        self.host.request_frame();
        Ok(())
    }

    /// Freeze a running VM; no-op in any other state
    pub fn pause(&mut self) {
        if self.state == ExecState::Running {
            self.set_state(ExecState::Paused);
            self.log_vm_state();
        }
    }

    /// Let a paused VM continue; no-op in any other state
    pub fn resume(&mut self) {
        if self.state == ExecState::Paused {
            self.set_state(ExecState::Running);
            self.host.request_frame();
        }
    }

    /// Execute exactly one instruction of a paused VM
    ///
    /// The VM stays paused unless that instruction halts or faults. Stepping
    /// always clears the pending step-over flag: the breakpoint instruction
    /// was just executed manually.
    pub fn step(&mut self) {
        if self.state != ExecState::Paused {
            return;
        }
        let outcome = self.single_step();
        if let Some(session) = self.session.as_mut() {
            session.last_step_hit_breakpoint = false;
        }
        match outcome {
            StepOutcome::Halted => self.finish_run(),
            StepOutcome::Fault(diag) => {
                self.diagnostics.push(diag);
                self.finish_run();
            }
            _ => {
                // still paused; refresh the front end anyway
                self.notify();
                self.log_vm_state();
            }
        }
    }

    /// Tear down the session and return to stopped
    pub fn stop(&mut self) {
        if self.session.is_some() {
            self.log_run_stats();
            self.session = None;
        }
        self.breakpoints.invalidate();
        self.set_state(ExecState::Stopped);
    }

    /// Replace the breakpoint set
    ///
    /// While a program is loaded the new set is resolved immediately, so the
    /// next batch already honors it; otherwise resolution waits for the next
    /// run.
    pub fn set_breakpoints(&mut self, breakpoints: Vec<Breakpoint>) {
        self.breakpoints.set(breakpoints);
        if let Some(session) = &self.session {
            self.breakpoints.resolved(&session.program);
        }
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    /// Counters of the live session, if one exists
    pub fn stats(&self) -> Option<ExecStats> {
        self.session.as_ref().map(|s| ExecStats {
            executed_instructions: s.executed_instructions,
            elapsed: s.started.elapsed(),
        })
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.diagnostics()
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        self.breakpoints.breakpoints()
    }

    pub fn registers(&self) -> Option<[Value; NUM_REGISTERS]> {
        self.session.as_ref().map(|s| s.vm.registers())
    }

    pub fn program(&self) -> Option<&E::Program> {
        self.session.as_ref().map(|s| &s.program)
    }

    /// Source line of the paused program counter
    pub fn current_line(&self) -> Option<u32> {
        let session = self.paused_session()?;
        let slot = self.pc_slot(session)?;
        session.program.address_to_line().get(slot).copied()
    }

    /// Source file of the paused program counter
    pub fn current_file(&self) -> Option<&str> {
        let session = self.paused_session()?;
        let slot = self.pc_slot(session)?;
        let file = *session.program.address_to_file().get(slot)?;
        session
            .program
            .files()
            .get(file as usize)
            .map(String::as_str)
    }

    pub fn memory_int(&self, addr: u32) -> Option<i32> {
        self.memory_word(addr).map(|w| w as i32)
    }

    pub fn memory_uint(&self, addr: u32) -> Option<u32> {
        self.memory_word(addr)
    }

    pub fn memory_float(&self, addr: u32) -> Option<f32> {
        self.memory_word(addr).map(f32::from_bits)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn paused_session(&self) -> Option<&Session<E>> {
        if self.state != ExecState::Paused {
            return None;
        }
        self.session.as_ref()
    }

    fn pc_slot(&self, session: &Session<E>) -> Option<usize> {
        let pc = session.vm.registers()[REG_PC].uint();
        Some((pc / WORD_SIZE) as usize)
    }

    /// Little-endian 32-bit read from VM memory; `None` when no session
    /// exists or the address is out of range
    fn memory_word(&self, addr: u32) -> Option<u32> {
        let session = self.session.as_ref()?;
        let addr = addr as usize;
        let bytes = session.vm.memory().get(addr..addr + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// End the run: final stats, teardown, stopped
    pub(crate) fn finish_run(&mut self) {
        self.log_run_stats();
        self.session = None;
        self.set_state(ExecState::Stopped);
    }

    pub(crate) fn set_state(&mut self, state: ExecState) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.notify();
    }

    pub(crate) fn notify(&mut self) {
        if let Some(listener) = &mut self.listener {
            listener(self.state);
        }
    }

    pub(crate) fn log_run_stats(&self) {
        let Some(stats) = self.stats() else { return };
        info!(
            "executed {} instructions in {:.3}s ({:.0} ins/s)",
            stats.executed_instructions,
            stats.elapsed.as_secs_f64(),
            stats.instructions_per_second()
        );
    }

    pub(crate) fn log_vm_state(&self) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let regs = session.vm.registers();
        debug!(
            "pc={:#010x} sp={:#010x}",
            regs[REG_PC].uint(),
            regs[REG_SP].uint()
        );
        for (i, reg) in regs.iter().enumerate().take(REG_SP) {
            debug!("  r{:<2} = {:#010x} ({})", i, reg.uint(), reg.int());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_production_pacing() {
        let config = DriverConfig::default();
        assert_eq!(config.instructions_per_batch, 20_000);
        assert_eq!(config.frame_budget, Duration::from_millis(16));
    }

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ExecState::Paused).unwrap(),
            "\"paused\""
        );
        let state: ExecState = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(state, ExecState::Running);
    }

    #[test]
    fn test_stats_throughput() {
        let stats = ExecStats {
            executed_instructions: 40_000,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(stats.instructions_per_second(), 20_000.0);

        let empty = ExecStats {
            executed_instructions: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(empty.instructions_per_second(), 0.0);
    }
}
