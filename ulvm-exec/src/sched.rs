//! The batch scheduler behind `Driver::pump`
//!
//! Running execution is cooperative: the host calls `pump` once per frame
//! request, and the pump burns batches of instructions until the frame
//! budget is spent or the VM stops for a reason the state machine must act
//! on. Each batch is classified into one [`StepOutcome`] by combining the
//! interpreter's return value with the yield flags of the syscall bridge.

use std::time::Instant;

use crate::driver::{Driver, ExecState};
use crate::engine::{Engine, Vm};
use crate::host::Host;
use ulvm_common::Diagnostic;

/// Why a step or batch ended
#[derive(Debug)]
pub(crate) enum StepOutcome {
    /// Batch exhausted, VM can keep going
    Continued,
    /// A frame was presented; wait for the next frame request
    Yielded,
    /// The program asked to be paused
    DebugBreak,
    /// The program counter landed on a resolved breakpoint
    BreakpointHit,
    /// The program ran off the end of its code
    Halted,
    /// The interpreter stopped with a runtime fault
    Fault(Diagnostic),
}

impl<E: Engine, H: Host> Driver<E, H> {
    /// Advance a running VM for up to one frame budget
    ///
    /// Called by the embedder in response to `Host::request_frame`. Does
    /// nothing unless the driver is running.
    pub fn pump(&mut self) {
        if self.state() != ExecState::Running {
            return;
        }
        let frame_start = Instant::now();

        // a resume after a breakpoint pause first steps over the
        // breakpoint instruction, or the batch would stop on it again
        if self.take_step_over_flag() {
            match self.single_step() {
                StepOutcome::Continued => {}
                outcome => {
                    self.finish_frame(outcome);
                    return;
                }
            }
        }

        loop {
            match self.run_batch() {
                StepOutcome::Continued => {
                    if frame_start.elapsed() >= self.config.frame_budget {
                        self.host.request_frame();
                        return;
                    }
                }
                outcome => {
                    self.finish_frame(outcome);
                    return;
                }
            }
        }
    }

    fn take_step_over_flag(&mut self) -> bool {
        self.session
            .as_mut()
            .map(|s| std::mem::take(&mut s.last_step_hit_breakpoint))
            .unwrap_or(false)
    }

    /// Execute one instruction and classify how it ended
    pub(crate) fn single_step(&mut self) -> StepOutcome {
        let Some(session) = self.session.as_mut() else {
            return StepOutcome::Halted;
        };
        let continued = {
            let mut bridge = self.syscalls.connect(&mut self.host);
            session.vm.step(&mut bridge)
        };
        session.executed_instructions += 1;
        if continued {
            StepOutcome::Continued
        } else {
            self.classify_stop()
        }
    }

    /// Execute one batch, honoring the resolved breakpoint table
    fn run_batch(&mut self) -> StepOutcome {
        let Some(session) = self.session.as_mut() else {
            return StepOutcome::Halted;
        };
        let batch = self.config.instructions_per_batch;

        let result = if self.breakpoints.is_empty() {
            let mut bridge = self.syscalls.connect(&mut self.host);
            if session.vm.step_batch(batch, &mut bridge) {
                -1
            } else {
                0
            }
        } else {
            let addresses = self.breakpoints.resolved(&session.program);
            let mut bridge = self.syscalls.connect(&mut self.host);
            session
                .vm
                .step_batch_with_breakpoints(batch, addresses, &mut bridge)
        };
        session.executed_instructions += batch as u64;

        if result > 0 {
            StepOutcome::BreakpointHit
        } else if result < 0 {
            StepOutcome::Continued
        } else {
            self.classify_stop()
        }
    }

    /// The interpreter reported "did not continue"; decide what that was.
    /// A fault wins over any yield flag, a debug break over a presented
    /// frame; a clean stop with no flags set is a halt.
    fn classify_stop(&mut self) -> StepOutcome {
        let fault = self.session.as_ref().and_then(|s| s.vm.fault());
        let (frame_presented, debug_break) = self.syscalls.take_yields();
        if let Some(diag) = fault {
            StepOutcome::Fault(diag)
        } else if debug_break {
            StepOutcome::DebugBreak
        } else if frame_presented {
            StepOutcome::Yielded
        } else {
            StepOutcome::Halted
        }
    }

    /// Apply the frame-ending outcome to the state machine
    fn finish_frame(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Continued | StepOutcome::Yielded => {
                self.host.request_frame();
            }
            StepOutcome::DebugBreak => {
                self.set_state(ExecState::Paused);
                self.log_vm_state();
            }
            StepOutcome::BreakpointHit => {
                if let Some(session) = self.session.as_mut() {
                    session.last_step_hit_breakpoint = true;
                }
                self.set_state(ExecState::Paused);
                self.log_vm_state();
            }
            StepOutcome::Halted => self.finish_run(),
            StepOutcome::Fault(diag) => {
                self.diagnostics.push(diag);
                self.finish_run();
            }
        }
    }
}
