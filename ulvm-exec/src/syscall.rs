//! Syscall bridge: numbered traps from the interpreter to host effects
//!
//! A 256-slot dispatch table, keyed directly by syscall number and built
//! fresh at `run()`. Whatever the trap does, the interpreter only ever sees
//! a [`SyscallOutcome`]; the frame-present and debug-break yields are
//! recorded in flags the scheduler reads back after the batch, because the
//! interpreter reports both "halted" and "yielded" as the same `false`.

use log::warn;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, FRAME_BYTES, SYSCALL_SLOTS, SYS_CONSOLE_PRINT, SYS_DEBUG_BREAK,
    SYS_POLL_POINTER, SYS_PRESENT_FRAME, SYS_READ_CLOCK,
};
use crate::engine::{SyscallHandler, SyscallOutcome, VmContext};
use crate::host::Host;

/// Host effect bound to a syscall slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCall {
    DebugBreak,
    PresentFrame,
    ConsolePrint,
    PollPointer,
    ReadClock,
}

/// Argument tag of the console-print protocol
///
/// The tag stream is self-describing: the program pushes value/tag pairs and
/// a closing `End`, and the number of stack values consumed is determined by
/// the tags alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintTag {
    Int,
    Hex,
    Float,
    Str,
    Space,
    Newline,
    End,
}

impl PrintTag {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(PrintTag::Int),
            1 => Some(PrintTag::Hex),
            2 => Some(PrintTag::Float),
            3 => Some(PrintTag::Str),
            4 => Some(PrintTag::Space),
            5 => Some(PrintTag::Newline),
            6 => Some(PrintTag::End),
            _ => None,
        }
    }
}

/// The dispatch table plus the per-run bridge state
pub struct SyscallTable {
    slots: [Option<HostCall>; SYSCALL_SLOTS],
    frame_presented: bool,
    debug_break: bool,
    staging: Vec<u8>,
}

impl SyscallTable {
    /// Table with the standard bindings installed; all other slots are
    /// unregistered and answer with the failure sentinel
    pub fn new() -> Self {
        let mut slots = [None; SYSCALL_SLOTS];
        slots[SYS_DEBUG_BREAK as usize] = Some(HostCall::DebugBreak);
        slots[SYS_PRESENT_FRAME as usize] = Some(HostCall::PresentFrame);
        slots[SYS_CONSOLE_PRINT as usize] = Some(HostCall::ConsolePrint);
        slots[SYS_POLL_POINTER as usize] = Some(HostCall::PollPointer);
        slots[SYS_READ_CLOCK as usize] = Some(HostCall::ReadClock);
        Self {
            slots,
            frame_presented: false,
            debug_break: false,
            staging: vec![0; FRAME_BYTES],
        }
    }

    /// Read and clear both yield flags: (frame presented, debug break)
    pub fn take_yields(&mut self) -> (bool, bool) {
        (
            std::mem::take(&mut self.frame_presented),
            std::mem::take(&mut self.debug_break),
        )
    }

    /// Pair the table with the host for the duration of one step/batch call
    pub fn connect<'a, H: Host>(&'a mut self, host: &'a mut H) -> Bridge<'a, H> {
        Bridge { table: self, host }
    }
}

impl Default for SyscallTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The dispatcher handed to the interpreter for one step/batch
pub struct Bridge<'a, H: Host> {
    table: &'a mut SyscallTable,
    host: &'a mut H,
}

impl<H: Host> SyscallHandler for Bridge<'_, H> {
    fn syscall(&mut self, number: u8, vm: &mut dyn VmContext) -> SyscallOutcome {
        match self.table.slots[number as usize] {
            None => SyscallOutcome::Unhandled,
            Some(HostCall::DebugBreak) => {
                self.table.debug_break = true;
                SyscallOutcome::Yield
            }
            Some(HostCall::PresentFrame) => self.present_frame(vm),
            Some(HostCall::ConsolePrint) => self.console_print(vm),
            Some(HostCall::PollPointer) => self.poll_pointer(vm),
            Some(HostCall::ReadClock) => {
                vm.push_float(self.host.clock_seconds());
                SyscallOutcome::Resume
            }
        }
    }
}

impl<H: Host> Bridge<'_, H> {
    fn present_frame(&mut self, vm: &mut dyn VmContext) -> SyscallOutcome {
        let offset = vm.pop_uint() as usize;
        let memory = vm.memory();
        match memory.get(offset..offset + FRAME_BYTES) {
            Some(argb) => {
                argb_to_rgba(argb, &mut self.table.staging);
                self.host
                    .present_frame(&self.table.staging, DISPLAY_WIDTH, DISPLAY_HEIGHT);
            }
            None => {
                warn!(
                    "framebuffer offset {:#x} out of range (memory is {} bytes), frame dropped",
                    offset,
                    memory.len()
                );
            }
        }
        // even a dropped frame is a per-frame checkpoint, not termination
        self.table.frame_presented = true;
        SyscallOutcome::Yield
    }

    fn console_print(&mut self, vm: &mut dyn VmContext) -> SyscallOutcome {
        let mut text = String::new();
        loop {
            let raw = vm.pop_uint();
            let Some(tag) = PrintTag::from_raw(raw) else {
                warn!("unknown print tag {}, truncating console output", raw);
                break;
            };
            match tag {
                PrintTag::End => break,
                PrintTag::Int => text.push_str(&vm.pop_int().to_string()),
                PrintTag::Hex => {
                    let v = vm.pop_uint();
                    text.push_str(&format!("0x{:x}", v));
                }
                PrintTag::Float => text.push_str(&vm.pop_float().to_string()),
                PrintTag::Str => {
                    let addr = vm.pop_uint() as usize;
                    text.push_str(&read_string(vm.memory(), addr));
                }
                PrintTag::Space => text.push(' '),
                PrintTag::Newline => text.push('\n'),
            }
        }
        self.host.console_write(&text);
        SyscallOutcome::Resume
    }

    fn poll_pointer(&mut self, vm: &mut dyn VmContext) -> SyscallOutcome {
        let pointer = self.host.pointer();
        let (sw, sh) = self.host.surface_size();
        vm.push_int(scale(pointer.x, sw, DISPLAY_WIDTH) as i32);
        vm.push_int(scale(pointer.y, sh, DISPLAY_HEIGHT) as i32);
        vm.push_int(if pointer.button_down { -1 } else { 0 });
        SyscallOutcome::Resume
    }
}

/// Convert a packed ARGB (little-endian `0xAARRGGBB`) pixel buffer into the
/// RGBA byte order host presentation APIs expect
pub fn argb_to_rgba(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let v = u32::from_le_bytes([s[0], s[1], s[2], s[3]]);
        d[0] = (v >> 16) as u8;
        d[1] = (v >> 8) as u8;
        d[2] = v as u8;
        d[3] = (v >> 24) as u8;
    }
}

/// NUL-terminated string at `addr`, decoded lossily; runs to end of memory
/// if the terminator is missing
fn read_string(memory: &[u8], addr: usize) -> String {
    let Some(tail) = memory.get(addr..) else {
        warn!("string offset {:#x} out of range", addr);
        return String::new();
    };
    let len = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    String::from_utf8_lossy(&tail[..len]).into_owned()
}

/// Map a surface coordinate into the VM's logical resolution
fn scale(v: u32, surface: u32, logical: u32) -> u32 {
    if surface == 0 {
        return 0;
    }
    (v as u64 * logical as u64 / surface as u64) as u32
}
