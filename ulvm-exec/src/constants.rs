//! Central configuration and constants for the execution driver

// Scheduler tuning
pub const INSTRUCTIONS_PER_BATCH: u32 = 20_000;
pub const FRAME_BUDGET_MS: u64 = 16; // one 60 Hz host frame

// Logical display resolution; programs render into a fixed-size framebuffer
pub const DISPLAY_WIDTH: u32 = 320;
pub const DISPLAY_HEIGHT: u32 = 240;
pub const FRAME_BYTES: usize = (DISPLAY_WIDTH * DISPLAY_HEIGHT * 4) as usize;

// Register file layout (16 registers; pc and sp live in the top slots)
pub const NUM_REGISTERS: usize = 16;
pub const REG_PC: usize = 15;
pub const REG_SP: usize = 14;

// Code addresses are byte addresses, one 4-byte word per instruction
pub const WORD_SIZE: u32 = 4;

// Syscall vector
pub const SYSCALL_SLOTS: usize = 256;
pub const SYS_DEBUG_BREAK: u8 = 0;
pub const SYS_PRESENT_FRAME: u8 = 1;
pub const SYS_CONSOLE_PRINT: u8 = 2;
pub const SYS_POLL_POINTER: u8 = 3;
pub const SYS_READ_CLOCK: u8 = 5;
