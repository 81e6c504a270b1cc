//! Host capabilities the driver bridges syscalls onto
//!
//! The embedding environment supplies a [`Host`]: somewhere to put frames
//! and console text, pointer and clock state, and a way to get called again
//! before the next render. [`HeadlessHost`] is the reference implementation
//! used by tests and windowless embedders.

use std::time::Instant;

use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// Last-known pointer position and button state, in host surface coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerState {
    pub x: u32,
    pub y: u32,
    pub button_down: bool,
}

/// Capabilities provided by the embedding environment
pub trait Host {
    /// Present one converted RGBA frame
    fn present_frame(&mut self, rgba: &[u8], width: u32, height: u32);

    /// Append text to the host console
    fn console_write(&mut self, text: &str);

    /// Snapshot of the pointer, in surface coordinates
    fn pointer(&self) -> PointerState;

    /// Size of the surface the pointer coordinates refer to
    fn surface_size(&self) -> (u32, u32);

    /// Monotonic seconds; the epoch is the host's choice
    fn clock_seconds(&self) -> f32;

    /// Ask the host to call `Driver::pump` once before its next render.
    /// Spurious pumps are harmless; a requested one that never arrives
    /// stalls the run.
    fn request_frame(&mut self);
}

/// Host with no window system attached
///
/// Console output and presented frames are buffered for inspection, the
/// pointer is scriptable, and frame requests latch a one-shot flag the
/// embedder drains with [`HeadlessHost::take_frame_request`].
pub struct HeadlessHost {
    pub pointer: PointerState,
    pub surface: (u32, u32),
    console: String,
    frames_presented: usize,
    last_frame: Option<Vec<u8>>,
    frame_requested: bool,
    epoch: Instant,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self {
            pointer: PointerState::default(),
            surface: (DISPLAY_WIDTH, DISPLAY_HEIGHT),
            console: String::new(),
            frames_presented: 0,
            last_frame: None,
            frame_requested: false,
            epoch: Instant::now(),
        }
    }

    /// Everything written to the console so far
    pub fn console(&self) -> &str {
        &self.console
    }

    pub fn frames_presented(&self) -> usize {
        self.frames_presented
    }

    /// The most recently presented RGBA frame
    pub fn last_frame(&self) -> Option<&[u8]> {
        self.last_frame.as_deref()
    }

    /// Consume the pending frame request, if one was made
    pub fn take_frame_request(&mut self) -> bool {
        std::mem::take(&mut self.frame_requested)
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for HeadlessHost {
    fn present_frame(&mut self, rgba: &[u8], _width: u32, _height: u32) {
        self.frames_presented += 1;
        self.last_frame = Some(rgba.to_vec());
    }

    fn console_write(&mut self, text: &str) {
        self.console.push_str(text);
    }

    fn pointer(&self) -> PointerState {
        self.pointer
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    fn clock_seconds(&self) -> f32 {
        self.epoch.elapsed().as_secs_f32()
    }

    fn request_frame(&mut self) {
        self.frame_requested = true;
    }
}
