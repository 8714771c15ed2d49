//! ZX Spectrum 48K emulator with a terminal renderer.
//!
//! The machine couples a [`zilog_z80`] CPU to a flat 64 KiB memory and the
//! port $FE peripherals (keyboard matrix, border latch, tape EAR input).
//! A renderer thread decodes the display file at 50 Hz and draws it with
//! Unicode block or braille cells and ANSI colour.

pub mod bus;
pub mod disasm;
pub mod dump;
pub mod keyboard;
pub mod keyboard_map;
pub mod loader;
pub mod machine;
pub mod memory;
pub mod renderer;
pub mod run_control;
pub mod signals;

pub use bus::TermBus;
pub use keyboard::Keyboard;
pub use machine::{FRAME_TSTATES, Shared, Spectrum};
pub use memory::Memory;
pub use renderer::RenderMode;
pub use run_control::RunControl;
