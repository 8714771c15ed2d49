//! Top-level Spectrum system.
//!
//! The CPU runs at 3.5 MHz and the ULA raises a maskable interrupt once
//! per 50 Hz frame (69,888 T-states). The machine owns the CPU and its
//! bus; everything the renderer thread needs lives in [`Shared`] behind
//! an `Arc`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use format_spectrum_tap::TapFile;
use format_z80::Snapshot;
use zilog_z80::Z80;

use crate::bus::TermBus;
use crate::keyboard::Keyboard;
use crate::memory::Memory;

/// CPU T-states per 50 Hz frame (48K PAL: 224 T-states x 312 lines).
pub const FRAME_TSTATES: u64 = 69_888;

/// CPU clock in Hz.
pub const CPU_HZ: u64 = 3_500_000;

/// State shared between the CPU thread and the renderer thread.
pub struct Shared {
    pub memory: Memory,
    pub keyboard: Keyboard,
    /// Border colour 0-7, latched by OUT ($FE).
    pub border: AtomicU8,
    /// Last byte written to port $FE (MIC and speaker bits included).
    pub last_fe: AtomicU8,
    /// CPU cycle counter mirror, for diagnostics only.
    pub cycles: AtomicU64,
}

impl Shared {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Memory::new(),
            keyboard: Keyboard::new(),
            border: AtomicU8::new(7),
            last_fe: AtomicU8::new(0),
            cycles: AtomicU64::new(0),
        }
    }
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}

/// ZX Spectrum 48K system: CPU, bus, and frame interrupt generator.
pub struct Spectrum {
    pub cpu: Z80,
    pub bus: TermBus,
    /// Cycle stamp of the next frame interrupt.
    next_int: u64,
    /// Instructions executed since construction.
    executed: u64,
}

impl Spectrum {
    #[must_use]
    pub fn new(shared: Arc<Shared>) -> Self {
        Self {
            cpu: Z80::new(),
            bus: TermBus::new(shared),
            next_int: FRAME_TSTATES,
            executed: 0,
        }
    }

    /// Execute one instruction; returns the T-states consumed.
    pub fn step(&mut self) -> u32 {
        // Anchor the tape player to the instruction start time.
        self.bus.cycle = self.cpu.cycles();
        let cycles = self.cpu.step(&mut self.bus);
        self.executed += 1;

        let now = self.cpu.cycles();
        self.bus.shared.cycles.store(now, Ordering::Relaxed);

        // 50 Hz ULA frame interrupt. The data bus floats high during the
        // acknowledge cycle, so IM 2 sees vector byte $FF.
        if now >= self.next_int {
            self.cpu.request_int(0xFF);
            self.next_int += FRAME_TSTATES;
        }

        cycles
    }

    /// Total instructions executed.
    #[must_use]
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// Total T-states elapsed.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles()
    }

    /// Insert a TAP tape; the pulse stream starts at the current cycle.
    pub fn insert_tape(&mut self, tap: TapFile) {
        let cycle = self.cpu.cycles();
        self.bus.tape.insert(tap, cycle);
    }

    /// Restore CPU, border and RAM from a parsed .z80 snapshot.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        let regs = &mut self.cpu.regs;
        regs.a = snapshot.a;
        regs.f = snapshot.f;
        regs.b = snapshot.b;
        regs.c = snapshot.c;
        regs.d = snapshot.d;
        regs.e = snapshot.e;
        regs.h = snapshot.h;
        regs.l = snapshot.l;
        regs.a_alt = snapshot.a_alt;
        regs.f_alt = snapshot.f_alt;
        regs.b_alt = snapshot.b_alt;
        regs.c_alt = snapshot.c_alt;
        regs.d_alt = snapshot.d_alt;
        regs.e_alt = snapshot.e_alt;
        regs.h_alt = snapshot.h_alt;
        regs.l_alt = snapshot.l_alt;
        regs.ix = snapshot.ix;
        regs.iy = snapshot.iy;
        regs.sp = snapshot.sp;
        regs.pc = snapshot.pc;
        regs.i = snapshot.i;
        regs.r = snapshot.r;
        regs.iff1 = snapshot.iff1;
        regs.iff2 = snapshot.iff2;
        regs.im = snapshot.im;
        regs.halted = false;
        regs.wz = 0;

        let shared = &self.bus.shared;
        shared.border.store(snapshot.border & 0x07, Ordering::Relaxed);
        if let Some(rom) = &snapshot.rom {
            shared.memory.load(0x0000, rom);
        }
        shared.memory.load(0x4000, &snapshot.ram);
    }
}
