//! Flat 64 KiB memory shared between the CPU and renderer threads.
//!
//! The renderer reads VRAM while the CPU writes it. The Spectrum tolerates
//! torn frames (real hardware raced the ULA the same way), so every cell
//! is a relaxed atomic byte: no locks, no ordering guarantees beyond the
//! per-byte atomicity, one-frame staleness at worst.
//!
//! The whole map is writable. $0000-$3FFF is ROM by convention only; the
//! loader is what normally fills it, and guests assume it is read-only.

use std::sync::atomic::{AtomicU8, Ordering};

use sinclair_ula::VRAM_SIZE;

/// Base address of the display file.
pub const VRAM_BASE: u16 = 0x4000;

/// Largest ROM image the loader accepts.
pub const ROM_MAX: usize = 0x4000;

/// 64 KiB of relaxed atomic bytes.
pub struct Memory {
    cells: Box<[AtomicU8; 0x10000]>,
}

impl Memory {
    #[must_use]
    pub fn new() -> Self {
        // Vec -> boxed array: the literal form would blow the stack.
        let cells: Vec<AtomicU8> = (0..0x10000).map(|_| AtomicU8::new(0)).collect();
        let cells = cells
            .into_boxed_slice()
            .try_into()
            .unwrap_or_else(|_| unreachable!("vector has exactly 65536 cells"));
        Self { cells }
    }

    #[must_use]
    pub fn read(&self, addr: u16) -> u8 {
        self.cells[addr as usize].load(Ordering::Relaxed)
    }

    pub fn write(&self, addr: u16, val: u8) {
        self.cells[addr as usize].store(val, Ordering::Relaxed);
    }

    /// Bulk load, wrapping at the top of the address space.
    pub fn load(&self, base: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.write(base.wrapping_add(i as u16), byte);
        }
    }

    /// Copy the 6912-byte display file for rendering.
    #[must_use]
    pub fn snapshot_vram(&self) -> Vec<u8> {
        let mut vram = vec![0u8; VRAM_SIZE];
        for (i, byte) in vram.iter_mut().enumerate() {
            *byte = self.read(VRAM_BASE.wrapping_add(i as u16));
        }
        vram
    }

    /// Copy the full 64 KiB (SIGUSR1 dumps).
    #[must_use]
    pub fn dump(&self) -> Vec<u8> {
        (0..0x10000u32).map(|addr| self.read(addr as u16)).collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_round_trip() {
        let mem = Memory::new();
        mem.write(0x8000, 0xAB);
        assert_eq!(mem.read(0x8000), 0xAB);
        mem.write(0xFFFF, 0xCD);
        assert_eq!(mem.read(0xFFFF), 0xCD);
    }

    #[test]
    fn rom_region_is_writable_at_model_level() {
        let mem = Memory::new();
        mem.write(0x0000, 0x42);
        assert_eq!(mem.read(0x0000), 0x42);
    }

    #[test]
    fn snapshot_vram_covers_display_file() {
        let mem = Memory::new();
        mem.write(0x4000, 0x80);
        mem.write(0x5AFF, 0x07);
        let vram = mem.snapshot_vram();
        assert_eq!(vram.len(), VRAM_SIZE);
        assert_eq!(vram[0], 0x80);
        assert_eq!(vram[VRAM_SIZE - 1], 0x07);
    }
}
