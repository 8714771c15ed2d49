//! Memory and I/O routing for the terminal Spectrum.
//!
//! Memory accesses go straight to the shared 64 KiB array. I/O dispatch
//! follows the ULA's decoding: only A0 is tested, so every even port is
//! the ULA. Reads combine the keyboard half-rows selected by the high
//! address byte with the tape EAR level; writes latch the border colour
//! and the MIC/speaker bits.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use format_spectrum_tap::TapePlayer;
use zilog_z80::Bus;

use crate::machine::Shared;

/// Bits of an IN ($FE) that are always high (5 and 7).
const FE_IDLE_BITS: u8 = 0xA0;

/// The CPU-facing bus.
pub struct TermBus {
    pub shared: Arc<Shared>,
    pub tape: TapePlayer,
    /// Cycle stamp at the start of the instruction underway, used to
    /// clock the tape player from within I/O reads.
    pub cycle: u64,
}

impl TermBus {
    #[must_use]
    pub fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            tape: TapePlayer::new(),
            cycle: 0,
        }
    }
}

impl Bus for TermBus {
    fn read_mem(&mut self, addr: u16) -> u8 {
        self.shared.memory.read(addr)
    }

    fn write_mem(&mut self, addr: u16, val: u8) {
        self.shared.memory.write(addr, val);
    }

    fn read_io(&mut self, port: u16) -> u8 {
        if port & 0x0001 == 0 {
            // Keyboard rows selected by the high byte, active low.
            let rows = self.shared.keyboard.read((port >> 8) as u8) & 0x1F;
            let ear = self.tape.read_ear(self.cycle);
            rows | FE_IDLE_BITS | (ear << 6)
        } else {
            // No peripheral drives the bus: pull-ups read high.
            0xFF
        }
    }

    fn write_io(&mut self, port: u16, val: u8) {
        if port & 0x0001 == 0 {
            self.shared.last_fe.store(val, Ordering::Relaxed);
            // Bits 0-2 border; bit 3 MIC and bit 4 speaker stay recorded
            // in last_fe for anything that wants them.
            self.shared.border.store(val & 0x07, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use format_spectrum_tap::TapFile;

    fn make_bus() -> TermBus {
        TermBus::new(Arc::new(Shared::new()))
    }

    #[test]
    fn memory_round_trip() {
        let mut bus = make_bus();
        bus.write_mem(0x8000, 0x5A);
        assert_eq!(bus.read_mem(0x8000), 0x5A);
    }

    #[test]
    fn idle_port_fe_reads_bf() {
        let mut bus = make_bus();
        // No keys, no tape: bits 0-5 and 7 high, EAR (bit 6) low.
        assert_eq!(bus.read_io(0xFEFE), 0xBF);
    }

    #[test]
    fn caps_shift_clears_bit_0() {
        let mut bus = make_bus();
        bus.shared.keyboard.set_key(0, 0, true);
        assert_eq!(bus.read_io(0xFEFE), 0xBE);
        // A different row scan misses it.
        assert_eq!(bus.read_io(0xFDFE), 0xBF);
    }

    #[test]
    fn odd_ports_float_high() {
        let mut bus = make_bus();
        assert_eq!(bus.read_io(0x00FF), 0xFF);
        assert_eq!(bus.read_io(0x1F1F), 0xFF);
    }

    #[test]
    fn out_fe_latches_border_and_raw_byte() {
        let mut bus = make_bus();
        bus.write_io(0x00FE, 0x1A); // border 2, MIC 1, speaker 1
        assert_eq!(bus.shared.border.load(Ordering::Relaxed), 2);
        assert_eq!(bus.shared.last_fe.load(Ordering::Relaxed), 0x1A);

        // Odd port writes are ignored.
        bus.write_io(0x00FF, 0x07);
        assert_eq!(bus.shared.border.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn ear_bit_follows_tape_player() {
        let mut bus = make_bus();

        // One header block; pilot pulses are 2168 T-states.
        let mut raw = Vec::new();
        raw.extend_from_slice(&3u16.to_le_bytes());
        raw.extend_from_slice(&[0x00, 0xAA, 0xAA]);
        bus.tape.insert(TapFile::parse(&raw).expect("valid TAP"), 0);

        bus.cycle = 0;
        assert_eq!(bus.read_io(0xFEFE) & 0x40, 0x00);
        bus.cycle = 2168;
        assert_eq!(bus.read_io(0xFEFE) & 0x40, 0x40, "EAR toggles after one pilot pulse");
    }
}
