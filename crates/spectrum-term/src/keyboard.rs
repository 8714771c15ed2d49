//! ZX Spectrum keyboard matrix.
//!
//! The keyboard is an 8x5 matrix of half-rows read through port $FE. The
//! high byte of the port address is an active-low row select: each zero
//! bit (A8-A15) includes one half-row in the scan, and the selected rows
//! are combined so any pressed key pulls its bit low.
//!
//! Row table (address line -> keys, bit 0..bit 4):
//!
//! | Line | Keys                         |
//! |------|------------------------------|
//! | A8   | Caps-Shift, Z, X, C, V       |
//! | A9   | A, S, D, F, G                |
//! | A10  | Q, W, E, R, T                |
//! | A11  | 1, 2, 3, 4, 5                |
//! | A12  | 0, 9, 8, 7, 6                |
//! | A13  | Enter, L, K, J, H            |
//! | A14  | Space, Sym-Shift, M, N, B    |
//! | A15  | P, O, I, U, Y                |
//!
//! State is owned here as atomics so the renderer thread (which polls the
//! terminal) and the CPU thread (which services IN) share it without
//! locks. Terminal input has no key-up events, so the input loop presses
//! keys with a deadline and releases them on a timer; reads never consume
//! state.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

/// Number of half-rows.
pub const ROWS: usize = 8;
/// Keys per half-row.
pub const KEYS_PER_ROW: u8 = 5;

/// Shared keyboard matrix. Bits 0-4 of each row: 1 = pressed (internal
/// polarity; reads invert for the active-low port protocol).
pub struct Keyboard {
    rows: [AtomicU8; ROWS],
}

impl Keyboard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Default::default(),
        }
    }

    /// Press or release a key. `row` is 0-7 (A8..A15), `bit` is 0-4.
    pub fn set_key(&self, row: usize, bit: u8, pressed: bool) {
        if row >= ROWS || bit >= KEYS_PER_ROW {
            return;
        }
        let mask = 1 << bit;
        if pressed {
            self.rows[row].fetch_or(mask, Ordering::Relaxed);
        } else {
            self.rows[row].fetch_and(!mask, Ordering::Relaxed);
        }
    }

    /// Release every key.
    pub fn release_all(&self) {
        for row in &self.rows {
            row.store(0, Ordering::Relaxed);
        }
    }

    /// Read the matrix for a port $FE access.
    ///
    /// `addr_high` is the high byte of the port address; a cleared bit
    /// selects that half-row. Multiple selected rows combine active-low
    /// (bitwise AND of the individual row bytes). Undriven keys read 1.
    /// Returns bits 0-4; bits 5-7 are high.
    #[must_use]
    pub fn read(&self, addr_high: u8) -> u8 {
        let mut pressed: u8 = 0;
        for (i, row) in self.rows.iter().enumerate() {
            if addr_high & (1 << i) == 0 {
                pressed |= row.load(Ordering::Relaxed);
            }
        }
        (!pressed & 0x1F) | 0xE0
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

/// Press bookkeeping for terminal input.
///
/// Terminals deliver key-down events only, so each press is held in the
/// matrix until its deadline passes; repeats extend the deadline. The
/// latch lives on the input-polling thread and never blocks reads.
pub struct KeyLatch {
    deadlines: [[Option<Instant>; KEYS_PER_ROW as usize]; ROWS],
    hold: Duration,
}

impl KeyLatch {
    /// `hold` is how long a key stays pressed after its last event.
    #[must_use]
    pub fn new(hold: Duration) -> Self {
        Self {
            deadlines: [[None; KEYS_PER_ROW as usize]; ROWS],
            hold,
        }
    }

    /// Press a key now; it auto-releases after the hold interval.
    pub fn press(&mut self, keyboard: &Keyboard, row: usize, bit: u8) {
        if row >= ROWS || bit >= KEYS_PER_ROW {
            return;
        }
        keyboard.set_key(row, bit, true);
        self.deadlines[row][bit as usize] = Some(Instant::now() + self.hold);
    }

    /// Release keys whose deadline has passed.
    pub fn expire(&mut self, keyboard: &Keyboard) {
        let now = Instant::now();
        for (row, deadlines) in self.deadlines.iter_mut().enumerate() {
            for (bit, deadline) in deadlines.iter_mut().enumerate() {
                if deadline.is_some_and(|d| d <= now) {
                    *deadline = None;
                    keyboard.set_key(row, bit as u8, false);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_keys_reads_all_high() {
        let kbd = Keyboard::new();
        assert_eq!(kbd.read(0x00), 0xFF);
        assert_eq!(kbd.read(0xFE), 0xFF);
    }

    #[test]
    fn caps_shift_pulls_bit_0_low() {
        let kbd = Keyboard::new();
        kbd.set_key(0, 0, true);

        // Row 0 selected via A8 = 0.
        assert_eq!(kbd.read(0xFE), 0xFE);
        // Unselected scan does not see it.
        assert_eq!(kbd.read(0xFD), 0xFF);
    }

    #[test]
    fn multiple_rows_combine_active_low() {
        let kbd = Keyboard::new();
        kbd.set_key(0, 0, true); // Caps-Shift
        kbd.set_key(4, 1, true); // 9

        // Select rows 0 and 4: A8 = A12 = 0.
        let value = kbd.read(!0x11);
        assert_eq!(value & 0x1F, 0x1F & !0x03);
    }

    #[test]
    fn release_restores_high() {
        let kbd = Keyboard::new();
        kbd.set_key(1, 2, true);
        assert_eq!(kbd.read(0xFD) & 0x04, 0);
        kbd.set_key(1, 2, false);
        assert_eq!(kbd.read(0xFD) & 0x04, 0x04);
    }

    #[test]
    fn bits_5_to_7_always_high() {
        let kbd = Keyboard::new();
        kbd.set_key(0, 0, true);
        assert_eq!(kbd.read(0xFE) & 0xE0, 0xE0);
    }

    #[test]
    fn reads_do_not_consume_state() {
        let kbd = Keyboard::new();
        kbd.set_key(2, 3, true);
        for _ in 0..100 {
            assert_eq!(kbd.read(0xFB) & 0x08, 0);
        }
    }

    #[test]
    fn latch_expires_keys_on_a_timer() {
        let kbd = Keyboard::new();
        let mut latch = KeyLatch::new(Duration::from_millis(0));
        latch.press(&kbd, 0, 0);
        assert_eq!(kbd.read(0xFE) & 0x01, 0, "pressed until expiry runs");

        std::thread::sleep(Duration::from_millis(1));
        latch.expire(&kbd);
        assert_eq!(kbd.read(0xFE) & 0x01, 0x01, "released after deadline");
    }

    #[test]
    fn latch_repeat_extends_deadline() {
        let kbd = Keyboard::new();
        let mut latch = KeyLatch::new(Duration::from_secs(60));
        latch.press(&kbd, 1, 0);
        latch.expire(&kbd);
        assert_eq!(kbd.read(0xFD) & 0x01, 0, "far deadline keeps the key down");
    }
}
