//! DD/FD-prefixed instruction execution (IX/IY) and the DDCB/FDCB family.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::alu;
use crate::bus::Bus;
use crate::flags::{CF, PF, SF, ZF};
use crate::tables::{CYCLES, CYCLES_DD};

use super::{Index, Z80};

impl Z80 {
    /// Execute after a DD (IX) or FD (IY) prefix.
    ///
    /// Opcodes with a zero entry in the DD table do not involve HL and the
    /// prefix is ignored: the refresh increment for the prefix byte is
    /// backed out (net R increment of 1) and the opcode runs unprefixed.
    pub(super) fn execute_index<B: Bus>(&mut self, bus: &mut B, idx: Index) {
        let op = self.fetch_opcode(bus);

        if op == 0xCB {
            self.execute_index_cb(bus, idx);
            return;
        }

        let cost = CYCLES_DD[op as usize];
        if cost == 0 {
            self.dec_r();
            self.cycles += u64::from(CYCLES[op as usize]);
            self.execute_root(bus, op);
            return;
        }
        self.cycles += u64::from(cost);

        match op {
            // ADD IX, rr (09=BC, 19=DE, 29=IX, 39=SP)
            0x09 | 0x19 | 0x29 | 0x39 => {
                let ix = self.get_index(idx);
                let rr = self.get_rp_idx((op >> 4) & 3, idx);
                self.regs.wz = ix.wrapping_add(1);
                let (result, flags) = alu::add16(ix, rr);
                self.set_index(idx, result);
                self.set_f((self.regs.f & (SF | ZF | PF)) | flags);
            }

            // LD IX, nn
            0x21 => {
                let value = self.fetch_word(bus);
                self.set_index(idx, value);
            }

            // LD (nn), IX
            0x22 => {
                let addr = self.fetch_word(bus);
                let value = self.get_index(idx);
                self.write_word(bus, addr, value);
                self.regs.wz = addr.wrapping_add(1);
            }

            // INC IX / DEC IX
            0x23 => {
                let value = self.get_index(idx).wrapping_add(1);
                self.set_index(idx, value);
            }
            0x2B => {
                let value = self.get_index(idx).wrapping_sub(1);
                self.set_index(idx, value);
            }

            // INC/DEC IXH, IXL (24/25/2C/2D)
            0x24 | 0x2C => {
                let r = (op >> 3) & 7;
                let result = alu::inc8(self.get_reg8_idx(r, idx));
                self.set_reg8_idx(r, idx, result.value);
                self.set_f((self.regs.f & CF) | result.flags);
            }
            0x25 | 0x2D => {
                let r = (op >> 3) & 7;
                let result = alu::dec8(self.get_reg8_idx(r, idx));
                self.set_reg8_idx(r, idx, result.value);
                self.set_f((self.regs.f & CF) | result.flags);
            }

            // LD IXH, n / LD IXL, n
            0x26 | 0x2E => {
                let value = self.fetch(bus);
                self.set_reg8_idx((op >> 3) & 7, idx, value);
            }

            // LD IX, (nn)
            0x2A => {
                let addr = self.fetch_word(bus);
                let value = self.read_word(bus, addr);
                self.set_index(idx, value);
                self.regs.wz = addr.wrapping_add(1);
            }

            // INC (IX+d)
            0x34 => {
                let addr = self.index_ea(bus, idx);
                let result = alu::inc8(bus.read_mem(addr));
                bus.write_mem(addr, result.value);
                self.set_f((self.regs.f & CF) | result.flags);
            }

            // DEC (IX+d)
            0x35 => {
                let addr = self.index_ea(bus, idx);
                let result = alu::dec8(bus.read_mem(addr));
                bus.write_mem(addr, result.value);
                self.set_f((self.regs.f & CF) | result.flags);
            }

            // LD (IX+d), n: displacement comes before the immediate
            0x36 => {
                let addr = self.index_ea(bus, idx);
                let value = self.fetch(bus);
                bus.write_mem(addr, value);
            }

            // LD r, (IX+d): destination is a plain register, H/L included
            0x46 | 0x4E | 0x56 | 0x5E | 0x66 | 0x6E | 0x7E => {
                let addr = self.index_ea(bus, idx);
                let value = bus.read_mem(addr);
                self.set_reg8((op >> 3) & 7, value);
            }

            // LD (IX+d), r: source is a plain register, H/L included
            0x70..=0x77 => {
                let addr = self.index_ea(bus, idx);
                bus.write_mem(addr, self.get_reg8(op & 7));
            }

            // LD r, r' with H/L replaced by IXH/IXL (register-only forms)
            0x40..=0x7F => {
                let value = self.get_reg8_idx(op & 7, idx);
                self.set_reg8_idx((op >> 3) & 7, idx, value);
            }

            // ALU A, (IX+d)
            0x86 | 0x8E | 0x96 | 0x9E | 0xA6 | 0xAE | 0xB6 | 0xBE => {
                let addr = self.index_ea(bus, idx);
                let value = bus.read_mem(addr);
                self.alu_a(op, value);
            }

            // ALU A, IXH/IXL
            0x80..=0xBF => {
                let value = self.get_reg8_idx(op & 7, idx);
                self.alu_a(op, value);
            }

            // POP IX
            0xE1 => {
                let value = self.pop_word(bus);
                self.set_index(idx, value);
            }

            // EX (SP), IX
            0xE3 => {
                let sp = self.regs.sp;
                let value = self.read_word(bus, sp);
                let ix = self.get_index(idx);
                self.write_word(bus, sp, ix);
                self.set_index(idx, value);
                self.regs.wz = value;
            }

            // PUSH IX
            0xE5 => {
                let value = self.get_index(idx);
                self.push_word(bus, value);
            }

            // JP (IX): WZ is not touched
            0xE9 => {
                self.regs.pc = self.get_index(idx);
            }

            // LD SP, IX
            0xF9 => {
                self.regs.sp = self.get_index(idx);
            }

            _ => unreachable!("nonzero DD table entries are all dispatched"),
        }
    }

    /// Execute a DDCB/FDCB opcode: `DD CB d op`.
    ///
    /// The displacement and inner opcode are operand reads, so R advances
    /// only for the two prefix fetches. Every non-BIT operation writes the
    /// result back to memory, and additionally into the register named by
    /// bits 2-0 unless that encoding is 6.
    fn execute_index_cb<B: Bus>(&mut self, bus: &mut B, idx: Index) {
        let displacement = self.fetch(bus) as i8;
        let op = self.fetch(bus);
        let addr = self.get_index(idx).wrapping_add(displacement as u16);
        self.regs.wz = addr;

        let r = op & 7;
        let n = (op >> 3) & 7;
        let value = bus.read_mem(addr);

        match op >> 6 {
            // BIT n, (IX+d): X/Y from the high byte of the effective address
            1 => {
                self.cycles += 20;
                self.bit_test(n, value, (addr >> 8) as u8);
                return;
            }
            0 => {
                self.cycles += 23;
                let result = self.rotate_shift(n, value);
                bus.write_mem(addr, result.value);
                self.set_f(result.flags);
                if r != 6 {
                    self.set_reg8(r, result.value);
                }
            }
            2 => {
                self.cycles += 23;
                let result = value & !(1 << n);
                bus.write_mem(addr, result);
                if r != 6 {
                    self.set_reg8(r, result);
                }
            }
            _ => {
                self.cycles += 23;
                let result = value | (1 << n);
                bus.write_mem(addr, result);
                if r != 6 {
                    self.set_reg8(r, result);
                }
            }
        }
    }

    /// Read the displacement byte and form the effective address IX/IY+d.
    /// WZ tracks the effective address.
    fn index_ea(&mut self, bus: &mut impl Bus, idx: Index) -> u16 {
        let displacement = self.fetch(bus) as i8;
        let addr = self.get_index(idx).wrapping_add(displacement as u16);
        self.regs.wz = addr;
        addr
    }

    /// Register lookup with H/L replaced by the halves of IX/IY.
    fn get_reg8_idx(&self, r: u8, idx: Index) -> u8 {
        match r {
            4 => (self.get_index(idx) >> 8) as u8,
            5 => self.get_index(idx) as u8,
            _ => self.get_reg8(r),
        }
    }

    fn set_reg8_idx(&mut self, r: u8, idx: Index, value: u8) {
        match r {
            4 => {
                let ix = self.get_index(idx);
                self.set_index(idx, (ix & 0x00FF) | (u16::from(value) << 8));
            }
            5 => {
                let ix = self.get_index(idx);
                self.set_index(idx, (ix & 0xFF00) | u16::from(value));
            }
            _ => self.set_reg8(r, value),
        }
    }

    /// Register pair lookup with HL replaced by IX/IY (for ADD IX, rr).
    fn get_rp_idx(&self, rp: u8, idx: Index) -> u16 {
        if rp == 2 {
            self.get_index(idx)
        } else {
            self.get_rp(rp)
        }
    }
}
