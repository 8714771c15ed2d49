//! CB-prefixed instruction execution (rotates, shifts, bit operations).

use crate::alu::{self, AluResult};
use crate::bus::Bus;
use crate::flags::{CF, HF, PF, SF, XF, YF, ZF};

use super::Z80;

impl Z80 {
    /// Execute a CB-prefixed opcode.
    ///
    /// Layout: bits 7-6 select the group (00 rotate/shift, 01 BIT, 10 RES,
    /// 11 SET), bits 5-3 the sub-operation or bit number, bits 2-0 the
    /// register (6 = (HL)).
    pub(super) fn execute_cb<B: Bus>(&mut self, bus: &mut B, op: u8) {
        let r = op & 7;
        let n = (op >> 3) & 7;

        match op >> 6 {
            // Rotate / shift
            0 => {
                if r == 6 {
                    let addr = self.regs.hl();
                    let result = self.rotate_shift(n, bus.read_mem(addr));
                    bus.write_mem(addr, result.value);
                    self.set_f(result.flags);
                } else {
                    let result = self.rotate_shift(n, self.get_reg8(r));
                    self.set_reg8(r, result.value);
                    self.set_f(result.flags);
                }
            }

            // BIT n, r / (HL)
            1 => {
                if r == 6 {
                    let value = bus.read_mem(self.regs.hl());
                    // X/Y leak from the internal memory pointer, not the operand
                    let xy = (self.regs.wz >> 8) as u8;
                    self.bit_test(n, value, xy);
                } else {
                    let value = self.get_reg8(r);
                    self.bit_test(n, value, value);
                }
            }

            // RES n, r / (HL)
            2 => {
                if r == 6 {
                    let addr = self.regs.hl();
                    let value = bus.read_mem(addr) & !(1 << n);
                    bus.write_mem(addr, value);
                } else {
                    let value = self.get_reg8(r) & !(1 << n);
                    self.set_reg8(r, value);
                }
            }

            // SET n, r / (HL)
            _ => {
                if r == 6 {
                    let addr = self.regs.hl();
                    let value = bus.read_mem(addr) | (1 << n);
                    bus.write_mem(addr, value);
                } else {
                    let value = self.get_reg8(r) | (1 << n);
                    self.set_reg8(r, value);
                }
            }
        }
    }

    /// Apply the rotate/shift selected by bits 5-3 of a CB opcode.
    pub(super) fn rotate_shift(&self, selector: u8, value: u8) -> AluResult {
        let carry = self.regs.f & CF != 0;
        match selector {
            0 => alu::rlc8(value),
            1 => alu::rrc8(value),
            2 => alu::rl8(value, carry),
            3 => alu::rr8(value, carry),
            4 => alu::sla8(value),
            5 => alu::sra8(value),
            6 => alu::sll8(value),
            _ => alu::srl8(value),
        }
    }

    /// BIT n: Z and P/V report the complement of the tested bit, H is set,
    /// S only for a set bit 7. X/Y come from `xy_source` (the operand for
    /// register forms, the high byte of WZ / the effective address for
    /// memory forms).
    pub(super) fn bit_test(&mut self, n: u8, value: u8, xy_source: u8) {
        let tested = value & (1 << n);
        let mut flags = (self.regs.f & CF) | HF | (xy_source & (YF | XF));
        if tested == 0 {
            flags |= ZF | PF;
        }
        if n == 7 && tested != 0 {
            flags |= SF;
        }
        self.set_f(flags);
    }
}
