//! ED-prefixed instruction execution (I/O, 16-bit arithmetic with carry,
//! block transfers, interrupt control).

#![allow(clippy::cast_possible_truncation)]

use crate::alu;
use crate::bus::Bus;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, parity, sz53, sz53p};

use super::Z80;

impl Z80 {
    /// Execute an ED-prefixed opcode. Holes in the ED map are NOPs
    /// (8 cycles, already charged by the table).
    pub(super) fn execute_ed<B: Bus>(&mut self, bus: &mut B, op: u8) {
        match op {
            // IN r, (C); ED 70 only sets flags, the value is discarded
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => {
                let bc = self.regs.bc();
                let value = bus.read_io(bc);
                self.regs.wz = bc.wrapping_add(1);
                if op != 0x70 {
                    self.set_reg8((op >> 3) & 7, value);
                }
                self.set_f((self.regs.f & CF) | sz53p(value));
            }

            // OUT (C), r; ED 71 outputs zero
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => {
                let bc = self.regs.bc();
                let value = if op == 0x71 { 0 } else { self.get_reg8((op >> 3) & 7) };
                self.regs.wz = bc.wrapping_add(1);
                bus.write_io(bc, value);
            }

            // SBC HL, rr (42=BC, 52=DE, 62=HL, 72=SP)
            0x42 | 0x52 | 0x62 | 0x72 => {
                let hl = self.regs.hl();
                let rr = self.get_rp((op >> 4) & 3);
                self.regs.wz = hl.wrapping_add(1);
                let (result, flags) = alu::sbc16(hl, rr, self.regs.f & CF != 0);
                self.regs.set_hl(result);
                self.set_f(flags);
            }

            // ADC HL, rr (4A=BC, 5A=DE, 6A=HL, 7A=SP)
            0x4A | 0x5A | 0x6A | 0x7A => {
                let hl = self.regs.hl();
                let rr = self.get_rp((op >> 4) & 3);
                self.regs.wz = hl.wrapping_add(1);
                let (result, flags) = alu::adc16(hl, rr, self.regs.f & CF != 0);
                self.regs.set_hl(result);
                self.set_f(flags);
            }

            // LD (nn), rr (43=BC, 53=DE, 63=HL, 73=SP)
            0x43 | 0x53 | 0x63 | 0x73 => {
                let addr = self.fetch_word(bus);
                let value = self.get_rp((op >> 4) & 3);
                self.write_word(bus, addr, value);
                self.regs.wz = addr.wrapping_add(1);
            }

            // LD rr, (nn) (4B=BC, 5B=DE, 6B=HL, 7B=SP)
            0x4B | 0x5B | 0x6B | 0x7B => {
                let addr = self.fetch_word(bus);
                let value = self.read_word(bus, addr);
                self.set_rp((op >> 4) & 3, value);
                self.regs.wz = addr.wrapping_add(1);
            }

            // NEG (44 and its mirrors)
            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => {
                let result = alu::sub8(0, self.regs.a, false);
                self.regs.a = result.value;
                self.set_f(result.flags);
            }

            // RETN / RETI (45, 4D and their mirrors): restore IFF1 from IFF2
            0x45 | 0x4D | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => {
                self.regs.iff1 = self.regs.iff2;
                self.regs.pc = self.pop_word(bus);
                self.regs.wz = self.regs.pc;
            }

            // IM 0/1/2 (46, 4E, 56, 5E and mirrors)
            0x46 | 0x4E | 0x56 | 0x5E | 0x66 | 0x6E | 0x76 | 0x7E => {
                self.regs.im = match (op >> 3) & 3 {
                    2 => 1,
                    3 => 2,
                    _ => 0,
                };
            }

            // LD I, A
            0x47 => {
                self.regs.i = self.regs.a;
            }

            // LD R, A: the only way to write R bit 7
            0x4F => {
                self.regs.r = self.regs.a;
            }

            // LD A, I (P/V reports IFF2)
            0x57 => {
                self.regs.a = self.regs.i;
                self.set_f(
                    (self.regs.f & CF)
                        | sz53(self.regs.a)
                        | if self.regs.iff2 { PF } else { 0 },
                );
            }

            // LD A, R (P/V reports IFF2)
            0x5F => {
                self.regs.a = self.regs.r;
                self.set_f(
                    (self.regs.f & CF)
                        | sz53(self.regs.a)
                        | if self.regs.iff2 { PF } else { 0 },
                );
            }

            // RRD: (HL) low nibble -> A low; A low -> (HL) high; (HL) high -> (HL) low
            0x67 => {
                let addr = self.regs.hl();
                let m = bus.read_mem(addr);
                let a = self.regs.a;
                bus.write_mem(addr, (a << 4) | (m >> 4));
                self.regs.a = (a & 0xF0) | (m & 0x0F);
                self.regs.wz = addr.wrapping_add(1);
                self.set_f((self.regs.f & CF) | sz53p(self.regs.a));
            }

            // RLD: (HL) high nibble -> A low; (HL) low -> (HL) high; A low -> (HL) low
            0x6F => {
                let addr = self.regs.hl();
                let m = bus.read_mem(addr);
                let a = self.regs.a;
                bus.write_mem(addr, (m << 4) | (a & 0x0F));
                self.regs.a = (a & 0xF0) | (m >> 4);
                self.regs.wz = addr.wrapping_add(1);
                self.set_f((self.regs.f & CF) | sz53p(self.regs.a));
            }

            // Block transfer / search / I/O
            0xA0 => self.ldx(bus, 1, false),
            0xA8 => self.ldx(bus, 0xFFFF, false),
            0xB0 => self.ldx(bus, 1, true),
            0xB8 => self.ldx(bus, 0xFFFF, true),
            0xA1 => self.cpx(bus, 1, false),
            0xA9 => self.cpx(bus, 0xFFFF, false),
            0xB1 => self.cpx(bus, 1, true),
            0xB9 => self.cpx(bus, 0xFFFF, true),
            0xA2 => self.inx(bus, 1, false),
            0xAA => self.inx(bus, 0xFFFF, false),
            0xB2 => self.inx(bus, 1, true),
            0xBA => self.inx(bus, 0xFFFF, true),
            0xA3 => self.outx(bus, 1, false),
            0xAB => self.outx(bus, 0xFFFF, false),
            0xB3 => self.outx(bus, 1, true),
            0xBB => self.outx(bus, 0xFFFF, true),

            // Every other ED opcode is a NOP
            _ => {}
        }
    }

    /// LDI/LDD/LDIR/LDDR. `step` is 1 or -1 (as u16), `repeat` selects the
    /// R-suffixed looping forms.
    fn ldx<B: Bus>(&mut self, bus: &mut B, step: u16, repeat: bool) {
        let hl = self.regs.hl();
        let de = self.regs.de();
        let value = bus.read_mem(hl);
        bus.write_mem(de, value);
        self.regs.set_hl(hl.wrapping_add(step));
        self.regs.set_de(de.wrapping_add(step));
        let bc = self.regs.bc().wrapping_sub(1);
        self.regs.set_bc(bc);

        // X/Y leak bits 3 and 1 of (value + A)
        let n = value.wrapping_add(self.regs.a);
        let mut flags = self.regs.f & (SF | ZF | CF);
        flags |= n & XF;
        if n & 0x02 != 0 {
            flags |= YF;
        }
        if bc != 0 {
            flags |= PF;
        }
        self.set_f(flags);

        if repeat && bc != 0 {
            self.repeat_block();
        }
    }

    /// CPI/CPD/CPIR/CPDR.
    fn cpx<B: Bus>(&mut self, bus: &mut B, step: u16, repeat: bool) {
        let hl = self.regs.hl();
        let value = bus.read_mem(hl);
        self.regs.set_hl(hl.wrapping_add(step));
        self.regs.wz = self.regs.wz.wrapping_add(step);
        let bc = self.regs.bc().wrapping_sub(1);
        self.regs.set_bc(bc);

        let result = self.regs.a.wrapping_sub(value);
        let half_borrow = (self.regs.a & 0x0F) < (value & 0x0F);

        let mut flags = (self.regs.f & CF) | NF;
        if result & 0x80 != 0 {
            flags |= SF;
        }
        if result == 0 {
            flags |= ZF;
        }
        if half_borrow {
            flags |= HF;
        }
        if bc != 0 {
            flags |= PF;
        }
        // X/Y from (result - half_borrow)
        let n = result.wrapping_sub(u8::from(half_borrow));
        flags |= n & XF;
        if n & 0x02 != 0 {
            flags |= YF;
        }
        self.set_f(flags);

        if repeat && bc != 0 && result != 0 {
            self.repeat_block();
        }
    }

    /// INI/IND/INIR/INDR.
    fn inx<B: Bus>(&mut self, bus: &mut B, step: u16, repeat: bool) {
        let bc = self.regs.bc();
        let value = bus.read_io(bc);
        self.regs.wz = bc.wrapping_add(step);
        self.regs.b = self.regs.b.wrapping_sub(1);
        let hl = self.regs.hl();
        bus.write_mem(hl, value);
        self.regs.set_hl(hl.wrapping_add(step));

        let k = u16::from(value) + u16::from(self.regs.c.wrapping_add(step as u8));
        self.set_io_block_flags(value, k);

        if repeat && self.regs.b != 0 {
            self.repeat_block();
        }
    }

    /// OUTI/OUTD/OTIR/OTDR.
    fn outx<B: Bus>(&mut self, bus: &mut B, step: u16, repeat: bool) {
        let hl = self.regs.hl();
        let value = bus.read_mem(hl);
        self.regs.set_hl(hl.wrapping_add(step));
        self.regs.b = self.regs.b.wrapping_sub(1);
        let bc = self.regs.bc();
        bus.write_io(bc, value);
        self.regs.wz = bc.wrapping_add(step);

        let k = u16::from(value) + u16::from(self.regs.l);
        self.set_io_block_flags(value, k);

        if repeat && self.regs.b != 0 {
            self.repeat_block();
        }
    }

    /// Flags shared by the I/O block instructions: S/Z/X/Y from B,
    /// N from bit 7 of the transferred byte, H and C from the 9-bit
    /// intermediate `k`, P from parity((k & 7) ^ B).
    fn set_io_block_flags(&mut self, value: u8, k: u16) {
        let b = self.regs.b;
        let mut flags = sz53(b);
        if value & 0x80 != 0 {
            flags |= NF;
        }
        if k > 0xFF {
            flags |= HF | CF;
        }
        if parity((k as u8 & 0x07) ^ b) {
            flags |= PF;
        }
        self.set_f(flags);
    }

    /// Rewind PC over the ED-prefixed instruction for another iteration.
    fn repeat_block(&mut self) {
        self.cycles += 5;
        self.regs.pc = self.regs.pc.wrapping_sub(2);
        self.regs.wz = self.regs.pc.wrapping_add(1);
    }
}
