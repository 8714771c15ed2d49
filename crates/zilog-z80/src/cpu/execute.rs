//! Unprefixed instruction execution.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::alu;
use crate::bus::Bus;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, sz53p};
use crate::tables::{CYCLES_CB, CYCLES_ED};

use super::{Index, Z80};

impl Z80 {
    /// Execute an unprefixed opcode. The baseline cycle cost has already
    /// been charged by the caller; handlers add taken-branch surcharges.
    pub(super) fn execute_root<B: Bus>(&mut self, bus: &mut B, op: u8) {
        match op {
            // NOP
            0x00 => {}

            // LD rr, nn (01=BC, 11=DE, 21=HL, 31=SP)
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.fetch_word(bus);
                self.set_rp((op >> 4) & 3, value);
            }

            // LD (BC), A
            0x02 => {
                let addr = self.regs.bc();
                bus.write_mem(addr, self.regs.a);
                self.regs.wz =
                    (u16::from(self.regs.a) << 8) | (addr.wrapping_add(1) & 0xFF);
            }

            // INC rr (03=BC, 13=DE, 23=HL, 33=SP)
            0x03 | 0x13 | 0x23 | 0x33 => {
                let rp = (op >> 4) & 3;
                let value = self.get_rp(rp).wrapping_add(1);
                self.set_rp(rp, value);
            }

            // INC r (04=B, 0C=C, 14=D, 1C=E, 24=H, 2C=L, 3C=A)
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x3C => {
                let r = (op >> 3) & 7;
                let result = alu::inc8(self.get_reg8(r));
                self.set_reg8(r, result.value);
                self.set_f((self.regs.f & CF) | result.flags);
            }

            // DEC r (05=B, 0D=C, 15=D, 1D=E, 25=H, 2D=L, 3D=A)
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x3D => {
                let r = (op >> 3) & 7;
                let result = alu::dec8(self.get_reg8(r));
                self.set_reg8(r, result.value);
                self.set_f((self.regs.f & CF) | result.flags);
            }

            // LD r, n (06=B, 0E=C, 16=D, 1E=E, 26=H, 2E=L, 3E=A)
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x3E => {
                let value = self.fetch(bus);
                self.set_reg8((op >> 3) & 7, value);
            }

            // RLCA
            0x07 => {
                let carry = self.regs.a >> 7;
                self.regs.a = self.regs.a.rotate_left(1);
                self.set_f(
                    (self.regs.f & (SF | ZF | PF))
                        | (self.regs.a & (YF | XF))
                        | if carry != 0 { CF } else { 0 },
                );
            }

            // EX AF, AF'
            0x08 => {
                core::mem::swap(&mut self.regs.a, &mut self.regs.a_alt);
                core::mem::swap(&mut self.regs.f, &mut self.regs.f_alt);
            }

            // ADD HL, rr (09=BC, 19=DE, 29=HL, 39=SP)
            0x09 | 0x19 | 0x29 | 0x39 => {
                let hl = self.regs.hl();
                let rr = self.get_rp((op >> 4) & 3);
                self.regs.wz = hl.wrapping_add(1);
                let (result, flags) = alu::add16(hl, rr);
                self.regs.set_hl(result);
                self.set_f((self.regs.f & (SF | ZF | PF)) | flags);
            }

            // LD A, (BC)
            0x0A => {
                let addr = self.regs.bc();
                self.regs.a = bus.read_mem(addr);
                self.regs.wz = addr.wrapping_add(1);
            }

            // DEC rr (0B=BC, 1B=DE, 2B=HL, 3B=SP)
            0x0B | 0x1B | 0x2B | 0x3B => {
                let rp = (op >> 4) & 3;
                let value = self.get_rp(rp).wrapping_sub(1);
                self.set_rp(rp, value);
            }

            // RRCA
            0x0F => {
                let carry = self.regs.a & 1;
                self.regs.a = self.regs.a.rotate_right(1);
                self.set_f(
                    (self.regs.f & (SF | ZF | PF))
                        | (self.regs.a & (YF | XF))
                        | if carry != 0 { CF } else { 0 },
                );
            }

            // DJNZ e
            0x10 => {
                let displacement = self.fetch(bus) as i8;
                self.regs.b = self.regs.b.wrapping_sub(1);
                if self.regs.b != 0 {
                    self.cycles += 5;
                    self.regs.pc = self.regs.pc.wrapping_add(displacement as u16);
                    self.regs.wz = self.regs.pc;
                }
            }

            // LD (DE), A
            0x12 => {
                let addr = self.regs.de();
                bus.write_mem(addr, self.regs.a);
                self.regs.wz =
                    (u16::from(self.regs.a) << 8) | (addr.wrapping_add(1) & 0xFF);
            }

            // RLA
            0x17 => {
                let old_carry = self.regs.f & CF;
                let new_carry = self.regs.a >> 7;
                self.regs.a = (self.regs.a << 1) | old_carry;
                self.set_f(
                    (self.regs.f & (SF | ZF | PF))
                        | (self.regs.a & (YF | XF))
                        | if new_carry != 0 { CF } else { 0 },
                );
            }

            // JR e
            0x18 => {
                let displacement = self.fetch(bus) as i8;
                self.regs.pc = self.regs.pc.wrapping_add(displacement as u16);
                self.regs.wz = self.regs.pc;
            }

            // LD A, (DE)
            0x1A => {
                let addr = self.regs.de();
                self.regs.a = bus.read_mem(addr);
                self.regs.wz = addr.wrapping_add(1);
            }

            // RRA
            0x1F => {
                let old_carry = (self.regs.f & CF) << 7;
                let new_carry = self.regs.a & 1;
                self.regs.a = (self.regs.a >> 1) | old_carry;
                self.set_f(
                    (self.regs.f & (SF | ZF | PF))
                        | (self.regs.a & (YF | XF))
                        | if new_carry != 0 { CF } else { 0 },
                );
            }

            // JR cc, e (20=NZ, 28=Z, 30=NC, 38=C)
            0x20 | 0x28 | 0x30 | 0x38 => {
                let displacement = self.fetch(bus) as i8;
                // cc encodings 4-7 map onto the low four conditions
                if self.condition((op >> 3) & 3) {
                    self.cycles += 5;
                    self.regs.pc = self.regs.pc.wrapping_add(displacement as u16);
                    self.regs.wz = self.regs.pc;
                }
            }

            // LD (nn), HL
            0x22 => {
                let addr = self.fetch_word(bus);
                let hl = self.regs.hl();
                self.write_word(bus, addr, hl);
                self.regs.wz = addr.wrapping_add(1);
            }

            // DAA
            0x27 => self.daa(),

            // LD HL, (nn)
            0x2A => {
                let addr = self.fetch_word(bus);
                let value = self.read_word(bus, addr);
                self.regs.set_hl(value);
                self.regs.wz = addr.wrapping_add(1);
            }

            // CPL
            0x2F => {
                self.regs.a = !self.regs.a;
                self.set_f(
                    (self.regs.f & (SF | ZF | PF | CF)) | HF | NF | (self.regs.a & (YF | XF)),
                );
            }

            // LD (nn), A
            0x32 => {
                let addr = self.fetch_word(bus);
                bus.write_mem(addr, self.regs.a);
                self.regs.wz =
                    (u16::from(self.regs.a) << 8) | (addr.wrapping_add(1) & 0xFF);
            }

            // INC (HL)
            0x34 => {
                let addr = self.regs.hl();
                let result = alu::inc8(bus.read_mem(addr));
                bus.write_mem(addr, result.value);
                self.set_f((self.regs.f & CF) | result.flags);
            }

            // DEC (HL)
            0x35 => {
                let addr = self.regs.hl();
                let result = alu::dec8(bus.read_mem(addr));
                bus.write_mem(addr, result.value);
                self.set_f((self.regs.f & CF) | result.flags);
            }

            // LD (HL), n
            0x36 => {
                let value = self.fetch(bus);
                bus.write_mem(self.regs.hl(), value);
            }

            // SCF
            0x37 => {
                self.set_f(
                    (self.regs.f & (SF | ZF | PF)) | CF | (self.regs.a & (YF | XF)),
                );
            }

            // LD A, (nn)
            0x3A => {
                let addr = self.fetch_word(bus);
                self.regs.a = bus.read_mem(addr);
                self.regs.wz = addr.wrapping_add(1);
            }

            // CCF
            0x3F => {
                let old_carry = self.regs.f & CF;
                self.set_f(
                    (self.regs.f & (SF | ZF | PF))
                        | (self.regs.a & (YF | XF))
                        | if old_carry != 0 { HF } else { CF },
                );
            }

            // HALT
            0x76 => {
                // Park PC on the HALT opcode; leave_halt() re-advances it
                // when an interrupt wakes the CPU.
                self.regs.pc = self.regs.pc.wrapping_sub(1);
                self.regs.halted = true;
            }

            // LD r, r' (40-7F except 76=HALT)
            0x40..=0x7F => {
                let src = op & 7;
                let dst = (op >> 3) & 7;
                if src == 6 {
                    // LD r, (HL)
                    let value = bus.read_mem(self.regs.hl());
                    self.set_reg8(dst, value);
                } else if dst == 6 {
                    // LD (HL), r
                    bus.write_mem(self.regs.hl(), self.get_reg8(src));
                } else {
                    let value = self.get_reg8(src);
                    self.set_reg8(dst, value);
                }
            }

            // ALU A, r / (HL) (80-BF)
            0x80..=0xBF => {
                let r = op & 7;
                let value = if r == 6 {
                    bus.read_mem(self.regs.hl())
                } else {
                    self.get_reg8(r)
                };
                self.alu_a(op, value);
            }

            // RET cc (C0=NZ, C8=Z, D0=NC, D8=C, E0=PO, E8=PE, F0=P, F8=M)
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                if self.condition((op >> 3) & 7) {
                    self.cycles += 6;
                    self.regs.pc = self.pop_word(bus);
                    self.regs.wz = self.regs.pc;
                }
            }

            // POP rr (C1=BC, D1=DE, E1=HL, F1=AF)
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let value = self.pop_word(bus);
                self.set_rp_af((op >> 4) & 3, value);
            }

            // JP cc, nn: WZ is updated whether the jump is taken or not
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let addr = self.fetch_word(bus);
                self.regs.wz = addr;
                if self.condition((op >> 3) & 7) {
                    self.regs.pc = addr;
                }
            }

            // JP nn
            0xC3 => {
                let addr = self.fetch_word(bus);
                self.regs.wz = addr;
                self.regs.pc = addr;
            }

            // CALL cc, nn
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let target = self.fetch_word(bus);
                self.regs.wz = target;
                if self.condition((op >> 3) & 7) {
                    self.cycles += 7;
                    let ret_addr = self.regs.pc;
                    self.push_word(bus, ret_addr);
                    self.regs.pc = target;
                }
            }

            // PUSH rr (C5=BC, D5=DE, E5=HL, F5=AF)
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                let value = self.get_rp_af((op >> 4) & 3);
                self.push_word(bus, value);
            }

            // ALU A, n (C6=ADD, CE=ADC, D6=SUB, DE=SBC, E6=AND, EE=XOR, F6=OR, FE=CP)
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let value = self.fetch(bus);
                self.alu_a(op, value);
            }

            // RST n (C7=00, CF=08, D7=10, DF=18, E7=20, EF=28, F7=30, FF=38)
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                let target = u16::from(op & 0x38);
                self.regs.wz = target;
                let ret_addr = self.regs.pc;
                self.push_word(bus, ret_addr);
                self.regs.pc = target;
            }

            // RET
            0xC9 => {
                self.regs.pc = self.pop_word(bus);
                self.regs.wz = self.regs.pc;
            }

            // CB prefix
            0xCB => {
                let op2 = self.fetch_opcode(bus);
                self.cycles += u64::from(CYCLES_CB[op2 as usize]);
                self.execute_cb(bus, op2);
            }

            // CALL nn
            0xCD => {
                let target = self.fetch_word(bus);
                self.regs.wz = target;
                let ret_addr = self.regs.pc;
                self.push_word(bus, ret_addr);
                self.regs.pc = target;
            }

            // OUT (n), A
            0xD3 => {
                let n = self.fetch(bus);
                let port = (u16::from(self.regs.a) << 8) | u16::from(n);
                self.regs.wz =
                    (u16::from(self.regs.a) << 8) | u16::from(n.wrapping_add(1));
                bus.write_io(port, self.regs.a);
            }

            // EXX
            0xD9 => {
                core::mem::swap(&mut self.regs.b, &mut self.regs.b_alt);
                core::mem::swap(&mut self.regs.c, &mut self.regs.c_alt);
                core::mem::swap(&mut self.regs.d, &mut self.regs.d_alt);
                core::mem::swap(&mut self.regs.e, &mut self.regs.e_alt);
                core::mem::swap(&mut self.regs.h, &mut self.regs.h_alt);
                core::mem::swap(&mut self.regs.l, &mut self.regs.l_alt);
            }

            // IN A, (n)
            0xDB => {
                let n = self.fetch(bus);
                let port = (u16::from(self.regs.a) << 8) | u16::from(n);
                self.regs.wz = port.wrapping_add(1);
                self.regs.a = bus.read_io(port);
            }

            // DD prefix (IX)
            0xDD => self.execute_index(bus, Index::Ix),

            // EX (SP), HL
            0xE3 => {
                let sp = self.regs.sp;
                let value = self.read_word(bus, sp);
                let hl = self.regs.hl();
                self.write_word(bus, sp, hl);
                self.regs.set_hl(value);
                self.regs.wz = value;
            }

            // JP (HL): WZ is not touched
            0xE9 => {
                self.regs.pc = self.regs.hl();
            }

            // EX DE, HL
            0xEB => {
                core::mem::swap(&mut self.regs.d, &mut self.regs.h);
                core::mem::swap(&mut self.regs.e, &mut self.regs.l);
            }

            // ED prefix
            0xED => {
                let op2 = self.fetch_opcode(bus);
                self.cycles += u64::from(CYCLES_ED[op2 as usize]);
                self.execute_ed(bus, op2);
            }

            // DI
            0xF3 => {
                self.regs.iff1 = false;
                self.regs.iff2 = false;
            }

            // LD SP, HL
            0xF9 => {
                self.regs.sp = self.regs.hl();
            }

            // EI: interrupts stay blocked until the next instruction ends
            0xFB => {
                self.regs.iff1 = true;
                self.regs.iff2 = true;
                self.iff_delay = 1;
            }

            // FD prefix (IY)
            0xFD => self.execute_index(bus, Index::Iy),

            _ => unreachable!("all 256 root opcodes are covered"),
        }
    }

    /// Perform ALU operation on the A register, selected by bits 5-3.
    pub(super) fn alu_a(&mut self, op: u8, value: u8) {
        let carry = self.regs.f & CF != 0;
        let result = match (op >> 3) & 7 {
            0 => alu::add8(self.regs.a, value, false),
            1 => alu::add8(self.regs.a, value, carry),
            2 => alu::sub8(self.regs.a, value, false),
            3 => alu::sub8(self.regs.a, value, carry),
            4 => alu::and8(self.regs.a, value),
            5 => alu::xor8(self.regs.a, value),
            6 => alu::or8(self.regs.a, value),
            _ => alu::cp8(self.regs.a, value),
        };
        self.regs.a = result.value;
        self.set_f(result.flags);
    }

    /// Decimal adjust A after an addition or subtraction.
    fn daa(&mut self) {
        let a = self.regs.a;
        let nf = self.regs.f & NF != 0;
        let cf = self.regs.f & CF != 0;
        let hf = self.regs.f & HF != 0;

        let mut correction: u8 = 0;
        let mut new_cf = cf;

        if hf || (a & 0x0F) > 9 {
            correction |= 0x06;
        }
        if cf || a > 0x99 {
            correction |= 0x60;
            new_cf = true;
        }

        let result = if nf {
            a.wrapping_sub(correction)
        } else {
            a.wrapping_add(correction)
        };

        let new_hf = if nf {
            hf && (a & 0x0F) < 6
        } else {
            (a & 0x0F) > 9
        };

        self.regs.a = result;
        self.set_f(
            sz53p(result)
                | if nf { NF } else { 0 }
                | if new_cf { CF } else { 0 }
                | if new_hf { HF } else { 0 },
        );
    }
}
