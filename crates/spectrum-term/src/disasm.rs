//! Z80 disassembler.
//!
//! One canonical decoder per prefix family, driven by the standard octal
//! decomposition of the opcode byte (x = bits 7-6, y = bits 5-3,
//! z = bits 2-0) and shared operand tables. Used by the `-D` trace log.

#![allow(clippy::cast_possible_truncation)]

use std::fmt::Write as _;

/// Register names by 3-bit encoding.
const R8: [&str; 8] = ["B", "C", "D", "E", "H", "L", "(HL)", "A"];
/// Register pairs with SP.
const RP: [&str; 4] = ["BC", "DE", "HL", "SP"];
/// Register pairs with AF (PUSH/POP).
const RP2: [&str; 4] = ["BC", "DE", "HL", "AF"];
/// Condition codes.
const CC: [&str; 8] = ["NZ", "Z", "NC", "C", "PO", "PE", "P", "M"];
/// ALU operations (operand appended).
const ALU: [&str; 8] = [
    "ADD A,", "ADC A,", "SUB ", "SBC A,", "AND ", "XOR ", "OR ", "CP ",
];
/// CB rotate/shift operations.
const ROT: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "SLL", "SRL"];
/// Accumulator/flag operations for x=0, z=7.
const AF_OPS: [&str; 8] = ["RLCA", "RRCA", "RLA", "RRA", "DAA", "CPL", "SCF", "CCF"];
/// ED block operations, indexed by [y - 4][z].
const BLOCK: [[&str; 4]; 4] = [
    ["LDI", "CPI", "INI", "OUTI"],
    ["LDD", "CPD", "IND", "OUTD"],
    ["LDIR", "CPIR", "INIR", "OTIR"],
    ["LDDR", "CPDR", "INDR", "OTDR"],
];

/// A disassembled instruction.
#[derive(Debug, Clone)]
pub struct Disasm {
    /// Raw opcode bytes as hex (e.g. "DD 7E 05").
    pub bytes: String,
    /// Mnemonic with operands (e.g. "LD A,(IX+5)").
    pub mnemonic: String,
    /// Instruction length in bytes, prefixes and displacement included.
    pub len: u16,
}

/// Disassemble the instruction at `pc`, reading bytes through `peek`.
pub fn disassemble<F: Fn(u16) -> u8>(peek: F, pc: u16) -> Disasm {
    let mut decoder = Decoder { peek, pc };
    let mnemonic = decoder.decode_root();
    let len = decoder.pc.wrapping_sub(pc);

    let mut bytes = String::new();
    for i in 0..len {
        if i > 0 {
            bytes.push(' ');
        }
        let _ = write!(bytes, "{:02X}", (decoder.peek)(pc.wrapping_add(i)));
    }

    Disasm {
        bytes,
        mnemonic,
        len,
    }
}

struct Decoder<F> {
    peek: F,
    pc: u16,
}

impl<F: Fn(u16) -> u8> Decoder<F> {
    fn next(&mut self) -> u8 {
        let byte = (self.peek)(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    fn imm8(&mut self) -> String {
        format!("${:02X}", self.next())
    }

    fn imm16(&mut self) -> String {
        let lo = self.next();
        let hi = self.next();
        format!("${:04X}", u16::from_le_bytes([lo, hi]))
    }

    /// Relative branch target (resolved to an absolute address).
    fn rel_target(&mut self) -> String {
        let displacement = self.next() as i8;
        format!("${:04X}", self.pc.wrapping_add(displacement as u16))
    }

    /// "(IX+5)" / "(IX-3)", consuming the displacement byte.
    fn indexed_mem(&mut self, index: &str) -> String {
        let displacement = self.next() as i8;
        if displacement < 0 {
            format!("({index}-{})", -i16::from(displacement))
        } else {
            format!("({index}+{displacement})")
        }
    }

    /// Register operand name; with an index prefix, H and L become the
    /// index halves unless the instruction also addresses memory.
    fn reg8(&mut self, i: u8, index: Option<&str>, memory_form: bool) -> String {
        match (i, index) {
            (6, Some(name)) => self.indexed_mem(name),
            (4, Some(name)) if !memory_form => format!("{name}H"),
            (5, Some(name)) if !memory_form => format!("{name}L"),
            _ => R8[i as usize].to_string(),
        }
    }

    fn rp(i: u8, index: Option<&str>) -> String {
        match (i, index) {
            (2, Some(name)) => name.to_string(),
            _ => RP[i as usize].to_string(),
        }
    }

    fn decode_root(&mut self) -> String {
        let op = self.next();
        self.decode_main(op, None)
    }

    fn decode_index(&mut self, name: &str) -> String {
        let op = self.next();
        if op == 0xCB {
            self.decode_index_cb(name)
        } else {
            self.decode_main(op, Some(name))
        }
    }

    /// Unprefixed (and DD/FD-substituted) opcodes.
    fn decode_main(&mut self, op: u8, index: Option<&str>) -> String {
        if index.is_none() {
            match op {
                0xCB => return self.decode_cb(),
                0xED => return self.decode_ed(),
                0xDD => return self.decode_index("IX"),
                0xFD => return self.decode_index("IY"),
                _ => {}
            }
        } else if matches!(op, 0xDD | 0xED | 0xFD) {
            // A chained prefix would start a fresh instruction; show the
            // discarded prefix as the no-op it effectively is.
            return "NOP*".to_string();
        }

        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        let p = y >> 1;
        let q = y & 1;

        match (x, z) {
            (0, 0) => match y {
                0 => "NOP".to_string(),
                1 => "EX AF,AF'".to_string(),
                2 => format!("DJNZ {}", self.rel_target()),
                3 => format!("JR {}", self.rel_target()),
                _ => format!("JR {},{}", CC[(y - 4) as usize], self.rel_target()),
            },
            (0, 1) if q == 0 => {
                let value = self.imm16();
                format!("LD {},{value}", Self::rp(p, index))
            }
            (0, 1) => format!("ADD {},{}", Self::rp(2, index), Self::rp(p, index)),
            (0, 2) => {
                let hl = Self::rp(2, index);
                match (q, p) {
                    (0, 0) => "LD (BC),A".to_string(),
                    (0, 1) => "LD (DE),A".to_string(),
                    (0, 2) => format!("LD ({}),{hl}", self.imm16()),
                    (0, _) => format!("LD ({}),A", self.imm16()),
                    (_, 0) => "LD A,(BC)".to_string(),
                    (_, 1) => "LD A,(DE)".to_string(),
                    (_, 2) => format!("LD {hl},({})", self.imm16()),
                    (_, _) => format!("LD A,({})", self.imm16()),
                }
            }
            (0, 3) => {
                let verb = if q == 0 { "INC" } else { "DEC" };
                format!("{verb} {}", Self::rp(p, index))
            }
            (0, 4) => {
                let operand = self.reg8(y, index, false);
                format!("INC {operand}")
            }
            (0, 5) => {
                let operand = self.reg8(y, index, false);
                format!("DEC {operand}")
            }
            (0, 6) => {
                let dst = self.reg8(y, index, false);
                format!("LD {dst},{}", self.imm8())
            }
            (0, _) => AF_OPS[y as usize].to_string(),

            (1, 6) if y == 6 => "HALT".to_string(),
            (1, _) => {
                // When one side is memory, the register side keeps its
                // plain name even under a DD/FD prefix.
                let memory_form = y == 6 || z == 6;
                let dst = self.reg8(y, index, memory_form);
                let src = self.reg8(z, index, memory_form);
                format!("LD {dst},{src}")
            }

            (2, _) => {
                let operand = self.reg8(z, index, z == 6);
                format!("{}{operand}", ALU[y as usize])
            }

            (3, 0) => format!("RET {}", CC[y as usize]),
            (3, 1) if q == 0 => {
                let rp2 = if p == 2 {
                    index.unwrap_or("HL").to_string()
                } else {
                    RP2[p as usize].to_string()
                };
                format!("POP {rp2}")
            }
            (3, 1) => match p {
                0 => "RET".to_string(),
                1 => "EXX".to_string(),
                2 => format!("JP ({})", Self::rp(2, index)),
                _ => format!("LD SP,{}", Self::rp(2, index)),
            },
            (3, 2) => format!("JP {},{}", CC[y as usize], self.imm16()),
            (3, 3) => match y {
                0 => format!("JP {}", self.imm16()),
                2 => format!("OUT ({}),A", self.imm8()),
                3 => format!("IN A,({})", self.imm8()),
                4 => format!("EX (SP),{}", Self::rp(2, index)),
                5 => "EX DE,HL".to_string(),
                6 => "DI".to_string(),
                _ => "EI".to_string(),
            },
            (3, 4) => format!("CALL {},{}", CC[y as usize], self.imm16()),
            (3, 5) if q == 0 => {
                let rp2 = if p == 2 {
                    index.unwrap_or("HL").to_string()
                } else {
                    RP2[p as usize].to_string()
                };
                format!("PUSH {rp2}")
            }
            (3, 5) => format!("CALL {}", self.imm16()),
            (3, 6) => format!("{}{}", ALU[y as usize], self.imm8()),
            (3, _) => format!("RST ${:02X}", y * 8),

            _ => unreachable!("x is two bits"),
        }
    }

    fn decode_cb(&mut self) -> String {
        let op = self.next();
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        let operand = R8[z as usize];

        match x {
            0 => format!("{} {operand}", ROT[y as usize]),
            1 => format!("BIT {y},{operand}"),
            2 => format!("RES {y},{operand}"),
            _ => format!("SET {y},{operand}"),
        }
    }

    /// DD CB d op: the displacement precedes the inner opcode, and the
    /// register forms write both memory and the named register.
    fn decode_index_cb(&mut self, index: &str) -> String {
        let target = self.indexed_mem(index);
        let op = self.next();
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;

        let mut text = match x {
            0 => format!("{} {target}", ROT[y as usize]),
            1 => format!("BIT {y},{target}"),
            2 => format!("RES {y},{target}"),
            _ => format!("SET {y},{target}"),
        };
        if x != 1 && z != 6 {
            let _ = write!(text, ",{}", R8[z as usize]);
        }
        text
    }

    fn decode_ed(&mut self) -> String {
        let op = self.next();
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        let p = y >> 1;
        let q = y & 1;

        if x == 2 && z <= 3 && y >= 4 {
            return BLOCK[(y - 4) as usize][z as usize].to_string();
        }
        if x != 1 {
            return "NOP*".to_string();
        }

        match z {
            0 if y == 6 => "IN (C)".to_string(),
            0 => format!("IN {},(C)", R8[y as usize]),
            1 if y == 6 => "OUT (C),0".to_string(),
            1 => format!("OUT (C),{}", R8[y as usize]),
            2 => {
                let verb = if q == 0 { "SBC" } else { "ADC" };
                format!("{verb} HL,{}", RP[p as usize])
            }
            3 if q == 0 => format!("LD ({}),{}", self.imm16(), RP[p as usize]),
            3 => format!("LD {},({})", RP[p as usize], self.imm16()),
            4 => "NEG".to_string(),
            5 if y == 1 => "RETI".to_string(),
            5 => "RETN".to_string(),
            6 => format!("IM {}", [0, 0, 1, 2][(y & 3) as usize]),
            _ => match y {
                0 => "LD I,A".to_string(),
                1 => "LD R,A".to_string(),
                2 => "LD A,I".to_string(),
                3 => "LD A,R".to_string(),
                4 => "RRD".to_string(),
                5 => "RLD".to_string(),
                _ => "NOP*".to_string(),
            },
        }
    }
}
