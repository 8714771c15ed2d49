//! Per-opcode baseline cycle tables.
//!
//! Values are the unconditional T-state counts. Conditional instructions
//! list the not-taken cost; the execute handlers add the taken surcharge
//! (+5 JR cc/DJNZ, +6 RET cc, +7 CALL cc, +5 per block-repeat iteration).
//!
//! Prefix bytes (CB/ED/DD/FD) carry 0 in the root table; the prefixed
//! tables hold the complete instruction cost including the prefix fetch.

/// Unprefixed opcodes.
#[rustfmt::skip]
pub const CYCLES: [u8; 256] = [
    // x0 x1  x2  x3  x4  x5  x6  x7  x8  x9  xA  xB  xC  xD  xE  xF
     4, 10,  7,  6,  4,  4,  7,  4,  4, 11,  7,  6,  4,  4,  7,  4, // 0x
     8, 10,  7,  6,  4,  4,  7,  4, 12, 11,  7,  6,  4,  4,  7,  4, // 1x
     7, 10, 16,  6,  4,  4,  7,  4,  7, 11, 16,  6,  4,  4,  7,  4, // 2x
     7, 10, 13,  6, 11, 11, 10,  4,  7, 11, 13,  6,  4,  4,  7,  4, // 3x
     4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 4x
     4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 5x
     4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 6x
     7,  7,  7,  7,  7,  7,  4,  7,  4,  4,  4,  4,  4,  4,  7,  4, // 7x
     4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 8x
     4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // 9x
     4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // Ax
     4,  4,  4,  4,  4,  4,  7,  4,  4,  4,  4,  4,  4,  4,  7,  4, // Bx
     5, 10, 10, 10, 10, 11,  7, 11,  5, 10, 10,  0, 10, 17,  7, 11, // Cx
     5, 10, 10, 11, 10, 11,  7, 11,  5,  4, 10, 11, 10,  0,  7, 11, // Dx
     5, 10, 10, 19, 10, 11,  7, 11,  5,  4, 10,  4, 10,  0,  7, 11, // Ex
     5, 10, 10,  4, 10, 11,  7, 11,  5,  6, 10,  4, 10,  0,  7, 11, // Fx
];

/// ED-prefixed opcodes (complete cost including both fetches).
/// Holes in the ED map execute as 8-cycle NOPs.
#[rustfmt::skip]
pub const CYCLES_ED: [u8; 256] = [
    // x0 x1  x2  x3  x4  x5  x6  x7  x8  x9  xA  xB  xC  xD  xE  xF
     8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 0x
     8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 1x
     8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 2x
     8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 3x
    12, 12, 15, 20,  8, 14,  8,  9, 12, 12, 15, 20,  8, 14,  8,  9, // 4x
    12, 12, 15, 20,  8, 14,  8,  9, 12, 12, 15, 20,  8, 14,  8,  9, // 5x
    12, 12, 15, 20,  8, 14,  8, 18, 12, 12, 15, 20,  8, 14,  8, 18, // 6x
    12, 12, 15, 20,  8, 14,  8,  8, 12, 12, 15, 20,  8, 14,  8,  8, // 7x
     8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 8x
     8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // 9x
    16, 16, 16, 16,  8,  8,  8,  8, 16, 16, 16, 16,  8,  8,  8,  8, // Ax
    16, 16, 16, 16,  8,  8,  8,  8, 16, 16, 16, 16,  8,  8,  8,  8, // Bx
     8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // Cx
     8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // Dx
     8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // Ex
     8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8,  8, // Fx
];

/// DD/FD-prefixed opcodes (complete cost including the prefix fetch).
///
/// A zero entry means the opcode does not involve HL/H/L and falls through
/// to the unprefixed instruction (with the R increment for the discarded
/// prefix backed out). The table therefore doubles as the membership set
/// for index-register decoding. 0xCB (DDCB/FDCB) is dispatched before the
/// table is consulted.
#[rustfmt::skip]
pub const CYCLES_DD: [u8; 256] = [
    // x0 x1  x2  x3  x4  x5  x6  x7  x8  x9  xA  xB  xC  xD  xE  xF
     0,  0,  0,  0,  0,  0,  0,  0,  0, 15,  0,  0,  0,  0,  0,  0, // 0x
     0,  0,  0,  0,  0,  0,  0,  0,  0, 15,  0,  0,  0,  0,  0,  0, // 1x
     0, 14, 20, 10,  8,  8, 11,  0,  0, 15, 20, 10,  8,  8, 11,  0, // 2x
     0,  0,  0,  0, 23, 23, 19,  0,  0, 15,  0,  0,  0,  0,  0,  0, // 3x
     0,  0,  0,  0,  8,  8, 19,  0,  0,  0,  0,  0,  8,  8, 19,  0, // 4x
     0,  0,  0,  0,  8,  8, 19,  0,  0,  0,  0,  0,  8,  8, 19,  0, // 5x
     8,  8,  8,  8,  8,  8, 19,  8,  8,  8,  8,  8,  8,  8, 19,  8, // 6x
    19, 19, 19, 19, 19, 19,  0, 19,  0,  0,  0,  0,  8,  8, 19,  0, // 7x
     0,  0,  0,  0,  8,  8, 19,  0,  0,  0,  0,  0,  8,  8, 19,  0, // 8x
     0,  0,  0,  0,  8,  8, 19,  0,  0,  0,  0,  0,  8,  8, 19,  0, // 9x
     0,  0,  0,  0,  8,  8, 19,  0,  0,  0,  0,  0,  8,  8, 19,  0, // Ax
     0,  0,  0,  0,  8,  8, 19,  0,  0,  0,  0,  0,  8,  8, 19,  0, // Bx
     0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0, // Cx
     0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0,  0, // Dx
     0, 14,  0, 23,  0, 15,  0,  0,  0,  8,  0,  0,  0,  0,  0,  0, // Ex
     0,  0,  0,  0,  0,  0,  0,  0,  0, 10,  0,  0,  0,  0,  0,  0, // Fx
];

/// CB-prefixed opcodes (complete cost including both fetches):
/// 8 for register forms, 15 for (HL) forms, except BIT n,(HL) at 12.
pub const CYCLES_CB: [u8; 256] = build_cb_table();

const fn build_cb_table() -> [u8; 256] {
    let mut table = [8u8; 256];
    let mut op = 0usize;
    while op < 256 {
        if op & 0x07 == 0x06 {
            // (HL) column: BIT is read-only (12), the rest read-modify-write (15)
            table[op] = if matches!(op, 0x40..=0x7F) { 12 } else { 15 };
        }
        op += 1;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_table_spot_checks() {
        assert_eq!(CYCLES[0x00], 4); // NOP
        assert_eq!(CYCLES[0x01], 10); // LD BC,nn
        assert_eq!(CYCLES[0x76], 4); // HALT
        assert_eq!(CYCLES[0xC9], 10); // RET
        assert_eq!(CYCLES[0xCD], 17); // CALL nn
        assert_eq!(CYCLES[0xE3], 19); // EX (SP),HL
        assert_eq!(CYCLES[0xF9], 6); // LD SP,HL
        // Prefixes are accounted by the prefixed tables
        assert_eq!(CYCLES[0xCB], 0);
        assert_eq!(CYCLES[0xDD], 0);
        assert_eq!(CYCLES[0xED], 0);
        assert_eq!(CYCLES[0xFD], 0);
    }

    #[test]
    fn ed_table_spot_checks() {
        assert_eq!(CYCLES_ED[0x47], 9); // LD I,A
        assert_eq!(CYCLES_ED[0x4A], 15); // ADC HL,BC
        assert_eq!(CYCLES_ED[0x43], 20); // LD (nn),BC
        assert_eq!(CYCLES_ED[0x67], 18); // RRD
        assert_eq!(CYCLES_ED[0xA0], 16); // LDI
        assert_eq!(CYCLES_ED[0xB0], 16); // LDIR (not repeating)
        assert_eq!(CYCLES_ED[0x00], 8); // hole = NOP
    }

    #[test]
    fn dd_table_spot_checks() {
        assert_eq!(CYCLES_DD[0x21], 14); // LD IX,nn
        assert_eq!(CYCLES_DD[0x36], 19); // LD (IX+d),n
        assert_eq!(CYCLES_DD[0x34], 23); // INC (IX+d)
        assert_eq!(CYCLES_DD[0x7E], 19); // LD A,(IX+d)
        assert_eq!(CYCLES_DD[0xE9], 8); // JP (IX)
        assert_eq!(CYCLES_DD[0x00], 0); // NOP falls through
        assert_eq!(CYCLES_DD[0x41], 0); // LD B,C falls through
    }

    #[test]
    fn cb_table_shape() {
        assert_eq!(CYCLES_CB[0x00], 8); // RLC B
        assert_eq!(CYCLES_CB[0x06], 15); // RLC (HL)
        assert_eq!(CYCLES_CB[0x46], 12); // BIT 0,(HL)
        assert_eq!(CYCLES_CB[0xC6], 15); // SET 0,(HL)
        assert_eq!(CYCLES_CB[0x7F], 8); // BIT 7,A
    }
}
