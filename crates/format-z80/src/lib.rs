//! .Z80 snapshot parsing (v1, v2, v3 formats), 48K machines only.
//!
//! **Version 1** (offset 6-7 PC != 0): 30-byte header + one memory block
//! covering $4000-$FFFF, optionally RLE-compressed and terminated by the
//! `00 ED ED 00` end marker.
//!
//! **Version 2/3** (offset 6-7 PC = 0): 30-byte base header + extended
//! header (23 bytes for v2, 54 or 55 for v3) + page-based memory blocks.
//! For 48K snapshots the pages map 0 -> ROM, 8 -> $4000, 4 -> $8000,
//! 5 -> $C000.
//!
//! The RLE escape is `ED ED count value`. The encoder half lives here too
//! so the codec can be exercised as a round trip.

mod rle;

pub use rle::{compress, decompress};

use thiserror::Error;

/// Size of the fixed base header.
const BASE_HEADER_SIZE: usize = 30;

/// 48K RAM image size ($4000-$FFFF).
const RAM_SIZE: usize = 0xC000;

/// One memory page (16 KiB).
const PAGE_SIZE: usize = 0x4000;

/// Snapshot parse errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("not a .z80 snapshot: {got} bytes is smaller than the {need}-byte header")]
    TooShort { need: usize, got: usize },

    #[error("extended header runs past the end of the file (wants {need} bytes)")]
    TruncatedHeader { need: usize },

    #[error("memory block for page {page} runs past the end of the file")]
    TruncatedBlock { page: u8 },

    #[error("hardware mode {mode} is not a 48K machine")]
    Unsupported { mode: u8 },
}

/// CPU and machine state restored from a snapshot.
///
/// Plain data: the machine crate applies it to its own CPU and memory.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub a_alt: u8,
    pub f_alt: u8,
    pub b_alt: u8,
    pub c_alt: u8,
    pub d_alt: u8,
    pub e_alt: u8,
    pub h_alt: u8,
    pub l_alt: u8,
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    /// Full 8 bits; bit 7 comes from flags byte 1 bit 0.
    pub r: u8,
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    pub border: u8,
    /// RAM image for $4000-$FFFF.
    pub ram: Vec<u8>,
    /// ROM image from a v2/v3 page 0 block, if the snapshot carried one.
    pub rom: Option<Vec<u8>>,
}

impl Snapshot {
    /// Parse a .Z80 snapshot, auto-detecting the format version.
    ///
    /// # Errors
    ///
    /// Fails on truncated data, truncated memory blocks, or a hardware
    /// mode other than the 48K family.
    pub fn parse(data: &[u8]) -> Result<Self, SnapshotError> {
        if data.len() < BASE_HEADER_SIZE {
            return Err(SnapshotError::TooShort {
                need: BASE_HEADER_SIZE,
                got: data.len(),
            });
        }

        let pc = u16::from_le_bytes([data[6], data[7]]);
        if pc != 0 {
            Self::parse_v1(data, pc)
        } else {
            Self::parse_v2v3(data)
        }
    }

    /// Decode the 30-byte base header shared by all versions.
    fn from_base_header(data: &[u8]) -> Self {
        // A flags byte of 255 is historical for "compressed v1"; normalise
        // it to 1 as the format specification requires.
        let flags1 = if data[12] == 255 { 1 } else { data[12] };

        Self {
            a: data[0],
            f: data[1],
            c: data[2],
            b: data[3],
            l: data[4],
            h: data[5],
            // PC at offsets 6-7 is version-dependent; the caller fills it in.
            pc: 0,
            sp: u16::from_le_bytes([data[8], data[9]]),
            i: data[10],
            r: (data[11] & 0x7F) | ((flags1 & 0x01) << 7),
            e: data[13],
            d: data[14],
            c_alt: data[15],
            b_alt: data[16],
            e_alt: data[17],
            d_alt: data[18],
            l_alt: data[19],
            h_alt: data[20],
            a_alt: data[21],
            f_alt: data[22],
            iy: u16::from_le_bytes([data[23], data[24]]),
            ix: u16::from_le_bytes([data[25], data[26]]),
            iff1: data[27] != 0,
            iff2: data[28] != 0,
            im: data[29] & 0x03,
            border: (flags1 >> 1) & 0x07,
            ram: vec![0; RAM_SIZE],
            rom: None,
        }
    }

    /// Version 1: one memory block for all of $4000-$FFFF.
    fn parse_v1(data: &[u8], pc: u16) -> Result<Self, SnapshotError> {
        let mut snapshot = Self::from_base_header(data);
        snapshot.pc = pc;

        let flags1 = if data[12] == 255 { 1 } else { data[12] };
        let compressed = flags1 & 0x20 != 0;
        let body = &data[BASE_HEADER_SIZE..];

        if compressed {
            decompress(body, &mut snapshot.ram, true);
        } else {
            let len = body.len().min(RAM_SIZE);
            snapshot.ram[..len].copy_from_slice(&body[..len]);
        }

        Ok(snapshot)
    }

    /// Version 2/3: extended header plus per-page memory blocks.
    fn parse_v2v3(data: &[u8]) -> Result<Self, SnapshotError> {
        if data.len() < BASE_HEADER_SIZE + 2 {
            return Err(SnapshotError::TooShort {
                need: BASE_HEADER_SIZE + 2,
                got: data.len(),
            });
        }

        let ext_len = usize::from(u16::from_le_bytes([data[30], data[31]]));
        let ext_start = BASE_HEADER_SIZE + 2;
        let ext_end = ext_start + ext_len;
        if data.len() < ext_end || ext_len < 4 {
            return Err(SnapshotError::TruncatedHeader { need: ext_end });
        }

        let mut snapshot = Self::from_base_header(data);
        snapshot.pc = u16::from_le_bytes([data[32], data[33]]);

        let hw_mode = data[34];
        if !is_48k_hardware(hw_mode, ext_len) {
            return Err(SnapshotError::Unsupported { mode: hw_mode });
        }

        // Memory blocks: 2-byte length, 1-byte page, then the data.
        // Length 0xFFFF marks a raw (uncompressed) 16 KiB page.
        let mut pos = ext_end;
        while pos + 3 <= data.len() {
            let block_len = u16::from_le_bytes([data[pos], data[pos + 1]]);
            let page = data[pos + 2];
            pos += 3;

            let (block, advance, compressed) = if block_len == 0xFFFF {
                if pos + PAGE_SIZE > data.len() {
                    return Err(SnapshotError::TruncatedBlock { page });
                }
                (&data[pos..pos + PAGE_SIZE], PAGE_SIZE, false)
            } else {
                let len = usize::from(block_len);
                if pos + len > data.len() {
                    return Err(SnapshotError::TruncatedBlock { page });
                }
                (&data[pos..pos + len], len, true)
            };

            let mut page_data = vec![0u8; PAGE_SIZE];
            if compressed {
                decompress(block, &mut page_data, false);
            } else {
                page_data.copy_from_slice(block);
            }

            // 48K page layout: 0 -> ROM, 8 -> $4000, 4 -> $8000, 5 -> $C000.
            match page {
                0 => snapshot.rom = Some(page_data),
                8 => snapshot.ram[0x0000..0x4000].copy_from_slice(&page_data),
                4 => snapshot.ram[0x4000..0x8000].copy_from_slice(&page_data),
                5 => snapshot.ram[0x8000..0xC000].copy_from_slice(&page_data),
                _ => {} // 128K-only pages are skipped
            }

            pos += advance;
        }

        Ok(snapshot)
    }
}

/// Is the hardware byte one of the 48K variants?
///
/// v2 (23-byte extension): 0 = 48K, 1 = 48K + Interface 1.
/// v3: additionally 3 = 48K + MGT.
fn is_48k_hardware(hw_mode: u8, ext_len: usize) -> bool {
    if ext_len == 23 {
        matches!(hw_mode, 0 | 1)
    } else {
        matches!(hw_mode, 0 | 1 | 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Base header with PC, SP and a recognisable register pattern.
    fn base_header(pc: u16) -> Vec<u8> {
        let mut h = vec![0u8; BASE_HEADER_SIZE];
        h[0] = 0xAA; // A
        h[1] = 0x55; // F
        h[2] = 0x34; // C
        h[3] = 0x12; // B
        h[4] = 0x78; // L
        h[5] = 0x56; // H
        h[6] = pc as u8;
        h[7] = (pc >> 8) as u8;
        h[8] = 0x00; // SP low
        h[9] = 0x80; // SP high
        h[10] = 0x3F; // I
        h[11] = 0x42; // R low 7 bits
        // Flags 1: R bit 7 = 1, border = 2, uncompressed
        h[12] = 0x01 | (2 << 1);
        h[23] = 0xCD; // IY low
        h[24] = 0xAB;
        h[25] = 0x21; // IX low
        h[26] = 0x43;
        h[27] = 1; // IFF1
        h[28] = 1; // IFF2
        h[29] = 1; // IM 1
        h
    }

    #[test]
    fn v1_uncompressed() {
        let mut data = base_header(0x8000);
        let mut ram = vec![0u8; RAM_SIZE];
        ram[0] = 0x11; // $4000
        ram[0x4000] = 0x22; // $8000
        ram[0x8000] = 0x33; // $C000
        data.extend_from_slice(&ram);

        let snapshot = Snapshot::parse(&data).expect("v1 should parse");

        assert_eq!(snapshot.pc, 0x8000);
        assert_eq!(snapshot.sp, 0x8000);
        assert_eq!(snapshot.a, 0xAA);
        assert_eq!(snapshot.f, 0x55);
        assert_eq!(snapshot.b, 0x12);
        assert_eq!(snapshot.c, 0x34);
        assert_eq!(snapshot.ix, 0x4321);
        assert_eq!(snapshot.iy, 0xABCD);
        assert_eq!(snapshot.r, 0xC2, "bit 7 from flags, low bits from R byte");
        assert_eq!(snapshot.border, 2);
        assert_eq!(snapshot.im, 1);
        assert!(snapshot.iff1);
        assert_eq!(snapshot.ram[0], 0x11);
        assert_eq!(snapshot.ram[0x4000], 0x22);
        assert_eq!(snapshot.ram[0x8000], 0x33);
    }

    #[test]
    fn v1_compressed_with_end_marker() {
        let mut data = base_header(0x0100);
        data[12] |= 0x20; // compressed

        // 10 x 0xAA, two literals, then the end marker.
        data.extend_from_slice(&[0xED, 0xED, 10, 0xAA]);
        data.extend_from_slice(&[0x55, 0x66]);
        data.extend_from_slice(&[0x00, 0xED, 0xED, 0x00]);

        let snapshot = Snapshot::parse(&data).expect("compressed v1 should parse");

        for i in 0..10 {
            assert_eq!(snapshot.ram[i], 0xAA);
        }
        assert_eq!(snapshot.ram[10], 0x55);
        assert_eq!(snapshot.ram[11], 0x66);
        assert_eq!(snapshot.ram[12], 0x00, "end marker is not expanded");
    }

    #[test]
    fn v2_pages() {
        let mut data = base_header(0x0000); // PC = 0 -> extended format
        data.extend_from_slice(&23u16.to_le_bytes());
        let mut ext = vec![0u8; 23];
        ext[0] = 0xCD; // real PC low
        ext[1] = 0xAB;
        ext[2] = 0; // hardware: 48K
        data.extend_from_slice(&ext);

        // Page 8 ($4000): compressed block with one marker byte.
        let mut page = vec![0u8; PAGE_SIZE];
        page[0] = 0x5A;
        let compressed = compress(&page);
        data.extend_from_slice(&(compressed.len() as u16).to_le_bytes());
        data.push(8);
        data.extend_from_slice(&compressed);

        // Page 4 ($8000): raw, marked with length 0xFFFF.
        let mut raw = vec![0u8; PAGE_SIZE];
        raw[1] = 0xA5;
        data.extend_from_slice(&0xFFFFu16.to_le_bytes());
        data.push(4);
        data.extend_from_slice(&raw);

        let snapshot = Snapshot::parse(&data).expect("v2 should parse");

        assert_eq!(snapshot.pc, 0xABCD);
        assert_eq!(snapshot.ram[0], 0x5A);
        assert_eq!(snapshot.ram[0x4001], 0xA5);
    }

    #[test]
    fn v2_rejects_128k() {
        let mut data = base_header(0x0000);
        data.extend_from_slice(&23u16.to_le_bytes());
        let mut ext = vec![0u8; 23];
        ext[2] = 3; // hardware: 128K
        data.extend_from_slice(&ext);

        match Snapshot::parse(&data) {
            Err(SnapshotError::Unsupported { mode: 3 }) => {}
            other => panic!("expected Unsupported, got {other:?}"),
        }
    }

    #[test]
    fn v3_detected_by_extension_length() {
        let mut data = base_header(0x0000);
        data.extend_from_slice(&54u16.to_le_bytes());
        let mut ext = vec![0u8; 54];
        ext[0] = 0x00;
        ext[1] = 0x60; // PC = 0x6000
        ext[2] = 3; // v3 mode 3 = 48K + MGT
        data.extend_from_slice(&ext);

        let snapshot = Snapshot::parse(&data).expect("v3 should parse");
        assert_eq!(snapshot.pc, 0x6000);
    }

    #[test]
    fn truncated_file_errors() {
        assert!(matches!(
            Snapshot::parse(&[0u8; 10]),
            Err(SnapshotError::TooShort { .. })
        ));
    }

    #[test]
    fn truncated_page_errors() {
        let mut data = base_header(0x0000);
        data.extend_from_slice(&23u16.to_le_bytes());
        let mut ext = vec![0u8; 23];
        ext[2] = 0;
        data.extend_from_slice(&ext);
        // Claim a 100-byte block but provide 3.
        data.extend_from_slice(&100u16.to_le_bytes());
        data.push(8);
        data.extend_from_slice(&[1, 2, 3]);

        assert!(matches!(
            Snapshot::parse(&data),
            Err(SnapshotError::TruncatedBlock { page: 8 })
        ));
    }
}
