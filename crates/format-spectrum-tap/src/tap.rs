//! TAP container parsing.

use thiserror::Error;

/// TAP container errors.
#[derive(Debug, Error)]
pub enum TapError {
    #[error("TAP data ends in the middle of a length word at offset {offset}")]
    TruncatedLength { offset: usize },

    #[error(
        "TAP block at offset {offset} is {len} bytes; even an empty block \
         carries a flag and a checksum"
    )]
    BlockTooShort { offset: usize, len: usize },

    #[error("TAP block at offset {offset} claims {need} bytes but only {have} follow")]
    TruncatedBlock {
        offset: usize,
        need: usize,
        have: usize,
    },
}

/// A single block, exactly as stored on tape (flag, payload, checksum).
///
/// The whole stored byte sequence goes out over the EAR line, checksum
/// included, so the block keeps it intact rather than splitting fields.
#[derive(Debug, Clone)]
pub struct TapBlock {
    /// Flag byte, payload and checksum.
    pub bytes: Vec<u8>,
}

impl TapBlock {
    /// Flag byte: $00 = header, $FF = data.
    #[must_use]
    pub fn flag(&self) -> u8 {
        self.bytes.first().copied().unwrap_or(0)
    }

    /// Payload without the flag and checksum bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        if self.bytes.len() < 2 {
            return &[];
        }
        &self.bytes[1..self.bytes.len() - 1]
    }

    /// Whether the stored checksum matches the XOR of flag and payload.
    #[must_use]
    pub fn checksum_ok(&self) -> bool {
        match self.bytes.split_last() {
            Some((&checksum, rest)) => rest.iter().fold(0, |acc, &b| acc ^ b) == checksum,
            None => false,
        }
    }
}

/// A parsed TAP file containing sequential blocks.
#[derive(Debug, Clone, Default)]
pub struct TapFile {
    /// The blocks in the TAP file, in order.
    pub blocks: Vec<TapBlock>,
}

impl TapFile {
    /// Parse a TAP file from raw bytes.
    ///
    /// A checksum mismatch is reported as a warning but does not fail the
    /// parse: the ROM loader does its own verification, and tape rips with
    /// deliberately bad checksums exist in the wild.
    ///
    /// # Errors
    ///
    /// Returns an error if a block is truncated or its length is below the
    /// two-byte minimum.
    pub fn parse(data: &[u8]) -> Result<Self, TapError> {
        let mut blocks = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            if offset + 2 > data.len() {
                return Err(TapError::TruncatedLength { offset });
            }

            let len = usize::from(u16::from_le_bytes([data[offset], data[offset + 1]]));
            let block_offset = offset;
            offset += 2;

            if len < 2 {
                return Err(TapError::BlockTooShort {
                    offset: block_offset,
                    len,
                });
            }
            if offset + len > data.len() {
                return Err(TapError::TruncatedBlock {
                    offset: block_offset,
                    need: len,
                    have: data.len() - offset,
                });
            }

            let block = TapBlock {
                bytes: data[offset..offset + len].to_vec(),
            };
            if !block.checksum_ok() {
                log::warn!(
                    "TAP block {} at offset {block_offset} has a bad checksum",
                    blocks.len()
                );
            }
            blocks.push(block);
            offset += len;
        }

        Ok(Self { blocks })
    }
}
