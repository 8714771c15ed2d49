//! ZX Spectrum TAP tape images.
//!
//! TAP is the simplest Spectrum tape format: sequential blocks of data,
//! each preceded by a 2-byte little-endian length word. A block as stored
//! on tape is a flag byte ($00 = header, $FF = data), the payload, and an
//! XOR checksum of everything before it.
//!
//! [`TapFile`] parses the container; [`TapePlayer`] turns the blocks into
//! the EAR pulse stream the ROM loader decodes in real time.

mod player;
mod tap;

pub use player::{TapePlayer, timing};
pub use tap::{TapBlock, TapError, TapFile};
