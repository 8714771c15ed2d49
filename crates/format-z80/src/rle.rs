//! The .Z80 run-length codec.
//!
//! Escape sequence: `ED ED count value` = `value` repeated `count` times.
//! A lone ED byte passes through literally; the decoder only triggers on
//! the doubled form. Version 1 snapshots end with the `00 ED ED 00`
//! marker, which must terminate decoding rather than expand.

/// Decompress RLE data into `dst`, stopping when either side runs out.
///
/// With `v1_end_marker`, the four-byte `00 ED ED 00` sequence terminates
/// the stream without being expanded.
pub fn decompress(src: &[u8], dst: &mut [u8], v1_end_marker: bool) {
    let mut si = 0;
    let mut di = 0;

    while si < src.len() && di < dst.len() {
        if v1_end_marker && src[si..].starts_with(&[0x00, 0xED, 0xED, 0x00]) {
            return;
        }
        if si + 3 < src.len() && src[si] == 0xED && src[si + 1] == 0xED {
            let count = usize::from(src[si + 2]);
            let value = src[si + 3];
            let run = count.min(dst.len() - di);
            dst[di..di + run].fill(value);
            di += run;
            si += 4;
        } else {
            dst[di] = src[si];
            di += 1;
            si += 1;
        }
    }
}

/// Compress a byte string with the .Z80 RLE rules.
///
/// Runs of five or more bytes are escaped, as are runs of two or more ED
/// bytes (a pair of literal EDs would otherwise read back as an escape).
/// Runs longer than 255 split into multiple escapes.
#[must_use]
pub fn compress(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < src.len() {
        let byte = src[i];
        let mut run = 1;
        while i + run < src.len() && src[i + run] == byte && run < 255 {
            run += 1;
        }

        let escape = if byte == 0xED { run >= 2 } else { run >= 5 };
        if escape {
            out.extend_from_slice(&[0xED, 0xED, run as u8, byte]);
        } else if byte == 0xED {
            // A single ED: emit it and the following byte literally so the
            // pair can never form an accidental escape.
            out.push(byte);
            if i + 1 < src.len() {
                out.push(src[i + 1]);
                i += 1;
            }
            i += 1;
            continue;
        } else {
            out.resize(out.len() + run, byte);
        }
        i += run;
    }

    out
}
