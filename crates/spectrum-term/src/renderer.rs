//! Terminal frame rendering.
//!
//! The 256x192 Spectrum frame is downsampled into terminal cells: 2x2
//! pixels per Unicode quadrant character (128x96 cells) or 2x4 pixels per
//! braille character (128x48 cells). Colour comes from the attribute cell
//! under the top-left pixel, emitted as plain SGR sequences: ink 30-37
//! (bright 90-97), paper 40-47.
//!
//! Frames render into a `String` and go out with a single write, inside
//! an alternate-screen session with the cursor hidden.

use std::fmt::Write as _;
use std::io::{self, Write as _};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, queue};

use sinclair_ula::{Attr, Frame, SCREEN_HEIGHT, SCREEN_WIDTH, ansi_ink, ansi_paper};

/// Quadrant characters indexed by pattern bits TL=1, TR=2, BL=4, BR=8.
const BLOCK_CHARS: [char; 16] = [
    ' ', '▘', '▝', '▀', '▖', '▌', '▞', '▛', '▗', '▚', '▐', '▜', '▄', '▙', '▟', '█',
];

/// Braille dot bit for each (dx, dy) position in the 2x4 cell:
/// dots 1-3 and 7 run down the left column, 4-6 and 8 down the right.
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40],
    [0x08, 0x10, 0x20, 0x80],
];

/// Terminal cell geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// 2x2 pixels per cell via Unicode quadrants (128x96).
    Block,
    /// 2x4 pixels per cell via braille patterns (128x48).
    Braille,
}

impl RenderMode {
    /// Pixels per cell, horizontally and vertically.
    #[must_use]
    pub const fn cell_size(self) -> (usize, usize) {
        match self {
            Self::Block => (2, 2),
            Self::Braille => (2, 4),
        }
    }

    /// Output grid dimensions in cells.
    #[must_use]
    pub const fn grid_size(self) -> (usize, usize) {
        let (cw, ch) = self.cell_size();
        (SCREEN_WIDTH / cw, SCREEN_HEIGHT / ch)
    }
}

/// Render a decoded frame to ANSI-coloured text.
///
/// `flash_phase` selects the inverted half of the FLASH cycle. Rows are
/// separated by `\r\n` (the terminal runs raw); the caller homes the
/// cursor first. A one-cell margin is painted in the border colour.
#[must_use]
pub fn render_frame(frame: &Frame, border: u8, mode: RenderMode, flash_phase: bool) -> String {
    let (cols, rows) = mode.grid_size();
    let (cw, ch) = mode.cell_size();
    // Two border columns per side, one border row top and bottom.
    let mut out = String::with_capacity((cols + 4) * (rows + 2) * 12);
    let border_sgr = format!("\x1b[0;{}m", ansi_paper(border));

    border_row(&mut out, &border_sgr, cols + 4);

    for row in 0..rows {
        let _ = write!(out, "{border_sgr}  ");
        let mut current: Option<(u8, u8)> = None;

        for col in 0..cols {
            let x = col * cw;
            let y = row * ch;

            let attr = frame.attr_at_pixel(x, y);
            let (ink, paper) = resolve_colours(attr, flash_phase);
            if current != Some((ink, paper)) {
                let _ = write!(out, "\x1b[{ink};{paper}m");
                current = Some((ink, paper));
            }

            out.push(cell_char(frame, x, y, mode));
        }

        let _ = write!(out, "{border_sgr}  \x1b[0m\r\n");
    }

    border_row(&mut out, &border_sgr, cols + 4);
    out
}

/// SGR ink/paper pair for an attribute, honouring FLASH inversion.
fn resolve_colours(attr: Attr, flash_phase: bool) -> (u8, u8) {
    let (ink, paper) = if attr.flash && flash_phase {
        (attr.paper, attr.ink)
    } else {
        (attr.ink, attr.paper)
    };
    (ansi_ink(ink, attr.bright), ansi_paper(paper))
}

/// The character for one terminal cell.
fn cell_char(frame: &Frame, x: usize, y: usize, mode: RenderMode) -> char {
    match mode {
        RenderMode::Block => {
            let mut pattern = 0usize;
            let quads: [(usize, usize); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];
            for (bit, (dx, dy)) in quads.into_iter().enumerate() {
                if frame.pixel(x + dx, y + dy) {
                    pattern |= 1 << bit;
                }
            }
            BLOCK_CHARS[pattern]
        }
        RenderMode::Braille => {
            let mut bits = 0u8;
            for dx in 0..2 {
                for dy in 0..4 {
                    if frame.pixel(x + dx, y + dy) {
                        bits |= BRAILLE_DOTS[dx][dy];
                    }
                }
            }
            char::from_u32(0x2800 + u32::from(bits)).unwrap_or(' ')
        }
    }
}

fn border_row(out: &mut String, border_sgr: &str, width: usize) {
    let _ = write!(out, "{border_sgr}");
    for _ in 0..width {
        out.push(' ');
    }
    let _ = write!(out, "\x1b[0m\r\n");
}

/// RAII wrapper for the terminal: raw mode + alternate screen + hidden
/// cursor on entry, everything restored on drop.
pub struct TerminalSession {
    out: io::Stdout,
}

impl TerminalSession {
    /// Switch the terminal into rendering mode.
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        Ok(Self { out })
    }

    /// Draw a rendered frame from the home position.
    pub fn draw(&mut self, text: &str) -> io::Result<()> {
        queue!(self.out, MoveTo(0, 0))?;
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = execute!(self.out, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sinclair_ula::{VRAM_SIZE, attr_offset, bitmap_offset};

    fn frame_with(pixels: &[(usize, usize)], attr_byte: u8) -> Frame {
        let mut vram = vec![0u8; VRAM_SIZE];
        for &(x, y) in pixels {
            vram[bitmap_offset(x, y)] |= 0x80 >> (x % 8);
        }
        for cy in 0..24 {
            for cx in 0..32 {
                vram[attr_offset(cx, cy)] = attr_byte;
            }
        }
        Frame::decode(&vram)
    }

    #[test]
    fn grid_sizes() {
        assert_eq!(RenderMode::Block.grid_size(), (128, 96));
        assert_eq!(RenderMode::Braille.grid_size(), (128, 48));
    }

    #[test]
    fn block_quadrant_packing() {
        // TL only -> ▘; all four -> █.
        let frame = frame_with(&[(0, 0)], 0x38); // white paper, black ink
        assert_eq!(cell_char(&frame, 0, 0, RenderMode::Block), '▘');

        let frame = frame_with(&[(0, 0), (1, 0), (0, 1), (1, 1)], 0x38);
        assert_eq!(cell_char(&frame, 0, 0, RenderMode::Block), '█');

        let frame = frame_with(&[(1, 0), (0, 1)], 0x38);
        assert_eq!(cell_char(&frame, 0, 0, RenderMode::Block), '▞');
    }

    #[test]
    fn braille_dot_packing() {
        // Top-left pixel is dot 1 (U+2801).
        let frame = frame_with(&[(0, 0)], 0x38);
        assert_eq!(cell_char(&frame, 0, 0, RenderMode::Braille), '\u{2801}');

        // Bottom-left is dot 7 (bit 6), bottom-right dot 8 (bit 7).
        let frame = frame_with(&[(0, 3)], 0x38);
        assert_eq!(cell_char(&frame, 0, 0, RenderMode::Braille), '\u{2840}');
        let frame = frame_with(&[(1, 3)], 0x38);
        assert_eq!(cell_char(&frame, 0, 0, RenderMode::Braille), '\u{2880}');

        // Right column top is dot 4 (bit 3).
        let frame = frame_with(&[(1, 0)], 0x38);
        assert_eq!(cell_char(&frame, 0, 0, RenderMode::Braille), '\u{2808}');
    }

    #[test]
    fn frame_text_carries_sgr_colours() {
        // Blue ink (ANSI 34) on red paper (ANSI 41): attr paper=2, ink=1.
        let frame = frame_with(&[(0, 0)], (2 << 3) | 1);
        let text = render_frame(&frame, 0, RenderMode::Block, false);
        assert!(text.contains("\x1b[34;41m"));
        assert!(text.ends_with("\x1b[0m\r\n"));
    }

    #[test]
    fn flash_phase_swaps_ink_and_paper() {
        let attr = Attr {
            ink: 1,
            paper: 2,
            bright: false,
            flash: true,
        };
        assert_eq!(resolve_colours(attr, false), (34, 41));
        assert_eq!(resolve_colours(attr, true), (31, 44));
    }

    #[test]
    fn border_colour_paints_margin() {
        let frame = frame_with(&[], 0x00);
        let text = render_frame(&frame, 2, RenderMode::Braille, false);
        // Border 2 = red = ANSI paper 41.
        assert!(text.starts_with("\x1b[0;41m"));
    }
}
