//! Pixel grid → character cells, per render mode.
//!
//! Each mode maps a fixed block of source pixels onto one terminal cell,
//! trading visual resolution for fewer, cheaper cells.

use crate::compositor::TextOverlay;
use crate::fb::{Cell, CellColor, CellStyle, FrameBuffer};
use crate::types::{Pixel, PixelGrid, Rgb};

const UPPER_HALF: char = '▀';
const ASCII_RAMP: &[u8] = b" .:-=+*#%@";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    /// 1×2 pixels per cell, 24-bit color, upper-half-block glyph.
    #[default]
    HalfBlock,
    /// 1×2 pixels per cell, xterm-256 palette.
    Indexed,
    /// 2×2 pixels averaged into one background-colored cell.
    Block,
    /// 2×4 pixels averaged into a luminance glyph.
    Ascii,
}

impl RenderMode {
    pub const ALL: [RenderMode; 4] = [
        RenderMode::HalfBlock,
        RenderMode::Indexed,
        RenderMode::Block,
        RenderMode::Ascii,
    ];

    /// Source pixels (columns, rows) covered by one cell.
    pub fn cell_pixels(self) -> (u16, u16) {
        match self {
            RenderMode::HalfBlock | RenderMode::Indexed => (1, 2),
            RenderMode::Block => (2, 2),
            RenderMode::Ascii => (2, 4),
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            RenderMode::HalfBlock => RenderMode::Indexed,
            RenderMode::Indexed => RenderMode::Block,
            RenderMode::Block => RenderMode::Ascii,
            RenderMode::Ascii => RenderMode::HalfBlock,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RenderMode::HalfBlock => "halfblock",
            RenderMode::Indexed => "indexed",
            RenderMode::Block => "block",
            RenderMode::Ascii => "ascii",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.to_ascii_lowercase();
        Self::ALL.into_iter().find(|m| m.name() == s)
    }

    /// Cell dimensions for a pixel grid of `pw`×`ph`.
    pub fn frame_size(self, pw: u16, ph: u16) -> (u16, u16) {
        let (cw, ch) = self.cell_pixels();
        (pw.div_ceil(cw), ph.div_ceil(ch))
    }

    /// Pixel dimensions that exactly fill a `cols`×`rows` terminal area.
    pub fn pixel_size(self, cols: u16, rows: u16) -> (u16, u16) {
        let (cw, ch) = self.cell_pixels();
        (cols.saturating_mul(cw), rows.saturating_mul(ch))
    }
}

/// Rasterize `grid` into `fb` (resized to fit) and stamp `overlays` on top.
/// Transparent pixels show `background`.
pub fn encode_pixels(
    grid: &PixelGrid,
    overlays: &[TextOverlay],
    mode: RenderMode,
    background: Rgb,
    fb: &mut FrameBuffer,
) {
    let (cols, rows) = mode.frame_size(grid.width(), grid.height());
    fb.resize(cols, rows);
    let (cw, ch) = mode.cell_pixels();
    let px = |x: u16, y: u16| -> Rgb { grid.get(x, y).flatten().unwrap_or(background) };

    for cy in 0..rows {
        for cx in 0..cols {
            let cell = match mode {
                RenderMode::HalfBlock => {
                    let top = px(cx, cy * 2);
                    let bottom = px(cx, cy * 2 + 1);
                    half_block(top.into(), bottom.into())
                }
                RenderMode::Indexed => {
                    let top = CellColor::Indexed(rgb_to_ansi256(px(cx, cy * 2)));
                    let bottom = CellColor::Indexed(rgb_to_ansi256(px(cx, cy * 2 + 1)));
                    half_block(top, bottom)
                }
                RenderMode::Block => {
                    let avg = average(grid, cx * cw, cy * ch, cw, ch, background);
                    CellStyle::colors(avg, avg).into_cell(' ')
                }
                RenderMode::Ascii => {
                    let avg = average(grid, cx * cw, cy * ch, cw, ch, background);
                    let idx = avg.luma() as usize * ASCII_RAMP.len() / 256;
                    let glyph = ASCII_RAMP[idx] as char;
                    if glyph == ' ' {
                        CellStyle::colors(background, background).into_cell(' ')
                    } else {
                        CellStyle::colors(avg, background).into_cell(glyph)
                    }
                }
            };
            fb.set(cx, cy, cell);
        }
    }

    for overlay in overlays {
        stamp_overlay(fb, overlay, mode);
    }
}

/// Identical halves collapse to a space so equal colors always produce the
/// same cell regardless of glyph.
fn half_block(top: CellColor, bottom: CellColor) -> Cell {
    if top == bottom {
        CellStyle::colors(top, top).into_cell(' ')
    } else {
        CellStyle::colors(top, bottom).into_cell(UPPER_HALF)
    }
}

fn average(grid: &PixelGrid, x0: u16, y0: u16, w: u16, h: u16, background: Rgb) -> Rgb {
    let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);
    let n = (w as u32) * (h as u32);
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            let p: Pixel = grid.get(x, y).flatten();
            let c = p.unwrap_or(background);
            r += c.r as u32;
            g += c.g as u32;
            b += c.b as u32;
        }
    }
    Rgb::new((r / n) as u8, (g / n) as u8, (b / n) as u8)
}

fn stamp_overlay(fb: &mut FrameBuffer, overlay: &TextOverlay, mode: RenderMode) {
    let (cw, ch) = mode.cell_pixels();
    if overlay.y < 0 {
        return;
    }
    let row = overlay.y / ch as i32;
    if row >= fb.height() as i32 {
        return;
    }
    let text: Vec<char> = overlay
        .text
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .collect();
    let anchor = overlay.x.div_euclid(cw as i32);
    let start = if overlay.centered {
        anchor - text.len() as i32 / 2
    } else {
        anchor
    };
    for (i, c) in text.into_iter().enumerate() {
        let col = start + i as i32;
        if col < 0 || col >= fb.width() as i32 {
            continue;
        }
        let (x, y) = (col as u16, row as u16);
        let under = fb.get(x, y).unwrap_or_default();
        let bg = overlay.bg.map(CellColor::from).unwrap_or(under.style.bg);
        let style = CellStyle {
            fg: overlay.fg.into(),
            bg,
            bold: true,
            dim: false,
        };
        fb.put_char(x, y, c, style);
    }
}

/// Nearest xterm-256 palette index.
pub fn rgb_to_ansi256(c: Rgb) -> u8 {
    if c.r == c.g && c.g == c.b {
        if c.r < 8 {
            return 16;
        }
        if c.r > 248 {
            return 231;
        }
        return 232 + ((c.r as u16 - 8) * 24 / 247) as u8;
    }
    let q = |v: u8| ((v as u16 * 5 + 127) / 255) as u8;
    16 + 36 * q(c.r) + 6 * q(c.g) + q(c.b)
}
