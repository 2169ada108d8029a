//! Frame encoding and terminal output.
//!
//! `encode_diff_into` emits only changed cells, tracking the cursor and the
//! active colors so no escape sequence is sent twice. Every emitted chunk ends
//! with a single attribute reset.

use std::io::Write;

use anyhow::Result;

use crossterm::{
    cursor,
    style::{Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal, QueueableCommand,
};

use crate::compositor::Composition;
use crate::encoder::{encode_pixels, RenderMode};
use crate::fb::{Cell, CellColor, CellStyle, FrameBuffer};
use crate::types::Rgb;

/// Tracks what the terminal currently shows so redundant sequences are
/// skipped. `None` means unknown.
struct Emitter<'a> {
    out: &'a mut Vec<u8>,
    width: u16,
    cursor: Option<(u16, u16)>,
    fg: Option<CellColor>,
    bg: Option<CellColor>,
    attrs: Option<(bool, bool)>,
}

impl<'a> Emitter<'a> {
    fn new(out: &'a mut Vec<u8>, width: u16) -> Self {
        Self {
            out,
            width,
            cursor: None,
            fg: None,
            bg: None,
            attrs: None,
        }
    }

    fn move_to(&mut self, x: u16, y: u16) -> Result<()> {
        if self.cursor != Some((x, y)) {
            self.out.queue(cursor::MoveTo(x, y))?;
            self.cursor = Some((x, y));
        }
        Ok(())
    }

    fn style(&mut self, style: CellStyle) -> Result<()> {
        let attrs = (style.bold, style.dim);
        if self.attrs != Some(attrs) {
            // SGR 0 also drops both colors.
            self.out.queue(SetAttribute(Attribute::Reset))?;
            self.fg = None;
            self.bg = None;
            if style.bold {
                self.out.queue(SetAttribute(Attribute::Bold))?;
            }
            if style.dim {
                self.out.queue(SetAttribute(Attribute::Dim))?;
            }
            self.attrs = Some(attrs);
        }
        if self.fg != Some(style.fg) {
            self.out.queue(SetForegroundColor(to_color(style.fg)))?;
            self.fg = Some(style.fg);
        }
        if self.bg != Some(style.bg) {
            self.out.queue(SetBackgroundColor(to_color(style.bg)))?;
            self.bg = Some(style.bg);
        }
        Ok(())
    }

    fn cell(&mut self, x: u16, y: u16, cell: Cell) -> Result<()> {
        self.move_to(x, y)?;
        self.style(cell.style)?;
        self.out.queue(Print(cell.ch))?;
        // Past the last column the cursor position is terminal-specific.
        self.cursor = if x + 1 < self.width { Some((x + 1, y)) } else { None };
        Ok(())
    }

    fn finish(self) -> Result<()> {
        self.out.queue(SetAttribute(Attribute::Reset))?;
        Ok(())
    }
}

fn to_color(color: CellColor) -> Color {
    match color {
        CellColor::Rgb(Rgb { r, g, b }) => Color::Rgb { r, g, b },
        CellColor::Indexed(n) => Color::AnsiValue(n),
    }
}

/// Encode a full-frame redraw into `out`.
pub fn encode_full_into(fb: &FrameBuffer, out: &mut Vec<u8>) -> Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    let mut em = Emitter::new(out, fb.width());
    for y in 0..fb.height() {
        for x in 0..fb.width() {
            em.cell(x, y, fb.get(x, y).unwrap_or_default())?;
        }
    }
    em.finish()
}

/// Encode only the cells of `next` that differ from `prev`. Falls back to a
/// full redraw when the sizes differ.
pub fn encode_diff_into(prev: &FrameBuffer, next: &FrameBuffer, out: &mut Vec<u8>) -> Result<()> {
    if prev.width() != next.width() || prev.height() != next.height() {
        return encode_full_into(next, out);
    }
    let mut em = Emitter::new(out, next.width());
    for_each_changed_run(prev, next, |x, y, len| {
        for dx in 0..len {
            em.cell(x + dx, y, next.get(x + dx, y).unwrap_or_default())?;
        }
        Ok(())
    })?;
    em.finish()
}

/// Paint all of `fb` with its top-left corner at terminal cell `(x0, y0)`.
/// Nothing is cleared and no history is consulted.
pub fn encode_region_into(fb: &FrameBuffer, x0: u16, y0: u16, out: &mut Vec<u8>) -> Result<()> {
    let mut em = Emitter::new(out, x0.saturating_add(fb.width()));
    for y in 0..fb.height() {
        for x in 0..fb.width() {
            em.cell(x0 + x, y0 + y, fb.get(x, y).unwrap_or_default())?;
        }
    }
    em.finish()
}

fn for_each_changed_run(
    prev: &FrameBuffer,
    next: &FrameBuffer,
    mut f: impl FnMut(u16, u16, u16) -> Result<()>,
) -> Result<()> {
    let w = next.width();
    let h = next.height();

    for y in 0..h {
        let mut x = 0;
        while x < w {
            if prev.get(x, y) == next.get(x, y) {
                x += 1;
                continue;
            }
            let start = x;
            x += 1;
            while x < w && prev.get(x, y) != next.get(x, y) {
                x += 1;
            }
            f(start, y, x - start)?;
        }
    }

    Ok(())
}

/// Number of cells that differ between two same-sized frames.
pub fn changed_cells(prev: &FrameBuffer, next: &FrameBuffer) -> usize {
    if prev.width() != next.width() || prev.height() != next.height() {
        return next.cells().len();
    }
    prev.cells()
        .iter()
        .zip(next.cells())
        .filter(|(a, b)| a != b)
        .count()
}

/// Per-session encoder state: the baseline the terminal is known to show.
///
/// `generation` changes whenever the baseline does, so anything rendered
/// against an older baseline can tell it is out of date.
#[derive(Debug)]
pub struct FrameEncoder {
    mode: RenderMode,
    background: Rgb,
    baseline: Option<FrameBuffer>,
    generation: u64,
    full_redraws: u64,
}

impl FrameEncoder {
    pub fn new(mode: RenderMode, background: Rgb) -> Self {
        Self {
            mode,
            background,
            baseline: None,
            generation: 0,
            full_redraws: 0,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Switching modes always forces the next frame to redraw in full.
    pub fn set_mode(&mut self, mode: RenderMode) {
        if self.mode != mode {
            self.mode = mode;
            self.invalidate();
        }
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn baseline(&self) -> Option<&FrameBuffer> {
        self.baseline.as_ref()
    }

    pub fn full_redraws(&self) -> u64 {
        self.full_redraws
    }

    /// Forget the baseline; the next encode is a full redraw.
    pub fn invalidate(&mut self) {
        self.baseline = None;
        self.generation += 1;
    }

    /// Rasterize a composition in the current mode.
    pub fn rasterize(&self, comp: &Composition) -> FrameBuffer {
        let mut fb = FrameBuffer::new(0, 0);
        encode_pixels(&comp.pixels, &comp.overlays, self.mode, self.background, &mut fb);
        fb
    }

    /// Encode `comp` against the baseline and make it the new baseline.
    /// Returns `true` when a full redraw was emitted.
    pub fn encode(&mut self, comp: &Composition, out: &mut Vec<u8>) -> Result<bool> {
        let frame = self.rasterize(comp);
        self.encode_frame(frame, out)
    }

    pub fn encode_frame(&mut self, frame: FrameBuffer, out: &mut Vec<u8>) -> Result<bool> {
        let full = match &self.baseline {
            Some(prev) if prev.width() == frame.width() && prev.height() == frame.height() => {
                encode_diff_into(prev, &frame, out)?;
                if prev == &frame {
                    return Ok(false);
                }
                false
            }
            _ => {
                encode_full_into(&frame, out)?;
                self.full_redraws += 1;
                true
            }
        };
        self.adopt(frame);
        Ok(full)
    }

    /// Diff `comp` against the baseline without touching any state. `None`
    /// when only a full redraw would be correct.
    pub fn encode_speculative(&self, comp: &Composition) -> Result<Option<(FrameBuffer, Vec<u8>)>> {
        let Some(prev) = &self.baseline else {
            return Ok(None);
        };
        let frame = self.rasterize(comp);
        if prev.width() != frame.width() || prev.height() != frame.height() {
            return Ok(None);
        }
        let mut out = Vec::new();
        encode_diff_into(prev, &frame, &mut out)?;
        Ok(Some((frame, out)))
    }

    /// Install a frame the terminal now shows, e.g. after serving a
    /// precomputed diff.
    pub fn adopt(&mut self, frame: FrameBuffer) {
        self.baseline = Some(frame);
        self.generation += 1;
    }
}

/// Writes encoded frames to a terminal (or any writer).
pub struct TerminalRenderer<W: Write> {
    out: W,
    buf: Vec<u8>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            buf: Vec::with_capacity(64 * 1024),
        }
    }

    /// Enter the alternate screen. Raw mode is left to the caller since it
    /// is process-wide.
    pub fn enter(&mut self) -> Result<()> {
        self.buf.clear();
        self.buf.queue(terminal::EnterAlternateScreen)?;
        self.buf.queue(cursor::Hide)?;
        self.buf.queue(terminal::DisableLineWrap)?;
        self.flush_buf()
    }

    pub fn exit(&mut self) -> Result<()> {
        self.buf.clear();
        self.buf.queue(SetAttribute(Attribute::Reset))?;
        self.buf.queue(terminal::EnableLineWrap)?;
        self.buf.queue(cursor::Show)?;
        self.buf.queue(terminal::LeaveAlternateScreen)?;
        self.flush_buf()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.out.write_all(bytes)?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn flush_buf(&mut self) -> Result<()> {
        self.out.write_all(&self.buf)?;
        self.out.flush()?;
        Ok(())
    }
}
