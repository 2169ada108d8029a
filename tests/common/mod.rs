//! Minimal terminal emulator for checking encoder output.
//!
//! Understands exactly what the encoder emits: cursor positioning, clear
//! screen, SGR reset/bold/dim and 24-bit or 256-color fg/bg. Private mode
//! sequences (`ESC [ ? ...`) are ignored.

#![allow(dead_code)]

use termworld::core::SimpleRng;
use termworld::term::{Cell, CellColor, CellStyle, FrameBuffer};
use termworld::types::Rgb;

pub struct VirtualTerminal {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
    cursor: (u16, u16),
    fg: Option<CellColor>,
    bg: Option<CellColor>,
    bold: bool,
    dim: bool,
}

impl VirtualTerminal {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width as usize * height as usize],
            cursor: (0, 0),
            fg: None,
            bg: None,
            bold: false,
            dim: false,
        }
    }

    pub fn cell(&self, x: u16, y: u16) -> Cell {
        self.cells[y as usize * self.width as usize + x as usize]
    }

    pub fn row_text(&self, y: u16) -> String {
        (0..self.width).map(|x| self.cell(x, y).ch).collect()
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        (0..self.height).any(|y| self.row_text(y).contains(needle))
    }

    /// Whether the screen shows exactly `fb`.
    pub fn shows(&self, fb: &FrameBuffer) -> bool {
        fb.width() == self.width && fb.height() == self.height && fb.cells() == self.cells.as_slice()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        let text = std::str::from_utf8(bytes).expect("encoder output is UTF-8");
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '\x1b' {
                self.print(c);
                continue;
            }
            assert_eq!(chars.next(), Some('['), "only CSI sequences are expected");
            let mut params = String::new();
            let fin = loop {
                let c = chars.next().expect("unterminated escape sequence");
                if ('@'..='~').contains(&c) {
                    break c;
                }
                params.push(c);
            };
            if params.starts_with('?') {
                continue;
            }
            self.csi(&params, fin);
        }
    }

    fn print(&mut self, ch: char) {
        let (x, y) = self.cursor;
        assert!(x < self.width && y < self.height, "print outside the screen at {x},{y}");
        let style = CellStyle {
            fg: self.fg.expect("foreground set before printing"),
            bg: self.bg.expect("background set before printing"),
            bold: self.bold,
            dim: self.dim,
        };
        self.cells[y as usize * self.width as usize + x as usize] = Cell { ch, style };
        if x + 1 < self.width {
            self.cursor.0 += 1;
        }
    }

    fn csi(&mut self, params: &str, fin: char) {
        let nums: Vec<u16> = params
            .split(';')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().expect("numeric parameter"))
            .collect();
        match fin {
            'H' => {
                let row = nums.first().copied().unwrap_or(1);
                let col = nums.get(1).copied().unwrap_or(1);
                self.cursor = (col - 1, row - 1);
            }
            'J' => {
                assert_eq!(nums.first().copied(), Some(2));
                self.cells.fill(Cell::default());
            }
            'm' => self.sgr(&nums),
            other => panic!("unexpected CSI final byte {other:?}"),
        }
    }

    fn sgr(&mut self, nums: &[u16]) {
        let mut i = 0;
        if nums.is_empty() {
            self.reset();
        }
        while i < nums.len() {
            match nums[i] {
                0 => self.reset(),
                1 => self.bold = true,
                2 => self.dim = true,
                38 | 48 => {
                    let (color, used) = match nums[i + 1] {
                        2 => (
                            CellColor::Rgb(Rgb::new(nums[i + 2] as u8, nums[i + 3] as u8, nums[i + 4] as u8)),
                            5,
                        ),
                        5 => (CellColor::Indexed(nums[i + 2] as u8), 3),
                        other => panic!("unexpected color form {other}"),
                    };
                    if nums[i] == 38 {
                        self.fg = Some(color);
                    } else {
                        self.bg = Some(color);
                    }
                    i += used;
                    continue;
                }
                other => panic!("unexpected SGR parameter {other}"),
            }
            i += 1;
        }
    }

    fn reset(&mut self) {
        self.fg = None;
        self.bg = None;
        self.bold = false;
        self.dim = false;
    }
}

/// Random frame over a small alphabet and palette, so neighbouring frames
/// share plenty of runs.
pub fn random_frame(rng: &mut SimpleRng, width: u16, height: u16) -> FrameBuffer {
    const GLYPHS: [char; 5] = [' ', '▀', '#', 'a', '.'];
    const PALETTE: [CellColor; 4] = [
        CellColor::Rgb(Rgb::new(0, 0, 0)),
        CellColor::Rgb(Rgb::new(200, 30, 30)),
        CellColor::Rgb(Rgb::new(20, 90, 200)),
        CellColor::Indexed(82),
    ];
    let mut fb = FrameBuffer::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let style = CellStyle {
                fg: PALETTE[rng.next_range(PALETTE.len() as u32) as usize],
                bg: PALETTE[rng.next_range(PALETTE.len() as u32) as usize],
                bold: rng.next_range(4) == 0,
                dim: rng.next_range(8) == 0,
            };
            fb.set(x, y, style.into_cell(GLYPHS[rng.next_range(GLYPHS.len() as u32) as usize]));
        }
    }
    fb
}

/// Copy of `fb` with roughly one cell in `one_in` replaced from `other`.
pub fn mix_frames(rng: &mut SimpleRng, fb: &FrameBuffer, other: &FrameBuffer, one_in: u32) -> FrameBuffer {
    let mut out = fb.clone();
    for y in 0..fb.height() {
        for x in 0..fb.width() {
            if rng.next_range(one_in) == 0 {
                if let Some(cell) = other.get(x, y) {
                    out.set(x, y, cell);
                }
            }
        }
    }
    out
}
