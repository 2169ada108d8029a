//! Pixel grids and colors.

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Multiply each channel by `factor`, saturating at 255.
    pub fn scaled(self, factor: f32) -> Self {
        let ch = |c: u8| (c as f32 * factor).round().clamp(0.0, 255.0) as u8;
        Self::new(ch(self.r), ch(self.g), ch(self.b))
    }

    /// Perceived luminance in `[0, 255]` (Rec. 601 weights).
    pub fn luma(self) -> u8 {
        let l = 0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32;
        l.round().clamp(0.0, 255.0) as u8
    }
}

/// A single pixel. `None` is transparency, never a color.
pub type Pixel = Option<Rgb>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("row {row} has {found} pixels, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("grid dimensions {width}x{height} exceed u16")]
    TooLarge { width: usize, height: usize },
}

/// Rectangular row-major pixel grid. Dimensions are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PixelGrid {
    width: u16,
    height: u16,
    pixels: Vec<Pixel>,
}

impl PixelGrid {
    /// A `width`×`height` grid where every pixel is `pixel`.
    pub fn filled(width: u16, height: u16, pixel: Pixel) -> Self {
        Self {
            width,
            height,
            pixels: vec![pixel; width as usize * height as usize],
        }
    }

    /// Build from rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<Pixel>>) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if width > u16::MAX as usize || height > u16::MAX as usize {
            return Err(GridError::TooLarge { width, height });
        }
        let mut pixels = Vec::with_capacity(width * height);
        for (row, r) in rows.into_iter().enumerate() {
            if r.len() != width {
                return Err(GridError::RaggedRows {
                    row,
                    expected: width,
                    found: r.len(),
                });
            }
            pixels.extend(r);
        }
        Ok(Self {
            width: width as u16,
            height: height as u16,
            pixels,
        })
    }

    /// Build from a generator called once per `(x, y)` in row-major order.
    pub fn from_fn(width: u16, height: u16, mut f: impl FnMut(u16, u16) -> Pixel) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Pixel at `(x, y)`; the outer `None` means out of bounds.
    #[inline(always)]
    pub fn get(&self, x: u16, y: u16) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y as usize * self.width as usize + x as usize])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Pixel]> {
        self.pixels.chunks(self.width.max(1) as usize)
    }

    /// Nearest-neighbour resample to `width`×`height`.
    pub fn resample_nearest(&self, width: u16, height: u16) -> Self {
        if self.width == 0 || self.height == 0 {
            return Self::filled(width, height, None);
        }
        let sw = self.width as u32;
        let sh = self.height as u32;
        Self::from_fn(width, height, |x, y| {
            let sx = (x as u32 * sw / width as u32).min(sw - 1);
            let sy = (y as u32 * sh / height as u32).min(sh - 1);
            self.pixels[(sy * sw + sx) as usize]
        })
    }

    /// Apply `f` to every opaque pixel, keeping transparency.
    pub fn map_opaque(&self, mut f: impl FnMut(Rgb) -> Rgb) -> Self {
        Self {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|p| p.map(&mut f)).collect(),
        }
    }
}

/// Mutable pixel canvas used while compositing; frozen into a [`PixelGrid`].
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u16,
    height: u16,
    pixels: Vec<Pixel>,
}

impl Canvas {
    pub fn new(width: u16, height: u16, fill: Pixel) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Write an opaque pixel; out-of-bounds writes are dropped.
    #[inline(always)]
    pub fn put(&mut self, x: i32, y: i32, rgb: Rgb) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        self.pixels[y as usize * self.width as usize + x as usize] = Some(rgb);
    }

    /// Draw `grid` with its top-left at `(x, y)`. Transparent pixels are
    /// skipped and anything outside the canvas is clipped.
    pub fn blit(&mut self, grid: &PixelGrid, x: i32, y: i32) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + grid.width() as i32).min(self.width as i32);
        let y1 = (y + grid.height() as i32).min(self.height as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                if let Some(Some(rgb)) = grid.get((px - x) as u16, (py - y) as u16) {
                    self.pixels[py as usize * self.width as usize + px as usize] = Some(rgb);
                }
            }
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: u16, h: u16, rgb: Rgb) {
        for dy in 0..h as i32 {
            for dx in 0..w as i32 {
                self.put(x + dx, y + dy, rgb);
            }
        }
    }

    pub fn into_grid(self) -> PixelGrid {
        PixelGrid {
            width: self.width,
            height: self.height,
            pixels: self.pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);

    #[test]
    fn ragged_rows_are_rejected() {
        let err = PixelGrid::from_rows(vec![vec![None, None], vec![None]]).unwrap_err();
        assert_eq!(
            err,
            GridError::RaggedRows {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn transparency_is_not_black() {
        let grid = PixelGrid::from_rows(vec![vec![None, Some(Rgb::new(0, 0, 0))]]).unwrap();
        assert_ne!(grid.get(0, 0), grid.get(1, 0));
        assert_eq!(grid.get(2, 0), None);
    }

    #[test]
    fn blit_clips_negative_and_overflowing_offsets() {
        let mut canvas = Canvas::new(4, 4, None);
        let sprite = PixelGrid::filled(3, 3, Some(RED));
        canvas.blit(&sprite, -2, 3);
        let grid = canvas.into_grid();
        assert_eq!(grid.get(0, 3), Some(Some(RED)));
        assert_eq!(grid.get(1, 3), Some(None));
        assert_eq!(grid.get(0, 2), Some(None));
    }

    #[test]
    fn blit_skips_transparent_pixels() {
        let mut canvas = Canvas::new(2, 1, Some(RED));
        let sprite = PixelGrid::from_rows(vec![vec![None, Some(Rgb::new(1, 2, 3))]]).unwrap();
        canvas.blit(&sprite, 0, 0);
        let grid = canvas.into_grid();
        assert_eq!(grid.get(0, 0), Some(Some(RED)));
        assert_eq!(grid.get(1, 0), Some(Some(Rgb::new(1, 2, 3))));
    }

    #[test]
    fn resample_nearest_doubles_pixels() {
        let grid = PixelGrid::from_rows(vec![vec![Some(RED), None]]).unwrap();
        let big = grid.resample_nearest(4, 2);
        assert_eq!(big.get(1, 1), Some(Some(RED)));
        assert_eq!(big.get(2, 0), Some(None));
        assert_eq!(big.resample_nearest(2, 1), grid);
    }

    #[test]
    fn scaled_saturates() {
        assert_eq!(Rgb::new(200, 100, 0).scaled(1.3), Rgb::new(255, 130, 0));
    }
}
