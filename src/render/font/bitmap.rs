/// Fixed-pixel bitmap fonts (BDF files and the built-in face).
use image::RgbImage;
use std::collections::HashMap;

use crate::config::Rgb;
use crate::render::font::blend_pixel;
use crate::render::metrics::Bounds;

/// One glyph bitmap. Rows are packed MSB-first, padded to whole bytes.
#[derive(Debug, Clone)]
pub struct BitmapGlyph {
    /// Pen advance in font pixels
    pub advance: i32,
    pub width: u32,
    pub height: u32,
    /// Left edge relative to the pen
    pub x_offset: i32,
    /// Bottom edge relative to the baseline (positive is up)
    pub y_offset: i32,
    bytes_per_row: usize,
    bits: Vec<u8>,
}

impl BitmapGlyph {
    pub fn new(
        advance: i32,
        width: u32,
        height: u32,
        x_offset: i32,
        y_offset: i32,
        bits: Vec<u8>,
    ) -> Self {
        let bytes_per_row = (width as usize).div_ceil(8);
        let mut bits = bits;
        bits.resize(bytes_per_row * height as usize, 0);
        Self {
            advance,
            width,
            height,
            x_offset,
            y_offset,
            bytes_per_row,
            bits,
        }
    }

    /// A glyph with no ink
    pub fn blank(advance: i32) -> Self {
        Self::new(advance, 0, 0, 0, 0, Vec::new())
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let byte = self.bits[y as usize * self.bytes_per_row + x as usize / 8];
        byte & (0x80 >> (x % 8)) != 0
    }
}

pub struct BitmapFont {
    glyphs: HashMap<char, BitmapGlyph>,
    /// Pixels above the baseline
    pub ascent: i32,
    /// Pixels below the baseline
    pub descent: i32,
    /// Integer pixel scale applied when drawing
    scale: u32,
    default_char: Option<char>,
}

impl BitmapFont {
    pub fn new(ascent: i32, descent: i32) -> Self {
        Self {
            glyphs: HashMap::new(),
            ascent,
            descent,
            scale: 1,
            default_char: None,
        }
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.max(1);
        self
    }

    pub fn with_default_char(mut self, ch: char) -> Self {
        self.default_char = Some(ch);
        self
    }

    pub fn insert(&mut self, ch: char, glyph: BitmapGlyph) {
        self.glyphs.insert(ch, glyph);
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyph(&self, ch: char) -> Option<&BitmapGlyph> {
        self.glyphs
            .get(&ch)
            .or_else(|| self.default_char.and_then(|d| self.glyphs.get(&d)))
    }

    /// Glyphs with their scaled pen x positions. Unknown characters without
    /// a default glyph are skipped.
    fn placed<'a>(&'a self, text: &str) -> Vec<(i32, &'a BitmapGlyph)> {
        let s = self.scale as i32;
        let mut pen = 0;
        let mut placed = Vec::with_capacity(text.len());
        for ch in text.chars() {
            if let Some(glyph) = self.glyph(ch) {
                placed.push((pen, glyph));
                pen += glyph.advance * s;
            }
        }
        placed
    }

    /// Scaled box of a glyph placed at `pen`, with the line top at y = 0
    fn glyph_bounds(&self, pen: i32, glyph: &BitmapGlyph) -> Option<Bounds> {
        if glyph.width == 0 || glyph.height == 0 {
            return None;
        }
        let s = self.scale as i32;
        let left = pen + glyph.x_offset * s;
        let top = (self.ascent - (glyph.y_offset + glyph.height as i32)) * s;
        Some(Bounds::new(
            left,
            top,
            left + glyph.width as i32 * s,
            top + glyph.height as i32 * s,
        ))
    }

    pub(crate) fn measure(&self, text: &str) -> Option<Bounds> {
        self.placed(text)
            .into_iter()
            .filter_map(|(pen, glyph)| self.glyph_bounds(pen, glyph))
            .reduce(Bounds::union)
    }

    pub(crate) fn draw(&self, image: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb) {
        let s = self.scale as i32;
        for (pen, glyph) in self.placed(text) {
            let Some(bounds) = self.glyph_bounds(pen, glyph) else {
                continue;
            };
            for gy in 0..glyph.height {
                for gx in 0..glyph.width {
                    if !glyph.is_set(gx, gy) {
                        continue;
                    }
                    let px = x + bounds.min_x + gx as i32 * s;
                    let py = y + bounds.min_y + gy as i32 * s;
                    for dy in 0..s {
                        for dx in 0..s {
                            blend_pixel(image, px + dx, py + dy, color, 1.0);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_glyph_font() -> BitmapFont {
        let mut font = BitmapFont::new(3, 1);
        // 2x2 block sitting on the baseline
        font.insert('a', BitmapGlyph::new(3, 2, 2, 0, 0, vec![0xC0, 0xC0]));
        // 1x2 descender hanging below the baseline
        font.insert('j', BitmapGlyph::new(2, 1, 2, 0, -1, vec![0x80, 0x80]));
        font
    }

    #[test]
    fn test_is_set() {
        let glyph = BitmapGlyph::new(6, 9, 1, 0, 0, vec![0x80, 0x80]);
        assert!(glyph.is_set(0, 0));
        assert!(!glyph.is_set(1, 0));
        assert!(glyph.is_set(8, 0));
        assert!(!glyph.is_set(9, 0));
    }

    #[test]
    fn test_measure_with_descender() {
        let font = two_glyph_font();
        let bounds = font.measure("aj").unwrap();
        assert_eq!(bounds, Bounds::new(0, 1, 4, 4));
    }

    #[test]
    fn test_unknown_chars_use_default() {
        let font = two_glyph_font().with_default_char('a');
        assert_eq!(font.measure("zz"), font.measure("aa"));
        let plain = two_glyph_font();
        assert_eq!(plain.measure("z"), None);
    }

    #[test]
    fn test_draw_scaled() {
        let font = two_glyph_font().with_scale(2);
        let mut image = RgbImage::new(8, 8);
        font.draw(&mut image, 0, 0, "a", [9, 9, 9]);
        // 2x2 glyph at scale 2 covers x 0..4, y 2..6
        assert_eq!(image.get_pixel(0, 2).0, [9, 9, 9]);
        assert_eq!(image.get_pixel(3, 5).0, [9, 9, 9]);
        assert_eq!(image.get_pixel(4, 5).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(0, 1).0, [0, 0, 0]);
    }
}
