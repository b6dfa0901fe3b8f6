//! Simple in-memory compositors
//!
//! Real compositors (pixel formats, textures, SIMD blending) live outside of this crate,
//! these are enough for tests, benchmarks and debug output.
use crate::{BBox, ColorU8, Error, Point, Span, SpanSink};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Width of the image
    pub width: usize,
    /// Height of the image
    pub height: usize,
}

impl Shape {
    #[inline]
    pub fn offset(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Bounding box of the whole image in device space, used as a clip
    pub fn bbox(&self) -> BBox {
        BBox::new(
            Point::new(0.0, 0.0),
            Point::new(self.width as f64, self.height as f64),
        )
    }

    /// Part of the span that lies inside of the image as a `(row, first, last)` columns range
    fn clip_span(&self, span: &Span) -> Option<(usize, usize, usize)> {
        if span.row < 0 || span.row as usize >= self.height || span.len == 0 {
            return None;
        }
        let first = span.x.max(0);
        let last = (span.x + span.len as i32 - 1).min(self.width as i32 - 1);
        if first > last {
            return None;
        }
        Some((span.row as usize, first as usize, last as usize))
    }
}

/// `dst` covered by `src` with `opacity`, all values in `0..=255`
#[inline]
fn blend_u8(dst: u8, src: u8, opacity: u8) -> u8 {
    let (dst, src, opacity) = (dst as u32, src as u32, opacity as u32);
    ((dst * (255 - opacity) + src * opacity + 127) / 255) as u8
}

/// Single channel coverage buffer
///
/// Spans are composed with source-over operator, color is ignored.
#[derive(Clone, PartialEq, Eq)]
pub struct Mask {
    shape: Shape,
    data: Vec<u8>,
}

impl std::fmt::Debug for Mask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mask {}x{}", self.shape.width, self.shape.height)?;
        for row in self.data.chunks(self.shape.width.max(1)) {
            for value in row {
                write!(f, "{:02x}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Mask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            shape: Shape { width, height },
            data: vec![0; width * height],
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn width(&self) -> usize {
        self.shape.width
    }

    pub fn height(&self) -> usize {
        self.shape.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row >= self.shape.height || col >= self.shape.width {
            return None;
        }
        self.data.get(self.shape.offset(row, col)).copied()
    }

    /// Sum of all values
    pub fn coverage(&self) -> u64 {
        self.data.iter().map(|value| *value as u64).sum()
    }

    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|value| *value = 0);
    }

    /// Write mask as binary PGM (netpbm) image
    pub fn write_pgm(&self, mut out: impl Write) -> Result<(), Error> {
        writeln!(out, "P5 {} {} 255", self.shape.width, self.shape.height)?;
        out.write_all(&self.data)?;
        Ok(())
    }
}

impl SpanSink for Mask {
    fn paint_span(&mut self, span: Span) {
        let Some((row, first, last)) = self.shape.clip_span(&span) else {
            return;
        };
        let offset = self.shape.offset(row, 0);
        for col in first..=last {
            let opacity = span.opacity_at(col as i32);
            let value = &mut self.data[offset + col];
            *value = blend_u8(*value, 255, opacity);
        }
    }
}

/// RGBA image
///
/// Opacity of the span already includes alpha of the color, color alpha is not
/// applied the second time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    shape: Shape,
    color: ColorU8,
    data: Vec<ColorU8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize, background: ColorU8) -> Self {
        Self {
            shape: Shape { width, height },
            color: ColorU8::BLACK,
            data: vec![background; width * height],
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn data(&self) -> &[ColorU8] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<ColorU8> {
        if row >= self.shape.height || col >= self.shape.width {
            return None;
        }
        self.data.get(self.shape.offset(row, col)).copied()
    }

    /// Write image as binary PPM (netpbm) image, alpha is discarded
    pub fn write_ppm(&self, mut out: impl Write) -> Result<(), Error> {
        writeln!(out, "P6 {} {} 255", self.shape.width, self.shape.height)?;
        for color in self.data.iter() {
            let [r, g, b, _] = color.to_rgba();
            out.write_all(&[r, g, b])?;
        }
        Ok(())
    }
}

impl SpanSink for Canvas {
    fn paint_span(&mut self, span: Span) {
        let Some((row, first, last)) = self.shape.clip_span(&span) else {
            return;
        };
        let offset = self.shape.offset(row, 0);
        let [r, g, b, _] = self.color.to_rgba();
        for col in first..=last {
            let opacity = span.opacity_at(col as i32);
            let pixel = &mut self.data[offset + col];
            let [dr, dg, db, da] = pixel.to_rgba();
            *pixel = ColorU8::new(
                blend_u8(dr, r, opacity),
                blend_u8(dg, g, opacity),
                blend_u8(db, b, opacity),
                blend_u8(da, 255, opacity),
            );
        }
    }

    fn set_color(&mut self, color: ColorU8) {
        self.color = color;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(row: i32, x: i32, len: u32, opacity: [u8; 3]) -> Span {
        let [left, middle, right] = opacity;
        Span {
            row,
            x,
            len,
            left,
            middle,
            right,
        }
    }

    #[test]
    fn test_mask_blend() {
        let mut mask = Mask::new(4, 2);
        mask.paint_span(span(0, 0, 4, [64, 255, 128]));
        assert_eq!(&mask.data()[..4], &[64, 255, 255, 128]);
        mask.paint_span(span(0, 0, 1, [128, 128, 128]));
        // 64 + (255 - 64) * 128 / 255
        assert_eq!(mask.get(0, 0), Some(160));
        assert_eq!(mask.coverage(), 160 + 255 + 255 + 128);
    }

    #[test]
    fn test_mask_clip() {
        let mut mask = Mask::new(4, 2);
        mask.paint_span(span(1, -2, 8, [10, 20, 30]));
        mask.paint_span(span(5, 0, 2, [10, 20, 30]));
        mask.paint_span(span(-1, 0, 2, [10, 20, 30]));
        assert_eq!(&mask.data()[..4], &[0, 0, 0, 0]);
        assert_eq!(&mask.data()[4..], &[20, 20, 20, 20]);
    }

    #[test]
    fn test_write_pgm() -> Result<(), Error> {
        let mut mask = Mask::new(2, 1);
        mask.paint_span(span(0, 1, 1, [7, 7, 7]));
        let mut out = Vec::new();
        mask.write_pgm(&mut out)?;
        assert_eq!(out, b"P5 2 1 255\n\x00\x07");
        Ok(())
    }

    #[test]
    fn test_canvas() {
        let mut canvas = Canvas::new(2, 1, ColorU8::WHITE);
        canvas.set_color(ColorU8::new(255, 0, 0, 255));
        canvas.paint_span(span(0, 0, 2, [255, 255, 128]));
        assert_eq!(canvas.get(0, 0), Some(ColorU8::new(255, 0, 0, 255)));
        assert_eq!(canvas.get(0, 1), Some(ColorU8::new(255, 127, 127, 255)));
        assert_eq!(canvas.get(1, 0), None);
    }
}
