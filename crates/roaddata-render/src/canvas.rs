//! Minimal raster canvas on top of `image::RgbImage`.

use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder, ImageError, Rgb, RgbImage};
use roaddata_core::Color;

use crate::glyphs::{self, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Axis-aligned pixel rectangle. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

pub struct Canvas {
    img: RgbImage,
    clip: Option<Rect>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            img: RgbImage::from_pixel(width, height, to_rgb(background)),
            clip: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    /// Restrict subsequent drawing to `clip` (or lift the restriction).
    pub fn set_clip(&mut self, clip: Option<Rect>) {
        self.clip = clip;
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.img
            .get_pixel_checked(x, y)
            .map(|p| Color::rgb(p[0], p[1], p[2]))
    }

    pub fn put(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x as u32 >= self.img.width() || y as u32 >= self.img.height() {
            return;
        }
        if let Some(clip) = self.clip {
            if !clip.contains(x, y) {
                return;
            }
        }
        self.img.put_pixel(x as u32, y as u32, to_rgb(color));
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                self.put(x, y, color);
            }
        }
    }

    /// One-pixel outline drawn on the rectangle's outermost pixels.
    pub fn stroke_rect(&mut self, rect: Rect, color: Color) {
        if rect.w <= 0 || rect.h <= 0 {
            return;
        }
        let (r, b) = (rect.right() - 1, rect.bottom() - 1);
        for x in rect.x..=r {
            self.put(x, rect.y, color);
            self.put(x, b, color);
        }
        for y in rect.y..=b {
            self.put(rect.x, y, color);
            self.put(r, y, color);
        }
    }

    /// Bresenham line stamped with a `width`-pixel square pen.
    pub fn draw_line(&mut self, from: (f64, f64), to: (f64, f64), color: Color, width: u32) {
        let (mut x0, mut y0) = (from.0.round() as i32, from.1.round() as i32);
        let (x1, y1) = (to.0.round() as i32, to.1.round() as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.stamp(x0, y0, color, width);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    pub fn draw_polyline(&mut self, points: &[(f64, f64)], color: Color, width: u32) {
        for pair in points.windows(2) {
            self.draw_line(pair[0], pair[1], color, width);
        }
    }

    fn stamp(&mut self, x: i32, y: i32, color: Color, width: u32) {
        let width = width.max(1) as i32;
        let lo = (width - 1) / 2;
        let hi = width / 2;
        for dy in -lo..=hi {
            for dx in -lo..=hi {
                self.put(x + dx, y + dy, color);
            }
        }
    }

    /// Draw `text` with its top-left corner at (`x`, `y`).
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, scale: u32, color: Color) {
        let s = scale.max(1) as i32;
        let mut pen_x = x;
        for c in text.chars() {
            let columns = glyphs::glyph(c);
            for (col, bits) in columns.iter().enumerate().take(GLYPH_WIDTH as usize) {
                for row in 0..GLYPH_HEIGHT {
                    if bits >> row & 1 == 1 {
                        let px = pen_x + col as i32 * s;
                        let py = y + row as i32 * s;
                        self.fill_rect(Rect::new(px, py, s, s), color);
                    }
                }
            }
            pen_x += GLYPH_ADVANCE as i32 * s;
        }
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, ImageError> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out).write_image(
            self.img.as_raw(),
            self.img.width(),
            self.img.height(),
            ExtendedColorType::Rgb8,
        )?;
        Ok(out)
    }
}

fn to_rgb(c: Color) -> Rgb<u8> {
    Rgb([c.r, c.g, c.b])
}
