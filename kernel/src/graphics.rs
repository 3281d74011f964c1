//! Pixel primitives
//!
//! Owned ARGB pixel buffers, rectangle clipping and the `Display` seam the
//! compositor presents through. Text goes through embedded-graphics with the
//! 8x13 mono font.

use alloc::vec::Vec;
use embedded_graphics::mono_font::{ascii::FONT_8X13, MonoTextStyle};
use embedded_graphics::text::{Baseline, Text};
use embedded_graphics::Drawable;
use embedded_graphics_core::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Point as EgPoint, Size as EgSize},
    pixelcolor::{Rgb888, RgbColor},
    Pixel,
};

use crate::error::KernelError;

pub const COLOR_BLACK: u32 = 0xFF000000;
pub const COLOR_WHITE: u32 = 0xFFFFFFFF;
pub const COLOR_GRAY: u32 = 0xFFC8C8C8;
pub const COLOR_DARK_GRAY: u32 = 0xFF3C3C3C;
pub const COLOR_CYAN: u32 = 0xFF56B6C2;
pub const COLOR_RED: u32 = 0xFFE06C75;
pub const COLOR_GREEN: u32 = 0xFF98C379;

/// Glyph cell of the built-in font
pub const GLYPH_WIDTH: u32 = 8;
pub const GLYPH_HEIGHT: u32 = 13;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

/// Axis-aligned rectangle; `x`/`y` may be negative for windows hanging off screen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.w as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.h as i64
    }

    pub fn contains(&self, p: Point) -> bool {
        let (px, py) = (p.x as i64, p.y as i64);
        px >= self.x as i64 && px < self.right() && py >= self.y as i64 && py < self.bottom()
    }

    /// Overlapping part of two rectangles
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 as i64 || y2 <= y1 as i64 {
            return None;
        }
        Some(Rect::new(x1, y1, (x2 - x1 as i64) as u32, (y2 - y1 as i64) as u32))
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.intersect(other).is_some()
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() { return *other; }
        if other.is_empty() { return *self; }

        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        Rect::new(x1, y1, (x2 - x1 as i64) as u32, (y2 - y1 as i64) as u32)
    }
}

/// Owned ARGB pixel buffer, row-major, stride == width
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl core::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Framebuffer({}x{})", self.width, self.height)
    }
}

impl Framebuffer {
    /// Allocate a buffer filled with `color`. Fails instead of aborting when
    /// the heap cannot satisfy the request.
    pub fn try_new(width: u32, height: u32, color: u32) -> Result<Self, KernelError> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .ok_or(KernelError::OutOfMemory)?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| KernelError::OutOfMemory)?;
        pixels.resize(len, color);
        Ok(Framebuffer { width, height, pixels })
    }

    /// Bytes needed for a `width` x `height` buffer
    pub fn bytes_for(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(core::mem::size_of::<u32>())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * core::mem::size_of::<u32>()
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx] = color;
        }
    }

    /// Pixel at (x, y); 0 outside the buffer
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> u32 {
        self.index(x, y).map(|idx| self.pixels[idx]).unwrap_or(0)
    }

    pub fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Fill rectangle, clipped to the buffer
    pub fn fill_rect(&mut self, rect: Rect, color: u32) {
        let Some(area) = rect.intersect(&self.bounds()) else { return };
        let stride = self.width as usize;
        for y in area.y..area.y + area.h as i32 {
            let start = y as usize * stride + area.x as usize;
            self.pixels[start..start + area.w as usize].fill(color);
        }
    }

    /// Outlined rectangle
    pub fn draw_rect(&mut self, rect: Rect, color: u32) {
        let (x, y, w, h) = (rect.x, rect.y, rect.w, rect.h);
        self.fill_rect(Rect::new(x, y, w, 1), color);
        self.fill_rect(Rect::new(x, y + h.saturating_sub(1) as i32, w, 1), color);
        self.fill_rect(Rect::new(x, y, 1, h), color);
        self.fill_rect(Rect::new(x + w.saturating_sub(1) as i32, y, 1, h), color);
    }

    /// Copy `src` with its top-left at `origin`, touching only pixels inside
    /// `clip` and inside this buffer. Direct overwrite, no blending.
    pub fn blit(&mut self, src: &Framebuffer, origin: Point, clip: Rect) {
        let placed = Rect::new(origin.x, origin.y, src.width, src.height);
        let Some(area) = placed
            .intersect(&clip)
            .and_then(|r| r.intersect(&self.bounds()))
        else {
            return;
        };

        let dst_stride = self.width as usize;
        let src_stride = src.width as usize;
        let len = area.w as usize;
        let src_x = (area.x - origin.x) as usize;
        for row in 0..area.h as i32 {
            let dy = area.y + row;
            let sy = (dy - origin.y) as usize;
            let d = dy as usize * dst_stride + area.x as usize;
            let s = sy * src_stride + src_x;
            self.pixels[d..d + len].copy_from_slice(&src.pixels[s..s + len]);
        }
    }

    /// Draw `text` with its top-left corner at `pos`; no wrapping
    pub fn draw_text(&mut self, text: &str, pos: Point, color: u32) {
        let style = MonoTextStyle::new(&FONT_8X13, argb_to_rgb888(color));
        let _ = Text::with_baseline(text, EgPoint::new(pos.x, pos.y), style, Baseline::Top).draw(self);
    }
}

#[inline]
fn argb_to_rgb888(color: u32) -> Rgb888 {
    Rgb888::new((color >> 16) as u8, (color >> 8) as u8, color as u8)
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> EgSize {
        EgSize::new(self.width, self.height)
    }
}

impl DrawTarget for Framebuffer {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let c = 0xFF000000
                | ((color.r() as u32) << 16)
                | ((color.g() as u32) << 8)
                | color.b() as u32;
            self.set_pixel(coord.x, coord.y, c);
        }
        Ok(())
    }
}

/// Surface the compositor presents finished frames to: video memory on
/// hardware, a plain `Framebuffer` in tests.
pub trait Display {
    fn size(&self) -> (u32, u32);

    /// Copy `area` of the finished frame onto the visible surface
    fn present(&mut self, frame: &Framebuffer, area: Rect);
}

impl Display for Framebuffer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn present(&mut self, frame: &Framebuffer, area: Rect) {
        self.blit(frame, Point::new(0, 0), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, -5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(5, 0, 5, 5)));
        assert_eq!(a.intersect(&Rect::new(10, 0, 4, 4)), None);
        assert!(a.contains(Point::new(9, 9)));
        assert!(!a.contains(Point::new(10, 9)));
    }

    #[test]
    fn test_rect_union() {
        let a = Rect::new(0, 0, 4, 4);
        let b = Rect::new(6, 2, 2, 6);
        assert_eq!(a.union(&b), Rect::new(0, 0, 8, 8));
        assert_eq!(Rect::default().union(&b), b);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut fb = Framebuffer::try_new(4, 4, COLOR_BLACK).unwrap();
        fb.fill_rect(Rect::new(2, 2, 10, 10), COLOR_WHITE);
        assert_eq!(fb.get_pixel(1, 1), COLOR_BLACK);
        assert_eq!(fb.get_pixel(3, 3), COLOR_WHITE);
        assert_eq!(fb.get_pixel(4, 4), 0);
    }

    #[test]
    fn test_blit_clips_to_destination_and_clip_rect() {
        let mut screen = Framebuffer::try_new(8, 8, COLOR_BLACK).unwrap();
        let window = Framebuffer::try_new(4, 4, COLOR_RED).unwrap();

        // Hangs off the top-left corner
        screen.blit(&window, Point::new(-2, -2), screen.bounds());
        assert_eq!(screen.get_pixel(0, 0), COLOR_RED);
        assert_eq!(screen.get_pixel(1, 1), COLOR_RED);
        assert_eq!(screen.get_pixel(2, 2), COLOR_BLACK);

        // Restricted by the clip rectangle
        screen.blit(&window, Point::new(4, 4), Rect::new(5, 5, 1, 1));
        assert_eq!(screen.get_pixel(5, 5), COLOR_RED);
        assert_eq!(screen.get_pixel(4, 4), COLOR_BLACK);
        assert_eq!(screen.get_pixel(6, 6), COLOR_BLACK);
    }

    #[test]
    fn test_blit_copies_source_offset() {
        let mut src = Framebuffer::try_new(3, 1, COLOR_BLACK).unwrap();
        src.set_pixel(0, 0, 1);
        src.set_pixel(1, 0, 2);
        src.set_pixel(2, 0, 3);
        let mut dst = Framebuffer::try_new(3, 1, 0).unwrap();
        dst.blit(&src, Point::new(-1, 0), dst.bounds());
        assert_eq!(dst.pixels(), &[2, 3, 0]);
    }

    #[test]
    fn test_try_new_reports_overflow() {
        assert_eq!(
            Framebuffer::try_new(u32::MAX, u32::MAX, 0).err(),
            Some(KernelError::OutOfMemory)
        );
    }

    #[test]
    fn test_draw_text_marks_pixels() {
        let mut fb = Framebuffer::try_new(32, 16, COLOR_BLACK).unwrap();
        fb.draw_text("A", Point::new(0, 0), COLOR_WHITE);
        assert!(fb.pixels().iter().any(|&p| p == COLOR_WHITE));
        assert!(fb.pixels()[..].iter().skip(8).step_by(32).all(|&p| p == COLOR_BLACK));
    }
}
