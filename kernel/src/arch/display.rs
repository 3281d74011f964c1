//! Linear framebuffer handed over by Limine
//!
//! Only 32 bpp modes are driven. Frames are copied row by row so the pitch
//! of the hardware buffer may differ from the width.

use lumen_kernel::graphics::{Display, Framebuffer, Rect};

pub struct LimineDisplay {
    base: *mut u8,
    width: u32,
    height: u32,
    /// Bytes per scanline
    pitch: usize,
}

impl LimineDisplay {
    /// # Safety
    /// `base` must point to a mapped, writable `pitch * height` byte region
    /// that nothing else writes to while this display exists.
    pub unsafe fn new(base: *mut u8, width: u32, height: u32, pitch: usize, bpp: u16) -> Option<Self> {
        if base.is_null() || bpp != 32 || pitch < width as usize * 4 {
            return None;
        }
        Some(Self { base, width, height, pitch })
    }
}

impl Display for LimineDisplay {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn present(&mut self, frame: &Framebuffer, area: Rect) {
        let visible = Rect::new(
            0,
            0,
            self.width.min(frame.width()),
            self.height.min(frame.height()),
        );
        let Some(area) = area.intersect(&visible) else {
            return;
        };
        let pixels = frame.pixels();
        let stride = frame.width() as usize;
        let (x, w) = (area.x as usize, area.w as usize);

        for y in area.y as usize..area.y as usize + area.h as usize {
            let row = &pixels[y * stride + x..y * stride + x + w];
            unsafe {
                let dst = self.base.add(y * self.pitch + x * 4) as *mut u32;
                core::ptr::copy_nonoverlapping(row.as_ptr(), dst, w);
            }
        }
    }
}
