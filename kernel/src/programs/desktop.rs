//! Desktop background

use alloc::boxed::Box;

use crate::graphics::{Framebuffer, Point, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::message::{Message, Response};
use crate::process::{Geometry, Process, ProcessContext, ProcessInfo, ProcessTable, WindowKind};

/// Below every other window
pub const DEPTH: i64 = -1;

const GRID: i32 = 32;
const DOT_COLOR: u32 = 0xFF2C3E50;
const LABEL_COLOR: u32 = 0xFF5C6370;

pub(super) const TITLE: &str = "Desktop";

pub(super) fn create(_table: &ProcessTable) -> (Box<dyn Process>, ProcessInfo) {
    (
        Box::new(Desktop),
        ProcessInfo::new(TITLE, WindowKind::Fullscreen, Geometry::new(0, 0, 0, 0, DEPTH)),
    )
}

/// Dotted wallpaper with the kernel version in the corner
pub struct Desktop;

impl Desktop {
    fn paint(&self, fb: &mut Framebuffer) {
        let (w, h) = (fb.width() as i32, fb.height() as i32);
        for y in (GRID / 2..h).step_by(GRID as usize) {
            for x in (GRID / 2..w).step_by(GRID as usize) {
                fb.set_pixel(x, y, DOT_COLOR);
            }
        }

        let label = crate::VERSION;
        let x = w - (label.len() as u32 * GLYPH_WIDTH) as i32 - 8;
        let y = h - GLYPH_HEIGHT as i32 - 6;
        fb.draw_text(label, Point::new(x, y), LABEL_COLOR);
    }
}

impl Process for Desktop {
    fn handle(&mut self, message: &Message, ctx: &mut ProcessContext<'_>) -> Response {
        match message {
            Message::Init | Message::Draw => {
                self.paint(ctx.framebuffer());
                Response::Draw
            }
            Message::Clear => Response::Clear,
            _ => Response::Success,
        }
    }
}
