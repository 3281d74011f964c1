//! Status bar along the top edge of the screen

use alloc::boxed::Box;
use alloc::format;

use crate::graphics::{Framebuffer, Point, Rect, COLOR_DARK_GRAY, COLOR_GRAY, COLOR_WHITE, GLYPH_WIDTH};
use crate::message::{KernelRequest, Message, Response};
use crate::process::{Geometry, Process, ProcessContext, ProcessInfo, ProcessTable, WindowKind};

pub const HEIGHT: u32 = 24;

/// Above every window
const DEPTH: i64 = i64::MAX;

const BAR_COLOR: u32 = 0xFF21252B;

/// Menu buttons, in bar coordinates
pub(super) const START_BUTTON: Rect = Rect::new(120, 3, 56, 18);
pub(super) const SYSTEM_BUTTON: Rect = Rect::new(184, 3, 64, 18);

/// Button area and the program it opens or closes
const BUTTONS: [(Rect, &str, &str); 2] = [
    (START_BUTTON, "Start", "startmenu"),
    (SYSTEM_BUTTON, "System", "systemmenu"),
];

pub(super) const TITLE: &str = "Topbar";

pub(super) fn create(table: &ProcessTable) -> (Box<dyn Process>, ProcessInfo) {
    let width = table.screen().w;
    (
        Box::new(Topbar::new()),
        ProcessInfo::new(TITLE, WindowKind::Frameless, Geometry::new(width, HEIGHT, 0, 0, DEPTH)),
    )
}

pub struct Topbar {
    /// Uptime currently painted
    shown_secs: Option<u64>,
    left_was_held: bool,
}

impl Topbar {
    pub fn new() -> Self {
        Self { shown_secs: None, left_was_held: false }
    }

    fn paint(&mut self, fb: &mut Framebuffer, uptime: u64) {
        fb.fill(BAR_COLOR);
        fb.draw_text(crate::VERSION, Point::new(8, 5), COLOR_WHITE);

        for (rect, label, _) in BUTTONS {
            fb.fill_rect(rect, COLOR_DARK_GRAY);
            fb.draw_rect(rect, COLOR_GRAY);
            let inset = rect.w.saturating_sub(label.len() as u32 * GLYPH_WIDTH) / 2;
            fb.draw_text(label, Point::new(rect.x + inset as i32, rect.y + 2), COLOR_WHITE);
        }

        self.paint_clock(fb, uptime);
    }

    fn paint_clock(&mut self, fb: &mut Framebuffer, uptime: u64) {
        let text = format!(
            "Up {:02}:{:02}:{:02}",
            uptime / 3600,
            uptime / 60 % 60,
            uptime % 60
        );
        let text_width = text.len() as u32 * GLYPH_WIDTH;
        let x = fb.width().saturating_sub(text_width + 8) as i32;
        fb.fill_rect(Rect::new(x, 0, text_width, HEIGHT), BAR_COLOR);
        fb.draw_text(&text, Point::new(x, 5), COLOR_WHITE);
        self.shown_secs = Some(uptime);
    }
}

impl Default for Topbar {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for Topbar {
    fn handle(&mut self, message: &Message, ctx: &mut ProcessContext<'_>) -> Response {
        match message {
            Message::Init | Message::Draw => {
                let uptime = ctx.uptime_secs();
                self.paint(ctx.framebuffer(), uptime);
                Response::Draw
            }
            Message::Tick => {
                let uptime = ctx.uptime_secs();
                if self.shown_secs == Some(uptime) {
                    return Response::Success;
                }
                self.paint_clock(ctx.framebuffer(), uptime);
                Response::Draw
            }
            Message::Mouse(info) => {
                let pressed = info.left_held && !self.left_was_held;
                self.left_was_held = info.left_held;
                if !pressed {
                    return Response::Success;
                }
                let hit = BUTTONS.iter().find(|(rect, _, _)| rect.contains(info.position));
                if let Some((_, _, program)) = hit {
                    ctx.request(KernelRequest::Toggle((*program).into()));
                }
                Response::Success
            }
            Message::Clear => Response::Clear,
            _ => Response::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::message::MouseInfo;

    #[test]
    fn test_buttons_toggle_menus() {
        let mut table = ProcessTable::new(&KernelConfig::with_screen(640, 480));
        let bar = crate::programs::start(&mut table, "topbar").unwrap();
        let press = |rect: Rect| MouseInfo {
            position: Point::new(rect.x + 4, rect.y + 4),
            left_held: true,
            ..MouseInfo::default()
        };
        table.deliver(bar, &Message::Mouse(press(START_BUTTON)));
        // Holding the button does not toggle again
        table.deliver(bar, &Message::Mouse(press(START_BUTTON)));
        table.deliver(bar, &Message::Mouse(MouseInfo::default()));
        table.deliver(bar, &Message::Mouse(press(SYSTEM_BUTTON)));
        assert_eq!(
            table.take_requests(),
            [
                (bar, KernelRequest::Toggle("startmenu".into())),
                (bar, KernelRequest::Toggle("systemmenu".into())),
            ]
        );
    }

    #[test]
    fn test_clock_repaints_once_per_second() {
        let mut table = ProcessTable::new(&KernelConfig::with_screen(640, 480));
        let bar = crate::programs::start(&mut table, "topbar").unwrap();
        assert_eq!(table.deliver(bar, &Message::Tick), Some(Response::Success));
        table.set_ticks(100);
        assert_eq!(table.deliver(bar, &Message::Tick), Some(Response::Draw));
        assert_eq!(table.deliver(bar, &Message::Tick), Some(Response::Success));
    }
}
