//! Start menu
//!
//! Drops down under the topbar's Start button and lists the launcher
//! programs. Picking one starts it and closes the menu; so does Escape,
//! without starting anything.

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::{topbar, Program, PROGRAMS};
use crate::graphics::{Framebuffer, Point, Rect, COLOR_GRAY, COLOR_WHITE, GLYPH_HEIGHT};
use crate::message::{KernelRequest, Message, Response, KEY_ESCAPE};
use crate::process::{Geometry, Process, ProcessContext, ProcessInfo, ProcessTable, WindowKind};

const WIDTH: u32 = 320;
const ITEM_HEIGHT: u32 = 20;
const PADDING: u32 = 4;
/// Under the topbar, above every window
const DEPTH: i64 = i64::MAX - 1;

const MENU_COLOR: u32 = 0xFF2C313A;
const DESCRIPTION_COLOR: u32 = 0xFF9DA5B4;

pub(super) const TITLE: &str = "Start Menu";

pub(super) fn create(_table: &ProcessTable) -> (Box<dyn Process>, ProcessInfo) {
    let menu = StartMenu::new();
    let height = menu.entries.len() as u32 * ITEM_HEIGHT + 2 * PADDING;
    let left = topbar::START_BUTTON.x;
    (
        Box::new(menu),
        ProcessInfo::new(
            TITLE,
            WindowKind::Frameless,
            Geometry::new(WIDTH, height, left, topbar::HEIGHT as i32, DEPTH),
        ),
    )
}

pub struct StartMenu {
    entries: Vec<&'static Program>,
    left_was_held: bool,
}

impl StartMenu {
    pub fn new() -> Self {
        Self {
            entries: PROGRAMS.iter().filter(|p| p.launcher).collect(),
            left_was_held: false,
        }
    }

    fn entry_rect(index: usize) -> Rect {
        Rect::new(
            PADDING as i32,
            (PADDING + index as u32 * ITEM_HEIGHT) as i32,
            WIDTH - 2 * PADDING,
            ITEM_HEIGHT,
        )
    }

    fn entry_at(&self, position: Point) -> Option<&'static Program> {
        (0..self.entries.len())
            .find(|&i| Self::entry_rect(i).contains(position))
            .map(|i| self.entries[i])
    }

    fn paint(&self, fb: &mut Framebuffer) {
        fb.fill(MENU_COLOR);
        fb.draw_rect(fb.bounds(), COLOR_GRAY);
        let text_offset = (ITEM_HEIGHT - GLYPH_HEIGHT) as i32 / 2;
        for (i, program) in self.entries.iter().enumerate() {
            let row = Self::entry_rect(i);
            fb.draw_text(program.name, Point::new(row.x + 4, row.y + text_offset), COLOR_WHITE);
            fb.draw_text(
                program.description,
                Point::new(row.x + 100, row.y + text_offset),
                DESCRIPTION_COLOR,
            );
        }
    }
}

impl Default for StartMenu {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for StartMenu {
    fn handle(&mut self, message: &Message, ctx: &mut ProcessContext<'_>) -> Response {
        match message {
            Message::Init | Message::Draw => {
                self.paint(ctx.framebuffer());
                Response::Draw
            }
            Message::Mouse(info) => {
                let pressed = info.left_held && !self.left_was_held;
                self.left_was_held = info.left_held;
                if !pressed {
                    return Response::Success;
                }
                match self.entry_at(info.position) {
                    Some(program) => {
                        ctx.request(KernelRequest::Start(program.name.into()));
                        Response::Kill
                    }
                    None => Response::Success,
                }
            }
            Message::KeyPress(KEY_ESCAPE) => Response::Kill,
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
    use crate::scheduler::{CycleInput, Scheduler};

    fn click(position: Point) -> MouseInfo {
        MouseInfo { position, left_held: true, ..MouseInfo::default() }
    }

    fn running(sched: &Scheduler<Framebuffer>, title: &str) -> bool {
        sched.table().iter().any(|p| p.title() == title)
    }

    #[test]
    fn test_lists_only_launchers() {
        let menu = StartMenu::new();
        let names: Vec<_> = menu.entries.iter().map(|p| p.name).collect();
        assert_eq!(names, ["tty", "calculator"]);
    }

    #[test]
    fn test_start_button_opens_menu_and_entry_launches() {
        let mut config = KernelConfig::default();
        config.draw_mouse = false;
        let mut sched = Scheduler::new(Framebuffer::try_new(1024, 768, 0).unwrap(), config).unwrap();
        super::super::start_session(sched.table_mut()).unwrap();

        let button = topbar::START_BUTTON;
        let on_button = Point::new(button.x + 4, button.y + 4);
        sched.cycle(CycleInput { mouse: Some(click(on_button)), ..CycleInput::default() });
        assert!(running(&sched, TITLE));
        let release = MouseInfo { position: on_button, ..MouseInfo::default() };
        sched.cycle(CycleInput { mouse: Some(release), ..CycleInput::default() });

        let calculator = StartMenu::new().entries.iter().position(|p| p.name == "calculator").unwrap();
        let row = StartMenu::entry_rect(calculator);
        let on_entry = Point::new(button.x + row.x + 8, topbar::HEIGHT as i32 + row.y + 8);
        sched.cycle(CycleInput { mouse: Some(click(on_entry)), ..CycleInput::default() });

        assert!(running(&sched, super::super::calculator::TITLE));
        assert!(!running(&sched, TITLE));
        assert_eq!(sched.table().len(), 4);
    }

    #[test]
    fn test_empty_space_is_ignored_and_escape_closes() {
        let mut table = ProcessTable::new(&KernelConfig::with_screen(1024, 768));
        let menu = super::super::start(&mut table, "startmenu").unwrap();
        let below = Point::new(10, (2 * PADDING + 2 * ITEM_HEIGHT) as i32 - 1);
        assert_eq!(table.deliver(menu, &Message::Mouse(click(below))), Some(Response::Success));
        assert!(table.take_requests().is_empty());
        assert_eq!(table.deliver(menu, &Message::KeyPress(KEY_ESCAPE)), Some(Response::Kill));
        assert_eq!(table.reap(), 1);
        assert!(table.is_empty());
    }
}
