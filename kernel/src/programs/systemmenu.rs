//! System menu
//!
//! Drops down under the topbar's System button with the running processes,
//! read back from the `list process` command. Clicking a row kills that
//! process; Escape closes the menu.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use super::topbar;
use crate::graphics::{Framebuffer, Point, Rect, COLOR_GRAY, COLOR_WHITE, GLYPH_HEIGHT};
use crate::message::{KernelRequest, Message, Response, KEY_ESCAPE};
use crate::process::{Geometry, Pid, Process, ProcessContext, ProcessInfo, ProcessTable, WindowKind};

const WIDTH: u32 = 280;
const HEIGHT: u32 = 220;
const ROW_HEIGHT: u32 = 18;
const PADDING: u32 = 4;
/// Rows between the header and the status line
const MAX_ROWS: usize = ((HEIGHT - 2 * PADDING) / ROW_HEIGHT) as usize - 2;
const DEPTH: i64 = i64::MAX - 1;

const MENU_COLOR: u32 = 0xFF2C313A;
const HEADER_COLOR: u32 = 0xFF9DA5B4;
const STATUS_COLOR: u32 = 0xFFE5C07B;

const LIST_COMMAND: &str = "list process";

pub(super) const TITLE: &str = "System Menu";

pub(super) fn create(_table: &ProcessTable) -> (Box<dyn Process>, ProcessInfo) {
    (
        Box::new(SystemMenu::new()),
        ProcessInfo::new(
            TITLE,
            WindowKind::Frameless,
            Geometry::new(WIDTH, HEIGHT, topbar::SYSTEM_BUTTON.x, topbar::HEIGHT as i32, DEPTH),
        ),
    )
}

pub struct SystemMenu {
    /// (title, id) from the last listing
    rows: Vec<(String, Pid)>,
    /// Last non-listing reply, e.g. the outcome of a kill
    status: String,
    left_was_held: bool,
}

impl SystemMenu {
    pub fn new() -> Self {
        Self { rows: Vec::new(), status: String::new(), left_was_held: false }
    }

    /// Row `index` of the process list; row 0 sits under the header
    fn row_rect(index: usize) -> Rect {
        Rect::new(
            PADDING as i32,
            (PADDING + (index as u32 + 1) * ROW_HEIGHT) as i32,
            WIDTH - 2 * PADDING,
            ROW_HEIGHT,
        )
    }

    fn row_at(&self, position: Point) -> Option<Pid> {
        self.rows
            .iter()
            .take(MAX_ROWS)
            .enumerate()
            .find(|(i, _)| Self::row_rect(*i).contains(position))
            .map(|(_, (_, pid))| *pid)
    }

    fn take_replies(&mut self, ctx: &mut ProcessContext<'_>) {
        while let Some(reply) = ctx.take_reply() {
            if reply.starts_with("TITLE") {
                self.rows = parse_listing(&reply);
            } else {
                self.status = reply;
            }
        }
    }

    fn paint(&self, fb: &mut Framebuffer) {
        fb.fill(MENU_COLOR);
        fb.draw_rect(fb.bounds(), COLOR_GRAY);
        let text_offset = (ROW_HEIGHT - GLYPH_HEIGHT) as i32 / 2;
        let left = PADDING as i32 + 4;
        fb.draw_text(
            "Click a process to kill it",
            Point::new(left, PADDING as i32 + text_offset),
            HEADER_COLOR,
        );
        for (i, (title, pid)) in self.rows.iter().take(MAX_ROWS).enumerate() {
            let row = Self::row_rect(i);
            let line = format!("{:>4}  {}", pid, title);
            fb.draw_text(&line, Point::new(left, row.y + text_offset), COLOR_WHITE);
        }
        let status_y = (HEIGHT - PADDING - ROW_HEIGHT) as i32 + text_offset;
        fb.draw_text(&self.status, Point::new(left, status_y), STATUS_COLOR);
    }
}

impl Default for SystemMenu {
    fn default() -> Self {
        Self::new()
    }
}

/// Rows of a `list process` reply: a header line, then `title ... id`
fn parse_listing(listing: &str) -> Vec<(String, Pid)> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let (title, id) = line.trim_end().rsplit_once(' ')?;
            Some((String::from(title.trim_end()), id.parse().ok()?))
        })
        .collect()
}

impl Process for SystemMenu {
    fn handle(&mut self, message: &Message, ctx: &mut ProcessContext<'_>) -> Response {
        match message {
            Message::Init => {
                ctx.request(KernelRequest::Command(LIST_COMMAND.into()));
                self.paint(ctx.framebuffer());
                Response::Draw
            }
            Message::Draw => {
                self.take_replies(ctx);
                self.paint(ctx.framebuffer());
                Response::Draw
            }
            Message::Mouse(info) => {
                let pressed = info.left_held && !self.left_was_held;
                self.left_was_held = info.left_held;
                if let Some(pid) = self.row_at(info.position).filter(|_| pressed) {
                    ctx.request(KernelRequest::Command(format!("kill {}", pid)));
                    ctx.request(KernelRequest::Command(LIST_COMMAND.into()));
                }
                Response::Success
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

    #[test]
    fn test_parse_listing() {
        let listing = format!("{:<24} {}\n{:<24} {}\n{:<24} {}", "TITLE", "ID", "tty", 3, "Start Menu", 12);
        assert_eq!(
            parse_listing(&listing),
            [(String::from("tty"), 3), (String::from("Start Menu"), 12)]
        );
        assert!(parse_listing("TITLE ID\ngarbage").is_empty());
    }

    #[test]
    fn test_lists_and_kills_processes() {
        let mut config = KernelConfig::default();
        config.draw_mouse = false;
        let mut sched = Scheduler::new(Framebuffer::try_new(1024, 768, 0).unwrap(), config).unwrap();
        let tty = crate::programs::start_session(sched.table_mut()).unwrap();
        crate::programs::start(sched.table_mut(), "systemmenu").unwrap();
        // The listing requested on Init is answered in the next pass
        sched.cycle(CycleInput::default());

        // Session order is desktop, topbar, tty
        let row = SystemMenu::row_rect(2);
        let on_tty = Point::new(
            topbar::SYSTEM_BUTTON.x + row.x + 8,
            topbar::HEIGHT as i32 + row.y + 4,
        );
        let click = MouseInfo { position: on_tty, left_held: true, ..MouseInfo::default() };
        sched.cycle(CycleInput { mouse: Some(click), ..CycleInput::default() });

        assert!(sched.table().lookup(tty).is_none());
        assert!(sched.table().iter().any(|p| p.title() == TITLE));
        assert_eq!(sched.table().len(), 3);
    }

    #[test]
    fn test_init_asks_for_listing_and_escape_closes() {
        let mut table = ProcessTable::new(&KernelConfig::with_screen(1024, 768));
        let menu = crate::programs::start(&mut table, "systemmenu").unwrap();
        assert_eq!(
            table.take_requests(),
            [(menu, KernelRequest::Command(String::from(LIST_COMMAND)))]
        );
        let header = MouseInfo { position: Point::new(10, 6), left_held: true, ..MouseInfo::default() };
        table.deliver(menu, &Message::Mouse(header));
        assert!(table.take_requests().is_empty());
        assert_eq!(table.deliver(menu, &Message::KeyPress(KEY_ESCAPE)), Some(Response::Kill));
    }
}
