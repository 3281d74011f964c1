//! Text console
//!
//! Line-edited input; Enter sends the line to the kernel shell and the
//! reply is printed when the kernel hands it back with `Draw`.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::String;

use crate::graphics::{
    Framebuffer, Point, Rect, COLOR_BLACK, COLOR_CYAN, COLOR_RED, COLOR_WHITE, GLYPH_HEIGHT,
    GLYPH_WIDTH,
};
use crate::message::{KernelRequest, Message, Response, KEY_BACKSPACE, KEY_ENTER, KEY_ESCAPE};
use crate::process::{Geometry, Process, ProcessContext, ProcessInfo, ProcessTable, WindowKind};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 400;
const PROMPT: &str = "> ";
/// Lines kept above the visible ones
const SCROLLBACK: usize = 200;
/// Space between the client edge and the text
const MARGIN: i32 = 4;

pub(super) const TITLE: &str = "tty";

pub(super) fn create(table: &ProcessTable) -> (Box<dyn Process>, ProcessInfo) {
    let (left, top) = super::cascade(table);
    let depth = table.next_window_depth();
    (
        Box::new(Tty::new()),
        ProcessInfo::new(TITLE, WindowKind::Windowed, Geometry::new(WIDTH, HEIGHT, left, top, depth)),
    )
}

pub struct Tty {
    lines: VecDeque<String>,
    input: String,
    /// Characters per line, from the client area
    columns: usize,
    caret_on: bool,
}

impl Tty {
    pub fn new() -> Self {
        Self {
            lines: VecDeque::new(),
            input: String::new(),
            columns: 0,
            caret_on: true,
        }
    }

    /// Append output, wrapping at the window width
    fn print(&mut self, text: &str) {
        for line in text.lines() {
            let mut rest = line.trim_end_matches('\r');
            loop {
                let split = rest
                    .char_indices()
                    .nth(self.columns.max(1))
                    .map_or(rest.len(), |(idx, _)| idx);
                let (head, tail) = rest.split_at(split);
                self.push_line(String::from(head));
                if tail.is_empty() {
                    break;
                }
                rest = tail;
            }
        }
    }

    fn push_line(&mut self, line: String) {
        if self.lines.len() >= SCROLLBACK {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn rows(area: Rect) -> usize {
        (area.h.saturating_sub(2 * MARGIN as u32) / GLYPH_HEIGHT) as usize
    }

    fn paint(&self, fb: &mut Framebuffer, area: Rect) {
        fb.fill_rect(area, COLOR_BLACK);
        let rows = Self::rows(area);
        if rows == 0 {
            return;
        }

        let x = area.x + MARGIN;
        let history = rows - 1;
        let skip = self.lines.len().saturating_sub(history);
        for (row, line) in self.lines.iter().skip(skip).enumerate() {
            let color = if line.starts_with("ERROR") { COLOR_RED } else { COLOR_WHITE };
            let y = area.y + MARGIN + (row as u32 * GLYPH_HEIGHT) as i32;
            fb.draw_text(line, Point::new(x, y), color);
        }
        self.paint_input(fb, area);
    }

    /// Prompt row at the bottom of the client area
    fn paint_input(&self, fb: &mut Framebuffer, area: Rect) {
        let rows = Self::rows(area);
        if rows == 0 {
            return;
        }
        let y = area.y + MARGIN + ((rows - 1) as u32 * GLYPH_HEIGHT) as i32;
        fb.fill_rect(Rect::new(area.x, y, area.w, GLYPH_HEIGHT), COLOR_BLACK);

        let x = area.x + MARGIN;
        fb.draw_text(PROMPT, Point::new(x, y), COLOR_CYAN);
        let input_x = x + (PROMPT.len() as u32 * GLYPH_WIDTH) as i32;
        fb.draw_text(&self.input, Point::new(input_x, y), COLOR_WHITE);
        if self.caret_on {
            let caret_x = input_x + (self.input.len() as u32 * GLYPH_WIDTH) as i32;
            fb.draw_text("_", Point::new(caret_x, y), COLOR_WHITE);
        }
    }

    fn key(&mut self, key: u8, ctx: &mut ProcessContext<'_>) -> Response {
        let area = ctx.client_area();
        match key {
            KEY_ENTER => {
                let line = core::mem::take(&mut self.input);
                self.print(&format!("{}{}", PROMPT, line));
                if !line.trim().is_empty() {
                    ctx.request(KernelRequest::Command(line));
                }
                self.paint(ctx.framebuffer(), area);
            }
            KEY_BACKSPACE => {
                if self.input.pop().is_none() {
                    return Response::Success;
                }
                self.paint_input(ctx.framebuffer(), area);
            }
            KEY_ESCAPE => {
                self.input.clear();
                self.paint_input(ctx.framebuffer(), area);
            }
            0x20..=0x7E => {
                if PROMPT.len() + self.input.len() + 1 >= self.columns {
                    return Response::Success;
                }
                self.input.push(key as char);
                self.paint_input(ctx.framebuffer(), area);
            }
            _ => return Response::Success,
        }
        Response::Draw
    }
}

impl Default for Tty {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for Tty {
    fn handle(&mut self, message: &Message, ctx: &mut ProcessContext<'_>) -> Response {
        match message {
            Message::Init => {
                let area = ctx.client_area();
                self.columns = (area.w.saturating_sub(2 * MARGIN as u32) / GLYPH_WIDTH) as usize;
                self.lines.clear();
                self.input.clear();
                self.print(crate::VERSION);
                self.print("Type help for a list of commands.");
                self.paint(ctx.framebuffer(), area);
                Response::Draw
            }
            Message::Draw => {
                while let Some(reply) = ctx.take_reply() {
                    self.print(&reply);
                }
                let area = ctx.client_area();
                self.paint(ctx.framebuffer(), area);
                Response::Draw
            }
            Message::Clear => {
                self.lines.clear();
                self.input.clear();
                Response::Clear
            }
            Message::Tick => {
                let half_second = (ctx.tick_hz() / 2).max(1) as u64;
                let caret_on = (ctx.ticks() / half_second) % 2 == 0;
                if caret_on == self.caret_on {
                    return Response::Success;
                }
                self.caret_on = caret_on;
                let area = ctx.client_area();
                self.paint_input(ctx.framebuffer(), area);
                Response::Draw
            }
            Message::KeyPress(key) => self.key(*key, ctx),
            Message::Mouse(_) | Message::Kill => Response::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::graphics::Framebuffer;
    use crate::scheduler::{CycleInput, Scheduler};

    fn session() -> (Scheduler<Framebuffer>, crate::process::Pid) {
        let display = Framebuffer::try_new(1024, 768, 0).unwrap();
        let mut sched = Scheduler::new(display, KernelConfig::default()).unwrap();
        let tty = crate::programs::start_session(sched.table_mut()).unwrap();
        (sched, tty)
    }

    fn type_line(sched: &mut Scheduler<Framebuffer>, text: &str) {
        let mut keys: alloc::vec::Vec<u8> = text.bytes().collect();
        keys.push(KEY_ENTER);
        sched.cycle(CycleInput { keys, ..CycleInput::default() });
    }

    #[test]
    fn test_wrapping() {
        let mut tty = Tty::new();
        tty.columns = 4;
        tty.print("abcdefghij\nxy");
        assert_eq!(tty.lines, ["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn test_scrollback_is_bounded() {
        let mut tty = Tty::new();
        tty.columns = 80;
        for i in 0..SCROLLBACK + 10 {
            tty.print(&format!("line {}", i));
        }
        assert_eq!(tty.lines.len(), SCROLLBACK);
        assert_eq!(tty.lines.front().map(String::as_str), Some("line 10"));
    }

    #[test]
    fn test_command_round_trip() {
        let (mut sched, tty) = session();
        type_line(&mut sched, "start calculator");
        assert_eq!(sched.table().len(), 4);
        assert!(sched.table().iter().any(|p| p.title() == "Calculator"));
        // The tty keeps focus; the new window only stacks on top
        assert_eq!(sched.table().focused(), Some(tty));
    }

    #[test]
    fn test_suicide_from_tty() {
        let (mut sched, tty) = session();
        type_line(&mut sched, "suicide");
        assert!(sched.table().lookup(tty).is_none());
        assert_eq!(sched.table().len(), 2);
    }

    #[test]
    fn test_clear_command_wipes_window() {
        let (mut sched, tty) = session();
        type_line(&mut sched, "help");
        type_line(&mut sched, "clear");
        sched.cycle(CycleInput::default());
        let entity = sched.table().lookup(tty).unwrap();
        let area = entity.client_area();
        // Only the prompt row has text after the clear
        let fb = entity.framebuffer();
        let first_row_y = area.y + MARGIN + 2;
        let lit = (area.x..area.x + area.w as i32)
            .filter(|&x| fb.get_pixel(x, first_row_y) == COLOR_WHITE)
            .count();
        assert_eq!(lit, 0);
    }

    #[test]
    fn test_line_editing() {
        let mut table = ProcessTable::new(&KernelConfig::default());
        let pid = crate::programs::start(&mut table, "tty").unwrap();
        let keys = [b'l', b's', KEY_BACKSPACE, KEY_ESCAPE, b'h', b'e', b'l', b'p', KEY_ENTER, KEY_ENTER];
        for key in keys {
            table.deliver(pid, &Message::KeyPress(key));
        }
        // The empty second line is not sent
        assert_eq!(table.take_requests(), [(pid, KernelRequest::Command("help".into()))]);
    }
}
