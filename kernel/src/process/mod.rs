//! Process model
//!
//! A process is a window-owning message handler. It never runs on its own:
//! the scheduler hands it one [`Message`] at a time together with a
//! [`ProcessContext`] (its framebuffer, the clock, the kernel outbox) and
//! acts on the [`Response`] it returns.

mod table;

pub use table::{DepthOrder, ProcessTable};

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use crate::graphics::{
    Framebuffer, Point, Rect, COLOR_DARK_GRAY, COLOR_GRAY, COLOR_WHITE, GLYPH_HEIGHT,
};
use crate::message::{KernelRequest, Message, Response};

/// Process ID type. Ids are never reused during a boot.
pub type Pid = u64;

/// Height of the kernel-drawn title bar of `Windowed` processes
pub const TITLE_BAR_HEIGHT: u32 = GLYPH_HEIGHT + 4;

/// How a process occupies the screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowKind {
    /// Covers the whole screen; requested size and position are ignored
    Fullscreen,
    /// Framed window with a title bar drawn by the kernel
    Windowed,
    /// Bare rectangle, no decoration
    Frameless,
}

impl WindowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowKind::Fullscreen => "fullscreen",
            WindowKind::Windowed => "windowed",
            WindowKind::Frameless => "frameless",
        }
    }
}

/// Window placement. Larger `depth` is drawn later, i.e. closer to the viewer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
    pub depth: i64,
}

impl Geometry {
    pub const fn new(width: u32, height: u32, left: i32, top: i32, depth: i64) -> Self {
        Self { width, height, left, top, depth }
    }

    /// Screen rectangle covered by the window
    pub fn bounds(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }
}

/// Start parameters for a process
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessInfo {
    pub title: String,
    pub kind: WindowKind,
    pub geometry: Geometry,
}

impl ProcessInfo {
    pub fn new(title: &str, kind: WindowKind, geometry: Geometry) -> Self {
        Self { title: String::from(title), kind, geometry }
    }
}

/// Message handler of a process.
///
/// Every delivered message gets exactly one response. Handlers must return
/// promptly: the whole system shares one thread of control.
pub trait Process {
    fn handle(&mut self, message: &Message, ctx: &mut ProcessContext<'_>) -> Response;
}

impl<F> Process for F
where
    F: FnMut(&Message, &mut ProcessContext<'_>) -> Response,
{
    fn handle(&mut self, message: &Message, ctx: &mut ProcessContext<'_>) -> Response {
        self(message, ctx)
    }
}

/// Tick clock as seen by processes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock {
    pub ticks: u64,
    pub hz: u32,
}

impl Clock {
    pub fn uptime_secs(&self) -> u64 {
        self.ticks / self.hz.max(1) as u64
    }
}

/// Everything a process may touch while handling one message
pub struct ProcessContext<'a> {
    pid: Pid,
    kind: WindowKind,
    clock: Clock,
    framebuffer: &'a mut Framebuffer,
    replies: &'a mut VecDeque<String>,
    requests: &'a mut Vec<(Pid, KernelRequest)>,
}

impl<'a> ProcessContext<'a> {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    pub fn ticks(&self) -> u64 {
        self.clock.ticks
    }

    pub fn tick_hz(&self) -> u32 {
        self.clock.hz
    }

    pub fn uptime_secs(&self) -> u64 {
        self.clock.uptime_secs()
    }

    /// The process framebuffer, including the title bar of framed windows
    pub fn framebuffer(&mut self) -> &mut Framebuffer {
        self.framebuffer
    }

    /// Part of the framebuffer the process owns: everything except the
    /// kernel-drawn frame of `Windowed` processes
    pub fn client_area(&self) -> Rect {
        client_area(self.kind, self.framebuffer.width(), self.framebuffer.height())
    }

    /// Queue a kernel call; it runs after the current dispatch pass
    pub fn request(&mut self, request: KernelRequest) {
        self.requests.push((self.pid, request));
    }

    /// Next pending answer to an earlier `KernelRequest::Command`
    pub fn take_reply(&mut self) -> Option<String> {
        self.replies.pop_front()
    }
}

fn client_area(kind: WindowKind, width: u32, height: u32) -> Rect {
    match kind {
        WindowKind::Windowed => Rect::new(
            1,
            TITLE_BAR_HEIGHT as i32,
            width.saturating_sub(2),
            height.saturating_sub(TITLE_BAR_HEIGHT + 1),
        ),
        _ => Rect::new(0, 0, width, height),
    }
}

/// Frame and title bar of a `Windowed` process
fn draw_chrome(framebuffer: &mut Framebuffer, title: &str) {
    let width = framebuffer.width();
    framebuffer.fill_rect(Rect::new(0, 0, width, TITLE_BAR_HEIGHT), COLOR_DARK_GRAY);
    framebuffer.draw_rect(framebuffer.bounds(), COLOR_GRAY);
    framebuffer.draw_text(title, Point::new(6, 2), COLOR_WHITE);
}

/// Control block of a live process
pub struct ProcessEntity {
    pid: Pid,
    title: String,
    kind: WindowKind,
    geometry: Geometry,
    framebuffer: Framebuffer,
    procedure: Box<dyn Process>,
    /// Command output waiting to be picked up through `take_reply`
    replies: VecDeque<String>,
    /// Region must be recomposited
    pub(crate) dirty: bool,
    /// Deliver `Init` again next cycle
    pub(crate) reset_pending: bool,
    /// Deliver `Draw` after the dispatch pass
    pub(crate) redraw_pending: bool,
}

impl ProcessEntity {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Screen rectangle covered by the window
    pub fn bounds(&self) -> Rect {
        self.geometry.bounds()
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn client_area(&self) -> Rect {
        client_area(self.kind, self.framebuffer.width(), self.framebuffer.height())
    }

    pub(crate) fn push_reply(&mut self, reply: String) {
        self.replies.push_back(reply);
        self.redraw_pending = true;
    }

    /// Reset the framebuffer to `background`, restoring the frame if any
    pub(crate) fn wipe(&mut self, background: u32) {
        self.framebuffer.fill(background);
        if self.kind == WindowKind::Windowed {
            draw_chrome(&mut self.framebuffer, &self.title);
        }
        self.dirty = true;
    }

    pub(crate) fn deliver(
        &mut self,
        message: &Message,
        clock: Clock,
        requests: &mut Vec<(Pid, KernelRequest)>,
    ) -> Response {
        let mut ctx = ProcessContext {
            pid: self.pid,
            kind: self.kind,
            clock,
            framebuffer: &mut self.framebuffer,
            replies: &mut self.replies,
            requests,
        };
        self.procedure.handle(message, &mut ctx)
    }
}

impl core::fmt::Debug for ProcessEntity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcessEntity")
            .field("pid", &self.pid)
            .field("title", &self.title)
            .field("kind", &self.kind)
            .field("geometry", &self.geometry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_area_excludes_frame() {
        let area = client_area(WindowKind::Windowed, 200, 100);
        assert_eq!(area, Rect::new(1, TITLE_BAR_HEIGHT as i32, 198, 100 - TITLE_BAR_HEIGHT - 1));
        assert_eq!(client_area(WindowKind::Frameless, 200, 100), Rect::new(0, 0, 200, 100));
    }

    #[test]
    fn test_clock_uptime() {
        let clock = Clock { ticks: 250, hz: 100 };
        assert_eq!(clock.uptime_secs(), 2);
        assert_eq!(Clock { ticks: 5, hz: 0 }.uptime_secs(), 5);
    }
}
