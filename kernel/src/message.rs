//! Process message protocol
//!
//! The fixed vocabulary exchanged between the scheduler and a process:
//! messages go in, exactly one response comes back. Processes that need the
//! kernel to do more (run a command, start a program) queue a
//! [`KernelRequest`] through their context; those are applied after the
//! dispatch pass.

use alloc::string::String;

use crate::graphics::Point;

/// Key code carried by `KeyPress`; printable keys are ASCII
pub type KeyCode = u8;

pub const KEY_BACKSPACE: KeyCode = 0x08;
pub const KEY_ENTER: KeyCode = b'\n';
pub const KEY_ESCAPE: KeyCode = 0x1B;

/// Mouse payload. `position` is relative to the receiving window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MouseInfo {
    pub position: Point,
    pub left_held: bool,
    pub middle_held: bool,
    pub right_held: bool,
}

/// Kernel -> process
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    /// First message after start, and again after a `Reset` response
    Init,
    /// Throw away content; answer `Clear` to have the framebuffer wiped
    Clear,
    /// Framebuffer was wiped by the kernel; repaint everything
    Draw,
    /// Last message before the process is destroyed; the response is ignored
    Kill,
    Tick,
    Mouse(MouseInfo),
    KeyPress(KeyCode),
}

impl Message {
    pub fn name(&self) -> &'static str {
        match self {
            Message::Init => "INIT",
            Message::Clear => "CLEAR",
            Message::Draw => "DRAW",
            Message::Kill => "KILL",
            Message::Tick => "TICK",
            Message::Mouse(_) => "MOUSE",
            Message::KeyPress(_) => "KEYPRESS",
        }
    }
}

/// Process -> kernel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Response {
    /// Handled, nothing for the kernel to do
    Success,
    /// Deliver `Init` again on the next cycle
    Reset,
    /// Wipe my framebuffer to the background, then send me `Draw`
    Clear,
    /// My framebuffer changed; repaint my region this cycle
    Draw,
    /// Remove me once the current dispatch pass is over
    Kill,
}

/// Typed kernel call queued by a process, applied after dispatch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelRequest {
    /// Run a shell command line; the output is handed back as a reply
    Command(String),
    /// Start a registered program by name
    Start(String),
    /// Close the program if an instance is running, start it otherwise
    Toggle(String),
}
