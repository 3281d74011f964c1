//! Built-in programs
//!
//! Every program the kernel can start by name, and the boot session that
//! brings up the desktop.

mod calculator;
mod desktop;
mod startmenu;
mod systemmenu;
mod topbar;
mod tty;

pub use calculator::Calculator;
pub use desktop::Desktop;
pub use startmenu::StartMenu;
pub use systemmenu::SystemMenu;
pub use topbar::Topbar;
pub use tty::Tty;

use alloc::boxed::Box;

use crate::error::KernelError;
use crate::process::{Pid, Process, ProcessInfo, ProcessTable};

/// A startable program
pub struct Program {
    pub name: &'static str,
    /// Window title of its instances
    pub title: &'static str,
    pub description: &'static str,
    /// Offered in the start menu
    pub launcher: bool,
    /// Build the procedure and its window for the current table
    create: fn(&ProcessTable) -> (Box<dyn Process>, ProcessInfo),
}

/// Registry of startable programs
pub const PROGRAMS: &[Program] = &[
    Program {
        name: "tty",
        title: tty::TITLE,
        description: "Text console running kernel commands",
        launcher: true,
        create: tty::create,
    },
    Program {
        name: "calculator",
        title: calculator::TITLE,
        description: "Four-function calculator",
        launcher: true,
        create: calculator::create,
    },
    Program {
        name: "desktop",
        title: desktop::TITLE,
        description: "Desktop background",
        launcher: false,
        create: desktop::create,
    },
    Program {
        name: "topbar",
        title: topbar::TITLE,
        description: "Status bar with uptime and the menu buttons",
        launcher: false,
        create: topbar::create,
    },
    Program {
        name: "startmenu",
        title: startmenu::TITLE,
        description: "Menu of startable programs",
        launcher: false,
        create: startmenu::create,
    },
    Program {
        name: "systemmenu",
        title: systemmenu::TITLE,
        description: "Running processes; click one to kill it",
        launcher: false,
        create: systemmenu::create,
    },
];

pub fn find(name: &str) -> Option<&'static Program> {
    PROGRAMS.iter().find(|p| p.name == name)
}

/// Start a registered program by name
pub fn start(table: &mut ProcessTable, name: &str) -> Result<Pid, KernelError> {
    let program = find(name).ok_or(KernelError::UnknownProgram)?;
    let (procedure, info) = (program.create)(table);
    let pid = table.start(procedure, info)?;
    crate::log!("[PROGRAMS] Started {} as process {}", name, pid);
    Ok(pid)
}

/// Close the running instance of `name`, or start one if there is none.
/// Returns the new id when something was started.
pub fn toggle(table: &mut ProcessTable, name: &str) -> Result<Option<Pid>, KernelError> {
    let program = find(name).ok_or(KernelError::UnknownProgram)?;
    let running = table
        .iter()
        .find(|p| p.title() == program.title)
        .map(|p| p.pid());
    match running {
        Some(pid) => {
            table.kill(pid);
            crate::log!("[PROGRAMS] Closed {} (process {})", name, pid);
            Ok(None)
        }
        None => start(table, name).map(Some),
    }
}

/// Start desktop, topbar and a tty; the tty gets focus. Returns its id.
pub fn start_session(table: &mut ProcessTable) -> Result<Pid, KernelError> {
    start(table, "desktop")?;
    start(table, "topbar")?;
    let tty = start(table, "tty")?;
    table.set_focus(tty);
    Ok(tty)
}

/// Top-left corner for the next framed window, cascading down and right
pub(crate) fn cascade(table: &ProcessTable) -> (i32, i32) {
    let step = table.next_window_depth().rem_euclid(8) as i32;
    (60 + step * 28, topbar::HEIGHT as i32 + 24 + step * 28)
}
