//! Kernel command shell
//!
//! Commands arrive as text through `KernelRequest::Command` (usually from a
//! tty) and are answered with text. Context-sensitive commands (`clear`,
//! `suicide`) act on the focused process.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Write;

use crate::config::RUNTIME_SETTINGS;
use crate::error::KernelError;
use crate::graphics::Display;
use crate::message::Message;
use crate::process::Pid;
use crate::scheduler::Scheduler;

/// Lines printed by `dmesg` without an argument
const DMESG_DEFAULT_LINES: usize = 20;

struct Manual {
    name: &'static str,
    description: &'static str,
    usage: &'static str,
}

const MANUALS: &[Manual] = &[
    Manual {
        name: "help",
        description: "Lists commands or describes one.",
        usage: "help [COMMAND]",
    },
    Manual {
        name: "list",
        description: "Lists information about the kernel.",
        usage: "list process",
    },
    Manual {
        name: "start",
        description: "Starts a program and prints its id.",
        usage: "start [PROGRAM]",
    },
    Manual {
        name: "kill",
        description: "Kills the process with the given id.",
        usage: "kill [ID]",
    },
    Manual {
        name: "suicide",
        description: "Kills the focused process.",
        usage: "suicide",
    },
    Manual {
        name: "clear",
        description: "Clears the framebuffer of the focused process.",
        usage: "clear",
    },
    Manual {
        name: "set",
        description: "Changes a kernel variable.",
        usage: "set [VARIABLE] [VALUE]",
    },
    Manual {
        name: "sysfetch",
        description: "Shows system information.",
        usage: "sysfetch",
    },
    Manual {
        name: "dmesg",
        description: "Shows the most recent kernel log lines.",
        usage: "dmesg [COUNT]",
    },
];

/// Execute one command line and return its output (possibly empty)
pub fn execute<D: Display>(sched: &mut Scheduler<D>, line: &str) -> String {
    let mut args = line.split_whitespace();
    let Some(command) = args.next() else {
        return String::new();
    };
    let args: Vec<&str> = args.collect();
    crate::log_debug!("[SHELL] {}", line.trim());

    match command {
        "help" => cmd_help(&args),
        "list" => cmd_list(sched, &args),
        "start" => cmd_start(sched, &args),
        "kill" => cmd_kill(sched, &args),
        "suicide" => cmd_suicide(sched),
        "clear" => cmd_clear(sched),
        "set" => cmd_set(sched, &args),
        "sysfetch" => cmd_sysfetch(sched),
        "dmesg" => cmd_dmesg(&args),
        _ => String::from("ERROR: Command not found"),
    }
}

fn cmd_help(args: &[&str]) -> String {
    let Some(topic) = args.first() else {
        let mut out = String::from("Type help [COMMAND] for information about COMMAND.\nCOMMAND:");
        for manual in MANUALS {
            let _ = write!(out, "\n    {} - {}", manual.name, manual.description);
        }
        return out;
    };

    match MANUALS.iter().find(|m| m.name == *topic) {
        Some(manual) if manual.name == "set" => format!(
            "NAME:\n    {} - {}\nSYNOPSIS:\n    {}\nVARIABLE:\n    {}",
            manual.name,
            manual.description,
            manual.usage,
            RUNTIME_SETTINGS.join(", ")
        ),
        Some(manual) => format!(
            "NAME:\n    {} - {}\nSYNOPSIS:\n    {}",
            manual.name, manual.description, manual.usage
        ),
        None => String::from("ERROR: Invalid value of COMMAND"),
    }
}

fn cmd_list<D: Display>(sched: &Scheduler<D>, args: &[&str]) -> String {
    match args.first() {
        Some(&"process") => {
            let mut out = format!("{:<24} {}", "TITLE", "ID");
            for process in sched.table.iter() {
                let _ = write!(out, "\n{:<24} {}", process.title(), process.pid());
            }
            out
        }
        _ => String::from("ERROR: List not found"),
    }
}

fn cmd_start<D: Display>(sched: &mut Scheduler<D>, args: &[&str]) -> String {
    let Some(name) = args.first() else {
        return String::from("ERROR: Process not found");
    };
    match crate::programs::start(&mut sched.table, name) {
        Ok(pid) => pid.to_string(),
        Err(KernelError::UnknownProgram) => String::from("ERROR: Process not found"),
        Err(e) => format!("ERROR: {}", e),
    }
}

fn cmd_kill<D: Display>(sched: &mut Scheduler<D>, args: &[&str]) -> String {
    let killed = args
        .first()
        .and_then(|arg| arg.parse::<Pid>().ok())
        .map_or(false, |pid| sched.table.kill(pid));
    if killed {
        String::from("Process killed")
    } else {
        String::from("ERROR: Could not kill process")
    }
}

fn cmd_suicide<D: Display>(sched: &mut Scheduler<D>) -> String {
    if let Some(pid) = sched.table.focused() {
        sched.table.kill(pid);
    }
    String::new()
}

fn cmd_clear<D: Display>(sched: &mut Scheduler<D>) -> String {
    if let Some(pid) = sched.table.focused() {
        sched.table.deliver(pid, &Message::Clear);
    }
    String::new()
}

fn cmd_set<D: Display>(sched: &mut Scheduler<D>, args: &[&str]) -> String {
    let (Some(&key), Some(&value)) = (args.first(), args.get(1)) else {
        return String::from("ERROR: Expected [VARIABLE] [VALUE]");
    };
    if !RUNTIME_SETTINGS.contains(&key) {
        return String::from("ERROR: Variable not found");
    }
    match sched.config.set(key, value) {
        Ok(()) => {
            sched.apply_config();
            crate::log!("[SHELL] {} = {}", key, value);
            String::from("Variable set")
        }
        Err(e) => format!("ERROR: {}", e),
    }
}

fn cmd_sysfetch<D: Display>(sched: &Scheduler<D>) -> String {
    let clock = sched.table.clock();
    let screen = sched.table.screen();
    let mut out = String::new();
    let _ = writeln!(out, "OS: {}", crate::VERSION);
    let _ = writeln!(out, "Screen: {}x{}", screen.w, screen.h);
    let _ = writeln!(out, "Ticks: {}", clock.ticks);
    let _ = writeln!(out, "Uptime: {} s", clock.uptime_secs());
    let _ = writeln!(out, "Process Amount: {}", sched.table.len());
    let _ = writeln!(out, "Framebuffers: {} KB", sched.table.framebuffer_bytes() / 1024);
    let _ = write!(out, "Frames: {}", sched.compositor.frames());
    out
}

fn cmd_dmesg(args: &[&str]) -> String {
    let count = args
        .first()
        .and_then(|arg| arg.parse::<usize>().ok())
        .unwrap_or(DMESG_DEFAULT_LINES);
    let lines = crate::logger::dmesg();
    let skip = lines.len().saturating_sub(count);
    lines[skip..].join("\n")
}
