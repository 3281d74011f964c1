//! Kernel configuration
//!
//! Defaults are compiled in; the bootloader command line can override them
//! with `key=value` pairs, and the shell `set` command changes the runtime
//! subset.

use crate::logger::LogLevel;

/// Keys the shell may change while the desktop is running
pub const RUNTIME_SETTINGS: &[&str] = &["drawmouse", "background", "loglevel", "maxproc"];

/// Kernel configuration
#[derive(Clone, Debug)]
pub struct KernelConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    /// PIT frequency, also used to turn ticks into seconds
    pub tick_hz: u32,
    /// Color behind every window and of cleared framebuffers
    pub background: u32,
    /// Draw the mouse cursor on top of every window
    pub draw_mouse: bool,
    pub max_processes: usize,
    /// Upper bound on the sum of all process framebuffers, in bytes
    pub framebuffer_budget: usize,
    pub log_level: LogLevel,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            screen_width: 1280,
            screen_height: 800,
            tick_hz: 100,
            background: 0xFF1E2A36,
            draw_mouse: true,
            max_processes: 64,
            framebuffer_budget: 64 * 1024 * 1024,
            log_level: LogLevel::Info,
        }
    }
}

impl KernelConfig {
    /// Configuration for a screen of the given size, other values default
    pub fn with_screen(width: u32, height: u32) -> Self {
        Self {
            screen_width: width,
            screen_height: height,
            ..Self::default()
        }
    }

    /// Apply `key=value` pairs separated by whitespace. Unknown keys and bad
    /// values are logged and skipped. Returns how many pairs were applied.
    pub fn apply_cmdline(&mut self, cmdline: &str) -> usize {
        let mut applied = 0;
        for pair in cmdline.split_whitespace() {
            let Some((key, value)) = pair.split_once('=') else {
                crate::log_warn!("[CONFIG] Ignoring '{}': expected key=value", pair);
                continue;
            };
            match self.set(key, value) {
                Ok(()) => applied += 1,
                Err(e) => crate::log_warn!("[CONFIG] Ignoring '{}': {}", pair, e),
            }
        }
        applied
    }

    /// Set one variable by name
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), &'static str> {
        match key {
            "drawmouse" => self.draw_mouse = parse_bool(value).ok_or("expected 0 or 1")?,
            "background" => self.background = parse_color(value).ok_or("expected a color like 0x1E2A36")?,
            "loglevel" => self.log_level = LogLevel::parse(value).ok_or("unknown log level")?,
            "hz" => {
                let hz = value.parse::<u32>().map_err(|_| "expected a number")?;
                if hz == 0 {
                    return Err("frequency must be positive");
                }
                self.tick_hz = hz;
            }
            "maxproc" => self.max_processes = value.parse().map_err(|_| "expected a number")?,
            "fbbudget" => self.framebuffer_budget = value.parse().map_err(|_| "expected a number")?,
            _ => return Err("variable not found"),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Parse `0xRRGGBB`, `#RRGGBB` or `0xAARRGGBB`. Six-digit forms are opaque.
fn parse_color(value: &str) -> Option<u32> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix('#'))
        .unwrap_or(value);
    let raw = u32::from_str_radix(digits, 16).ok()?;
    match digits.len() {
        6 => Some(0xFF00_0000 | raw),
        8 => Some(raw),
        _ => None,
    }
}
