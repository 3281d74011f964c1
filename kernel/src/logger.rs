//! Kernel logging subsystem
//!
//! Leveled logging with tick timestamps. Every line is captured into a
//! bounded `dmesg` ring; an optional writer (the serial port on hardware)
//! receives the same text.

use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use spin::Mutex;

/// Global tick counter for timestamps
static TICK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Minimum level that reaches the sinks
static MIN_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Lines kept by the dmesg ring
pub const DMESG_CAPACITY: usize = 256;

static DMESG: Mutex<VecDeque<String>> = Mutex::new(VecDeque::new());

/// Raw writer installed by the platform (serial port)
static WRITER: Mutex<Option<fn(fmt::Arguments)>> = Mutex::new(None);

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO ",
            LogLevel::Warn => "WARN ",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Parse a level name as written on the command line or by `set loglevel`
    pub fn parse(name: &str) -> Option<LogLevel> {
        match name {
            "trace" | "0" => Some(LogLevel::Trace),
            "debug" | "1" => Some(LogLevel::Debug),
            "info" | "2" => Some(LogLevel::Info),
            "warn" | "3" => Some(LogLevel::Warn),
            "error" | "4" => Some(LogLevel::Error),
            "fatal" | "5" => Some(LogLevel::Fatal),
            _ => None,
        }
    }

    fn from_u8(value: u8) -> LogLevel {
        match value {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Fatal,
        }
    }
}

/// Get current tick count as timestamp
pub fn get_timestamp() -> u64 {
    TICK_COUNTER.load(Ordering::Relaxed)
}

/// Alias for get_timestamp
pub fn get_ticks() -> u64 {
    get_timestamp()
}

/// Increment tick counter (called by timer interrupt)
pub fn tick() {
    TICK_COUNTER.fetch_add(1, Ordering::Relaxed);
}

/// Set the minimum level that is recorded
pub fn set_level(level: LogLevel) {
    MIN_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn level() -> LogLevel {
    LogLevel::from_u8(MIN_LEVEL.load(Ordering::Relaxed))
}

/// Route log output to a raw writer in addition to the dmesg ring
pub fn set_writer(writer: fn(fmt::Arguments)) {
    *WRITER.lock() = Some(writer);
}

/// Copy of the dmesg ring, oldest line first
pub fn dmesg() -> Vec<String> {
    DMESG.lock().iter().cloned().collect()
}

/// Internal log function
#[doc(hidden)]
pub fn _log(level: LogLevel, args: fmt::Arguments) {
    if level < self::level() {
        return;
    }

    let line = format!("[{:>10}][{}] {}", get_timestamp(), level.as_str(), args);

    if let Some(writer) = *WRITER.lock() {
        writer(format_args!("{}\n", line));
    }

    let mut ring = DMESG.lock();
    if ring.len() >= DMESG_CAPACITY {
        ring.pop_front();
    }
    ring.push_back(line);
}

/// Log macro with level
#[macro_export]
macro_rules! log_level {
    ($level:expr, $($arg:tt)*) => {
        $crate::logger::_log($level, format_args!($($arg)*))
    };
}

/// Info log (default)
#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        $crate::log_level!($crate::logger::LogLevel::Info, $($arg)*)
    };
}

/// Trace log
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        $crate::log_level!($crate::logger::LogLevel::Trace, $($arg)*)
    };
}

/// Debug log
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::log_level!($crate::logger::LogLevel::Debug, $($arg)*)
    };
}

/// Warning log
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::log_level!($crate::logger::LogLevel::Warn, $($arg)*)
    };
}

/// Error log
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::log_level!($crate::logger::LogLevel::Error, $($arg)*)
    };
}
