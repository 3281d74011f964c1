//! Lumen Kernel: process and window layer
//!
//! A cooperative, single-address-space desktop kernel. Processes are
//! message-driven procedures that own a private framebuffer; the scheduler
//! routes ticks, mouse and keyboard input to them by z-order and focus, then
//! composites every framebuffer into the shared screen buffer.
//!
//! The library is `no_std` + `alloc` so the same code runs inside the
//! bare-metal image (`src/main.rs`, feature `bare-metal`) and under host tests.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod logger;
pub mod error;
pub mod config;
pub mod graphics;
pub mod message;
pub mod process;
pub mod compositor;
pub mod input;
pub mod scheduler;
pub mod shell;
pub mod programs;

pub use config::KernelConfig;
pub use error::KernelError;
pub use message::{KernelRequest, Message, MouseInfo, Response};
pub use process::{Geometry, Pid, Process, ProcessContext, ProcessInfo, ProcessTable, WindowKind};
pub use scheduler::{CycleInput, Devices, LoopState, Scheduler};

/// Kernel version string shown by `sysfetch`
pub const VERSION: &str = "Lumen 0.1.0";
