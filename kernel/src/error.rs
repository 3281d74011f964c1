//! Kernel error type

use core::fmt;

/// Failures reported by the process layer. None of them are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Control block or framebuffer could not be allocated
    OutOfMemory,
    /// Process table already holds `max_processes` entries
    TableFull,
    /// Zero-sized window
    InvalidGeometry,
    /// No program registered under that name
    UnknownProgram,
}

impl KernelError {
    pub fn as_str(&self) -> &'static str {
        match self {
            KernelError::OutOfMemory => "out of memory",
            KernelError::TableFull => "process table full",
            KernelError::InvalidGeometry => "invalid window geometry",
            KernelError::UnknownProgram => "program not found",
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
