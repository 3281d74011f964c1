//! Programmable Interval Timer, channel 0
//!
//! Drives the scheduler tick. The interrupt handler only bumps a counter;
//! the main loop turns elapsed ticks into one `Tick` pass per cycle.

use core::sync::atomic::{AtomicU64, Ordering};
use x86_64::instructions::port::Port;

const PIT_CHANNEL0: u16 = 0x40;
const PIT_COMMAND: u16 = 0x43;
/// Input clock of the PIT in Hz
const PIT_FREQUENCY: u32 = 1_193_182;

static TICKS: AtomicU64 = AtomicU64::new(0);

/// Reload value for `hz`, clamped to what the 16-bit counter can hold
pub fn divisor(hz: u32) -> u16 {
    if hz == 0 {
        return u16::MAX;
    }
    (PIT_FREQUENCY / hz).clamp(1, u16::MAX as u32) as u16
}

/// Program channel 0 as a rate generator at `hz`
pub fn init(hz: u32) {
    let divisor = divisor(hz);
    let mut command = Port::<u8>::new(PIT_COMMAND);
    let mut channel0 = Port::<u8>::new(PIT_CHANNEL0);
    unsafe {
        // Channel 0, lobyte/hibyte, mode 2
        command.write(0x34);
        channel0.write((divisor & 0xFF) as u8);
        channel0.write((divisor >> 8) as u8);
    }
}

/// Called from IRQ0
pub fn on_tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
    lumen_kernel::logger::tick();
}

pub fn ticks() -> u64 {
    TICKS.load(Ordering::Relaxed)
}
