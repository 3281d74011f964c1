//! x86_64 platform layer for the boot image
//!
//! Everything here touches hardware: COM1, the 8259 PICs, the PIT, the PS/2
//! controller and the Limine framebuffer. The kernel library only sees it
//! through `Display`, `Devices` and the logger writer.

pub mod display;
pub mod heap;
pub mod interrupts;
pub mod keyboard;
pub mod mouse;
pub mod pic;
pub mod pit;
pub mod serial;

use lumen_kernel::scheduler::{CycleInput, Devices};

/// Interrupt-fed input sources drained by the scheduler loop
pub struct HardwareDevices {
    /// Tick count at the previous poll
    seen_ticks: u64,
}

impl HardwareDevices {
    pub fn new() -> Self {
        Self { seen_ticks: pit::ticks() }
    }
}

impl Devices for HardwareDevices {
    fn poll(&mut self) -> CycleInput {
        // Drain with interrupts off so a half-received packet is never split
        x86_64::instructions::interrupts::without_interrupts(|| {
            let now = pit::ticks();
            let ticks = now.wrapping_sub(self.seen_ticks);
            self.seen_ticks = now;
            CycleInput {
                ticks,
                mouse: mouse::take_snapshot(),
                keys: keyboard::drain(),
            }
        })
    }

    fn wait(&mut self) {
        // Sleeps until the next IRQ; the timer guarantees one per tick
        x86_64::instructions::interrupts::enable_and_hlt();
    }
}

/// Stop the CPU for good
pub fn halt_loop() -> ! {
    loop {
        x86_64::instructions::interrupts::disable();
        x86_64::instructions::hlt();
    }
}
