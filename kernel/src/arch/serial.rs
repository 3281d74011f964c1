//! COM1 debug console (UART 16550)

use core::fmt::{self, Write};
use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;

/// COM1 base I/O port
const COM1: u16 = 0x3F8;

lazy_static! {
    static ref SERIAL: Mutex<SerialPort> = {
        let mut port = unsafe { SerialPort::new(COM1) };
        port.init();
        Mutex::new(port)
    };
}

/// Program the UART; safe to call more than once
pub fn init() {
    lazy_static::initialize(&SERIAL);
}

/// Write formatted text to COM1. Used as the logger writer.
pub fn print(args: fmt::Arguments) {
    x86_64::instructions::interrupts::without_interrupts(|| {
        // The UART never reports a write error
        let _ = SERIAL.lock().write_fmt(args);
    });
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::arch::serial::print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)));
}
