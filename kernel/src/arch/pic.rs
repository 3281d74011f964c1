//! Programmable Interrupt Controller (8259 PIC)
//!
//! Remaps the legacy PICs above the CPU exceptions and unmasks only the
//! timer, keyboard, cascade and mouse lines.

use spin::Mutex;
use x86_64::instructions::port::Port;

const PIC1_COMMAND: u16 = 0x20;
const PIC1_DATA: u16 = 0x21;
const PIC2_COMMAND: u16 = 0xA0;
const PIC2_DATA: u16 = 0xA1;

/// End of interrupt command
const PIC_EOI: u8 = 0x20;

const PIC1_OFFSET: u8 = 32;
const PIC2_OFFSET: u8 = PIC1_OFFSET + 8;

/// Hardware interrupt vectors
#[derive(Debug, Clone, Copy)]
#[repr(u8)]
pub enum InterruptIndex {
    Timer = PIC1_OFFSET,
    Keyboard = PIC1_OFFSET + 1,
    /// IRQ12, line 4 of the secondary PIC
    Mouse = PIC2_OFFSET + 4,
}

impl InterruptIndex {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_usize(self) -> usize {
        self as usize
    }
}

pub struct ChainedPics {
    pics: [Pic; 2],
}

impl ChainedPics {
    pub const fn new() -> Self {
        Self {
            pics: [
                Pic::new(PIC1_COMMAND, PIC1_DATA, PIC1_OFFSET),
                Pic::new(PIC2_COMMAND, PIC2_DATA, PIC2_OFFSET),
            ],
        }
    }

    /// Run the ICW1-ICW4 sequence and apply the IRQ masks
    pub unsafe fn initialize(&mut self) {
        let [primary, secondary] = &mut self.pics;

        primary.command.write(0x11);
        secondary.command.write(0x11);

        primary.data.write(primary.offset);
        secondary.data.write(secondary.offset);

        // Secondary hangs off IRQ2
        primary.data.write(4);
        secondary.data.write(2);

        primary.data.write(0x01);
        secondary.data.write(0x01);

        // IRQ0 timer, IRQ1 keyboard, IRQ2 cascade
        primary.data.write(0b1111_1000);
        // IRQ12 mouse
        secondary.data.write(0b1110_1111);
    }

    pub unsafe fn notify_end_of_interrupt(&mut self, vector: u8) {
        if vector >= self.pics[1].offset {
            self.pics[1].command.write(PIC_EOI);
        }
        self.pics[0].command.write(PIC_EOI);
    }
}

struct Pic {
    command: Port<u8>,
    data: Port<u8>,
    offset: u8,
}

impl Pic {
    const fn new(command: u16, data: u16, offset: u8) -> Self {
        Self {
            command: Port::new(command),
            data: Port::new(data),
            offset,
        }
    }
}

pub static PICS: Mutex<ChainedPics> = Mutex::new(ChainedPics::new());
