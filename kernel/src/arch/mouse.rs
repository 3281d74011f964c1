//! PS/2 mouse
//!
//! Standard three-byte packets. The IRQ handler assembles packets and
//! moves an absolute cursor clamped to the screen; the scheduler takes the
//! latest snapshot once per cycle.

use spin::Mutex;
use x86_64::instructions::port::Port;

use lumen_kernel::graphics::Point;
use lumen_kernel::message::MouseInfo;

const PS2_DATA: u16 = 0x60;
const PS2_STATUS: u16 = 0x64;
const PS2_COMMAND: u16 = 0x64;

struct Mouse {
    packet: [u8; 3],
    index: usize,
    width: i32,
    height: i32,
    state: MouseInfo,
    /// A packet arrived since the last snapshot
    changed: bool,
}

impl Mouse {
    const fn new() -> Self {
        Self {
            packet: [0; 3],
            index: 0,
            width: 1,
            height: 1,
            state: MouseInfo {
                position: Point::new(0, 0),
                left_held: false,
                middle_held: false,
                right_held: false,
            },
            changed: false,
        }
    }

    fn feed(&mut self, byte: u8) {
        // Bit 3 is always set in the first byte; resync on anything else
        if self.index == 0 && byte & 0x08 == 0 {
            return;
        }
        self.packet[self.index] = byte;
        self.index += 1;
        if self.index < self.packet.len() {
            return;
        }
        self.index = 0;

        let [flags, dx, dy] = self.packet;
        // Overflowed deltas are garbage
        if flags & 0xC0 != 0 {
            return;
        }
        let dx = dx as i8 as i32;
        let dy = dy as i8 as i32;

        let position = self.state.position;
        self.state = MouseInfo {
            // PS/2 reports y growing upwards
            position: Point::new(
                (position.x + dx).clamp(0, self.width - 1),
                (position.y - dy).clamp(0, self.height - 1),
            ),
            left_held: flags & 0x01 != 0,
            right_held: flags & 0x02 != 0,
            middle_held: flags & 0x04 != 0,
        };
        self.changed = true;
    }
}

static MOUSE: Mutex<Mouse> = Mutex::new(Mouse::new());

fn wait_read() {
    let mut status = Port::<u8>::new(PS2_STATUS);
    for _ in 0..100_000 {
        if unsafe { status.read() } & 0x01 != 0 {
            return;
        }
        core::hint::spin_loop();
    }
}

fn wait_write() {
    let mut status = Port::<u8>::new(PS2_STATUS);
    for _ in 0..100_000 {
        if unsafe { status.read() } & 0x02 == 0 {
            return;
        }
        core::hint::spin_loop();
    }
}

fn ps2_command(cmd: u8) {
    wait_write();
    unsafe { Port::<u8>::new(PS2_COMMAND).write(cmd) }
}

fn ps2_write(data: u8) {
    wait_write();
    unsafe { Port::<u8>::new(PS2_DATA).write(data) }
}

fn ps2_read() -> u8 {
    wait_read();
    unsafe { Port::<u8>::new(PS2_DATA).read() }
}

/// Send a command byte to the mouse and swallow the ACK
fn mouse_write(cmd: u8) {
    ps2_command(0xD4);
    ps2_write(cmd);
    ps2_read();
}

/// Enable the auxiliary port and start streaming. The cursor starts in the
/// middle of a `width` x `height` screen. Run before interrupts are enabled.
pub fn init(width: u32, height: u32) {
    {
        let mut mouse = MOUSE.lock();
        mouse.width = width.max(1) as i32;
        mouse.height = height.max(1) as i32;
        mouse.state.position = Point::new(mouse.width / 2, mouse.height / 2);
        mouse.changed = true;
    }

    ps2_command(0xA8);

    // Enable IRQ12, keep the mouse clock running
    ps2_command(0x20);
    let status = (ps2_read() | 0x02) & !0x20;
    ps2_command(0x60);
    ps2_write(status);

    // Defaults, then data reporting on
    mouse_write(0xF6);
    mouse_write(0xF4);

    lumen_kernel::log!("[MOUSE] PS/2 mouse initialized ({}x{})", width, height);
}

/// Called from IRQ12
pub fn handle_byte(byte: u8) {
    MOUSE.lock().feed(byte);
}

/// Latest state if anything arrived since the previous call
pub fn take_snapshot() -> Option<MouseInfo> {
    let mut mouse = MOUSE.lock();
    core::mem::take(&mut mouse.changed).then_some(mouse.state)
}
