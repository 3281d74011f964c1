//! PS/2 keyboard, scancode set 1
//!
//! Translates make codes to ASCII key codes and queues them for the next
//! scheduler cycle. Extended keys and key releases are dropped apart from
//! the modifier state they carry.

use alloc::vec::Vec;
use spin::Mutex;

use lumen_kernel::message::KeyCode;

/// Keys buffered between two polls; extra presses are dropped
const BUFFER_SIZE: usize = 128;

/// US layout, unshifted
const SCANCODE_TO_ASCII: [u8; 0x3A] = [
    0, 0x1B, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08, b'\t',
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n', 0,
    b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0,
    b'\\', b'z', b'x', b'c', b'v', b'b', b'n', b'm', b',', b'.', b'/', 0, b'*', 0, b' ',
];

/// US layout, shifted
const SCANCODE_TO_ASCII_SHIFT: [u8; 0x3A] = [
    0, 0x1B, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 0x08, b'\t',
    b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n', 0,
    b'A', b'S', b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~', 0,
    b'|', b'Z', b'X', b'C', b'V', b'B', b'N', b'M', b'<', b'>', b'?', 0, b'*', 0, b' ',
];

const LEFT_SHIFT: u8 = 0x2A;
const RIGHT_SHIFT: u8 = 0x36;
const CAPS_LOCK: u8 = 0x3A;
/// Prefix of two-byte scancodes
const EXTENDED: u8 = 0xE0;

struct Keyboard {
    shift: bool,
    caps_lock: bool,
    extended: bool,
    pending: Vec<KeyCode>,
}

impl Keyboard {
    const fn new() -> Self {
        Self { shift: false, caps_lock: false, extended: false, pending: Vec::new() }
    }

    fn feed(&mut self, scancode: u8) {
        // Controller replies (ACK, resend, error, echo)
        if matches!(scancode, 0x00 | 0xFA | 0xFC | 0xFE | 0xEE | 0xFF) {
            return;
        }
        if scancode == EXTENDED {
            self.extended = true;
            return;
        }
        let extended = core::mem::take(&mut self.extended);
        let released = scancode & 0x80 != 0;
        let key = scancode & 0x7F;

        match key {
            LEFT_SHIFT | RIGHT_SHIFT if !extended => self.shift = !released,
            CAPS_LOCK if !released => self.caps_lock = !self.caps_lock,
            _ if released || extended => {}
            _ => {
                if let Some(ascii) = self.translate(key) {
                    if self.pending.len() < BUFFER_SIZE {
                        self.pending.push(ascii);
                    }
                }
            }
        }
    }

    fn translate(&self, key: u8) -> Option<KeyCode> {
        let table = if self.shift { &SCANCODE_TO_ASCII_SHIFT } else { &SCANCODE_TO_ASCII };
        let ascii = *table.get(key as usize)?;
        if ascii == 0 {
            return None;
        }
        // Caps lock inverts the case of letters only
        Some(if self.caps_lock && ascii.is_ascii_alphabetic() {
            ascii ^ 0x20
        } else {
            ascii
        })
    }
}

static KEYBOARD: Mutex<Keyboard> = Mutex::new(Keyboard::new());

/// Called from IRQ1
pub fn handle_scancode(scancode: u8) {
    KEYBOARD.lock().feed(scancode);
}

/// Keys pressed since the last call, oldest first
pub fn drain() -> Vec<KeyCode> {
    core::mem::take(&mut KEYBOARD.lock().pending)
}
