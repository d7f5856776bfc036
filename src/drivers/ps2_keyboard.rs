//! # PS/2 Keyboard Decoder
//!
//! Stateful scan-code-to-character state machine fed one raw byte at a
//! time from the keyboard data port by the IRQ1 path.
//!
//! ## Decode Rules
//!
//! | Input                     | Effect                                |
//! |---------------------------|---------------------------------------|
//! | `0xE0` (extended prefix)  | recorded, no output                   |
//! | `0xF0` (set-2 break)      | next byte swallowed, no output        |
//! | shift make/break          | latch updated, no output              |
//! | any release (bit 7 set)   | no output                             |
//! | space/enter/backspace     | fixed character, shift ignored        |
//! | other make codes          | 58-entry set-1 layout table           |
//!
//! Unknown or unmapped codes are silently absorbed; a real keyboard
//! produces plenty of bytes nobody asked for. The decoder never fails
//! and "no character" is always `None`, never `'\0'`.
//!
//! Decoder state is owned by the IRQ1 handler; foreground code only
//! ever sees the [`KeyEvent`] values popped from the bounded queue.

const EXTENDED_PREFIX: u8 = 0xE0;
const BREAK_PREFIX: u8 = 0xF0;
const RELEASE_BIT: u8 = 0x80;

const LEFT_SHIFT: u8 = 0x2A;
const RIGHT_SHIFT: u8 = 0x36;
const SPACE: u8 = 0x39;
const ENTER: u8 = 0x1C;
const BACKSPACE: u8 = 0x0E;

// Scan code set 1 layout, indexed directly by key code (0x00-0x39).
// 0 marks codes with no printable character.
const UNSHIFTED: [u8; 0x3A] = [
    0, 0, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', // 0x00-0x09
    b'9', b'0', b'-', b'=', 0x08, b'\t', b'q', b'w', b'e', b'r', // 0x0A-0x13
    b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n', 0, // 0x14-0x1D
    b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', // 0x1E-0x25
    b'l', b';', b'\'', b'`', 0, b'\\', b'z', b'x', b'c', b'v', // 0x26-0x2F
    b'b', b'n', b'm', b',', b'.', b'/', 0, 0, b' ', 0, // 0x30-0x39
];

const SHIFTED: [u8; 0x3A] = [
    0, 0, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', // 0x00-0x09
    b'(', b')', b'_', b'+', 0x08, b'\t', b'Q', b'W', b'E', b'R', // 0x0A-0x13
    b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n', 0, // 0x14-0x1D
    b'A', b'S', b'D', b'F', b'G', b'H', b'J', b'K', // 0x1E-0x25
    b'L', b':', b'"', b'~', 0, b'|', b'Z', b'X', b'C', b'V', // 0x26-0x2F
    b'B', b'N', b'M', b'<', b'>', b'?', 0, 0, b' ', 0, // 0x30-0x39
];

/// A decoded unit of input, self-contained for the foreground consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub character: char,
    pub shift: bool,
}

impl KeyEvent {
    const EMPTY: Self = Self {
        character: '\0',
        shift: false,
    };
}

/// Scan-code state machine. State survives across bytes of the same
/// key transition; it is never reset between bytes.
pub struct ScancodeDecoder {
    shift_pressed: bool,
    expecting_break_code: bool,
    extended_pending: bool,
}

impl ScancodeDecoder {
    pub const fn new() -> Self {
        Self {
            shift_pressed: false,
            expecting_break_code: false,
            extended_pending: false,
        }
    }

    /// Restore the power-on state. Used when the keyboard controller is
    /// (re)initialized and stale prefix bytes may have been flushed.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Consume one raw byte, producing a key event when a key-down
    /// transition yields a character.
    pub fn decode(&mut self, raw: u8) -> Option<KeyEvent> {
        // Extended-key prefix: record it and wait for the next byte.
        if raw == EXTENDED_PREFIX {
            self.extended_pending = true;
            return None;
        }
        // The companion byte resolves the prefix. Extended keys share
        // the set-1 tables: keypad enter lands on 0x1C, keypad slash on
        // 0x35, and the navigation codes fall outside the table.
        if self.extended_pending {
            self.extended_pending = false;
        }

        // Set-2 break prefix: the byte after it is the released code.
        if raw == BREAK_PREFIX {
            self.expecting_break_code = true;
            return None;
        }
        if self.expecting_break_code {
            self.expecting_break_code = false;
            return None;
        }

        // Set-1 encodes release in bit 7.
        let released = raw & RELEASE_BIT != 0;
        let key_code = raw & !RELEASE_BIT;

        if key_code == LEFT_SHIFT || key_code == RIGHT_SHIFT {
            self.shift_pressed = !released;
            return None;
        }

        // Only key-down transitions yield characters.
        if released {
            return None;
        }

        // Space, enter and backspace must work whether or not shift is
        // latched.
        let byte = match key_code {
            SPACE => b' ',
            ENTER => b'\n',
            BACKSPACE => 0x08,
            code if (code as usize) < UNSHIFTED.len() => {
                if self.shift_pressed {
                    SHIFTED[code as usize]
                } else {
                    UNSHIFTED[code as usize]
                }
            }
            _ => 0,
        };

        if byte == 0 {
            return None;
        }
        Some(KeyEvent {
            character: byte as char,
            shift: self.shift_pressed,
        })
    }
}

impl Default for ScancodeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

const QUEUE_CAPACITY: usize = 64;

/// Bounded hand-off queue between the interrupt path and foreground
/// code. Enqueue is O(1); when full, the newest event is dropped.
/// One of the 64 slots stays free to distinguish full from empty, so
/// the queue holds up to 63 events.
pub struct KeyEventQueue {
    slots: [KeyEvent; QUEUE_CAPACITY],
    head: usize,
    tail: usize,
}

impl KeyEventQueue {
    pub const fn new() -> Self {
        Self {
            slots: [KeyEvent::EMPTY; QUEUE_CAPACITY],
            head: 0,
            tail: 0,
        }
    }

    pub fn push(&mut self, event: KeyEvent) {
        let next = (self.head + 1) % QUEUE_CAPACITY;
        if next == self.tail {
            return; // full, drop the newest
        }
        self.slots[self.head] = event;
        self.head = next;
    }

    pub fn pop(&mut self) -> Option<KeyEvent> {
        if self.tail == self.head {
            return None;
        }
        let event = self.slots[self.tail];
        self.tail = (self.tail + 1) % QUEUE_CAPACITY;
        Some(event)
    }

    pub fn is_empty(&self) -> bool {
        self.tail == self.head
    }
}

impl Default for KeyEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoder plus queue, owned by the IRQ1 handler.
pub struct KeyboardDriver {
    decoder: ScancodeDecoder,
    queue: KeyEventQueue,
}

impl KeyboardDriver {
    pub const fn new() -> Self {
        Self {
            decoder: ScancodeDecoder::new(),
            queue: KeyEventQueue::new(),
        }
    }

    /// Interrupt-path entry: decode one raw byte and enqueue any event.
    pub fn handle_byte(&mut self, raw: u8) {
        if let Some(event) = self.decoder.decode(raw) {
            self.queue.push(event);
        }
    }

    /// Foreground entry: next decoded event, non-blocking.
    pub fn next_event(&mut self) -> Option<KeyEvent> {
        self.queue.pop()
    }

    pub fn reset(&mut self) {
        self.decoder.reset();
    }
}

impl Default for KeyboardDriver {
    fn default() -> Self {
        Self::new()
    }
}
