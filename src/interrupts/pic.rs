//! # Programmable Interrupt Controller (8259 PIC)
//!
//! Drives the chained legacy PICs: the four-step initialization
//! sequence that remaps request lines away from the exception vectors,
//! per-line masking, and the end-of-interrupt acknowledgement.
//!
//! ## PIC Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │  Primary    │◀────│  Secondary  │
//! │  IRQ 0-7    │     │  IRQ 8-15   │
//! └─────────────┘     └─────────────┘
//!       │                (cascaded at line 2)
//!       ▼
//!     CPU
//! ```
//!
//! ## Vector Remapping
//!
//! By default, IRQ 0-15 conflict with CPU exception vectors. We remap
//! them:
//! - Primary: vectors 32-39 (IRQ 0-7)
//! - Secondary: vectors 40-47 (IRQ 8-15)

use crate::port::PortBus;

pub const PIC_1_OFFSET: u8 = 32; // Primary PIC handles IRQs 0-7
pub const PIC_2_OFFSET: u8 = 40; // Secondary PIC handles IRQs 8-15

const PIC_1_COMMAND: u16 = 0x20;
const PIC_1_DATA: u16 = 0x21;
const PIC_2_COMMAND: u16 = 0xA0;
const PIC_2_DATA: u16 = 0xA1;

const ICW1_INIT: u8 = 0x10;
const ICW1_ICW4_NEEDED: u8 = 0x01;
const ICW3_CASCADE_AT_LINE_2: u8 = 0x04; // primary: bit mask of the cascade line
const ICW3_CASCADE_IDENTITY: u8 = 0x02; // secondary: its identity on the cascade
const ICW4_8086_MODE: u8 = 0x01;
const EOI: u8 = 0x20;

/// Boot masks: everything disabled except timer (line 0) and keyboard
/// (line 1).
const INITIAL_PRIMARY_MASK: u8 = 0xFC;
const INITIAL_SECONDARY_MASK: u8 = 0xFF;

/// Driver for the chained pair of controllers.
pub struct Pics {
    primary_offset: u8,
    secondary_offset: u8,
}

impl Pics {
    pub const fn new(primary_offset: u8, secondary_offset: u8) -> Self {
        Self {
            primary_offset,
            secondary_offset,
        }
    }

    /// Run the four-step initialization-command-word sequence on both
    /// controllers, then install the boot masks.
    ///
    /// The ordering is load-bearing: any data-port write before the
    /// full ICW1-ICW4 sequence leaves the controller in an undefined
    /// state, so the masks are written strictly last.
    pub fn initialize<B: PortBus>(&self, bus: &mut B) {
        // ICW1: begin initialization, ICW4 will follow.
        bus.write_byte(PIC_1_COMMAND, ICW1_INIT | ICW1_ICW4_NEEDED);
        bus.write_byte(PIC_2_COMMAND, ICW1_INIT | ICW1_ICW4_NEEDED);

        // ICW2: vector remap bases.
        bus.write_byte(PIC_1_DATA, self.primary_offset);
        bus.write_byte(PIC_2_DATA, self.secondary_offset);

        // ICW3: cascade wiring, secondary attached at the primary's line 2.
        bus.write_byte(PIC_1_DATA, ICW3_CASCADE_AT_LINE_2);
        bus.write_byte(PIC_2_DATA, ICW3_CASCADE_IDENTITY);

        // ICW4: 8086-compatible operating mode.
        bus.write_byte(PIC_1_DATA, ICW4_8086_MODE);
        bus.write_byte(PIC_2_DATA, ICW4_8086_MODE);

        bus.write_byte(PIC_1_DATA, INITIAL_PRIMARY_MASK);
        bus.write_byte(PIC_2_DATA, INITIAL_SECONDARY_MASK);
    }

    /// Unmask request line `line` (0-15). Out-of-range lines are a no-op.
    pub fn enable_line<B: PortBus>(&self, bus: &mut B, line: u8) {
        if line > 15 {
            return;
        }
        let port = self.mask_port(line);
        let mask = bus.read_byte(port);
        bus.write_byte(port, mask & !(1 << (line % 8)));
    }

    /// Mask request line `line` (0-15). Out-of-range lines are a no-op.
    pub fn disable_line<B: PortBus>(&self, bus: &mut B, line: u8) {
        if line > 15 {
            return;
        }
        let port = self.mask_port(line);
        let mask = bus.read_byte(port);
        bus.write_byte(port, mask | (1 << (line % 8)));
    }

    /// Send the end-of-interrupt code for `line`.
    ///
    /// Lines owned by the secondary controller need the EOI on both
    /// chips; the primary always gets one. Must happen exactly once per
    /// dispatched event, after the device has been drained.
    pub fn acknowledge<B: PortBus>(&self, bus: &mut B, line: u8) {
        if line >= 8 {
            bus.write_byte(PIC_2_COMMAND, EOI);
        }
        bus.write_byte(PIC_1_COMMAND, EOI);
    }

    // Mask register of the controller owning `line`.
    fn mask_port(&self, line: u8) -> u16 {
        if line < 8 {
            PIC_1_DATA
        } else {
            PIC_2_DATA
        }
    }
}

impl Default for Pics {
    fn default() -> Self {
        Self::new(PIC_1_OFFSET, PIC_2_OFFSET)
    }
}
