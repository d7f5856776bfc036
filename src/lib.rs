//! # rustic-os: hardware-interrupt and device-input layer
//!
//! The interrupt plumbing of a small educational 32-bit kernel: vector
//! table construction, PIC remapping and acknowledgement, the common
//! dispatch path from a hardware event to its driver, and the three
//! device decoders that sit on top — PS/2 keyboard, interval timer and
//! CMOS clock.
//!
//! ## Layout
//!
//! | Module       | Owns                                              |
//! |--------------|---------------------------------------------------|
//! | `port`       | the `PortBus` seam all hardware access goes through |
//! | `interrupts` | vector table, PIC driver, dispatch router         |
//! | `drivers`    | keyboard decoder, PIT tick counter, RTC reader    |
//! | `arch`       | x86 bindings, serial diagnostics, global wiring   |
//!
//! The filesystem, shell, display and allocator are external
//! collaborators: they consume key events and tick counts from here
//! and never reach past the seams.
//!
//! ## Usage
//!
//! ```ignore
//! rustic_os::arch::init();              // remap PIC, reset drivers
//! rustic_os::arch::enable_interrupts(); // from here on IRQs dispatch
//!
//! while let Some(event) = rustic_os::arch::next_key_event() {
//!     shell.process_input(event.character);
//! }
//! ```

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod drivers;
pub mod interrupts;
pub mod port;

pub use drivers::{CmosClock, KeyEvent, Pit, RtcError, RtcTime, ScancodeDecoder};
pub use interrupts::{Dispatcher, FaultAction};
pub use port::PortBus;
