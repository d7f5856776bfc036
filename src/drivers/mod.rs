//! Device Drivers
//!
//! This module contains drivers for the devices this layer owns:
//! - PS/2 keyboard scan-code decoder (IRQ1)
//! - Programmable interval timer (IRQ0)
//! - CMOS real-time clock (polled, no IRQ)

pub mod pit;
pub mod ps2_keyboard;
pub mod rtc;

pub use pit::Pit;
pub use ps2_keyboard::{KeyEvent, KeyboardDriver, ScancodeDecoder};
pub use rtc::{CmosClock, RtcError, RtcTime};
