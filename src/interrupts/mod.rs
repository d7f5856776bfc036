//! # Interrupt Handling
//!
//! Vector table construction, controller (PIC) driving and the common
//! dispatch path from a hardware event to its owning driver.
//!
//! ## Vector Layout
//!
//! | Vector | Type                 | Owner                       |
//! |--------|----------------------|-----------------------------|
//! | 0-31   | CPU exception        | `Dispatcher::handle_exception` |
//! | 32     | Timer (IRQ0)         | tick counter                |
//! | 33     | Keyboard (IRQ1)      | scancode decoder            |
//! | 34-47  | Other IRQ lines      | acknowledged, ignored       |
//! | 48-255 | Absent               | —                           |
//!
//! The 32-vector remap offset is a wire-format contract with the
//! controller's vector-base registers and must not change.

pub mod dispatch;
pub mod idt;
pub mod pic;

pub use dispatch::{Dispatcher, FaultAction};

/// Number of CPU exception vectors (0-31).
pub const EXCEPTION_COUNT: usize = 32;

/// Number of hardware request lines across both controllers.
pub const IRQ_LINES: usize = 16;

/// First vector assigned to a request line: line `n` fires vector
/// `IRQ_BASE + n`.
pub const IRQ_BASE: u8 = 32;

/// Total vector table entries.
pub const VECTOR_COUNT: usize = 256;
