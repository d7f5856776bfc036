//! # Dispatch Router
//!
//! The single portable entry point for every CPU exception and every
//! hardware request line. The architecture-specific trampoline saves
//! context, extracts `(vector_or_line, error_code)` and calls in here;
//! this module routes to the owning driver and guarantees the
//! controller is acknowledged exactly once per event.
//!
//! ## Routing
//!
//! | Event            | Action                                         |
//! |------------------|------------------------------------------------|
//! | Exception 0-31   | report to the diagnostic sink; halt unless #PF |
//! | Line 0 (timer)   | advance the tick counter                       |
//! | Line 1 (keyboard)| drain one scancode byte, decode, enqueue       |
//! | Other lines      | absorbed (no owning driver yet)                |
//!
//! Every request-line path, matched or not, ends with the EOI. A line
//! that is never acknowledged never fires again; nothing here is
//! allowed to return early or panic across the interrupt boundary.

use core::fmt::Write;

use crate::drivers::pit::Pit;
use crate::drivers::ps2_keyboard::{KeyEvent, KeyboardDriver};
use crate::interrupts::pic::Pics;
use crate::port::PortBus;

const KEYBOARD_DATA_PORT: u16 = 0x60;
const PAGE_FAULT_VECTOR: u8 = 14;

/// Static names for the 32 exception vectors, for diagnostic output.
pub const EXCEPTION_NAMES: [&str; 32] = [
    "Divide by Zero",
    "Debug",
    "Non-Maskable Interrupt",
    "Breakpoint",
    "Overflow",
    "Bound Range Exceeded",
    "Invalid Opcode",
    "Device Not Available",
    "Double Fault",
    "Coprocessor Segment Overrun",
    "Invalid TSS",
    "Segment Not Present",
    "Stack Fault",
    "General Protection Fault",
    "Page Fault",
    "Reserved",
    "x87 FPU Error",
    "Alignment Check",
    "Machine Check",
    "SIMD Exception",
    "Virtualization",
    "Control Protection",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Hypervisor Injection",
    "VMM Communication",
    "Security Exception",
    "Reserved",
];

/// What the trampoline must do after an exception returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    /// Resume the interrupted code.
    Continue,
    /// Stop the processor with interrupts disabled.
    Halt,
}

/// Owns every piece of driver state the interrupt path mutates: the
/// controller driver, the tick counter and the keyboard decoder/queue.
/// Foreground code reaches that state only through the accessors below.
pub struct Dispatcher {
    pics: Pics,
    pit: Pit,
    keyboard: KeyboardDriver,
}

impl Dispatcher {
    pub const fn new() -> Self {
        Self {
            pics: Pics::new(super::pic::PIC_1_OFFSET, super::pic::PIC_2_OFFSET),
            pit: Pit::new(),
            keyboard: KeyboardDriver::new(),
        }
    }

    /// Remap the controller, install the boot masks and program the
    /// timer to its default ~18.2 Hz rate. Run once, before interrupts
    /// are enabled.
    pub fn initialize<B: PortBus>(&mut self, bus: &mut B) {
        self.pics.initialize(bus);
        self.pit.program_default(bus);
        self.keyboard.reset();
    }

    /// Exception path (vectors 0-31).
    ///
    /// Reports the vector, its name and, for the vectors that carry
    /// one, the hardware error code. Page faults are reported but not
    /// fatal: their handling is an acknowledged gap, so execution
    /// continues. Everything else asks the trampoline to halt.
    pub fn handle_exception(
        &mut self,
        vector: u8,
        error_code: u32,
        diag: &mut dyn Write,
    ) -> FaultAction {
        let name = EXCEPTION_NAMES
            .get(vector as usize)
            .copied()
            .unwrap_or("Unknown");

        // The sink is best-effort; a broken display must not keep the
        // handler from returning.
        let _ = match super::idt::classify(vector) {
            super::idt::VectorClass::ExceptionWithErrorCode => writeln!(
                diag,
                "EXCEPTION {vector}: {name} (error code {error_code:#x})"
            ),
            _ => writeln!(diag, "EXCEPTION {vector}: {name}"),
        };

        if vector == PAGE_FAULT_VECTOR {
            FaultAction::Continue
        } else {
            FaultAction::Halt
        }
    }

    /// Request-line path (lines 0-15, vectors 32-47).
    pub fn handle_request_line<B: PortBus>(&mut self, line: u8, bus: &mut B) {
        match line {
            0 => self.pit.record_tick(),
            1 => {
                // Drain the data register before the EOI so the line
                // cannot re-fire against a full buffer.
                let scancode = bus.read_byte(KEYBOARD_DATA_PORT);
                self.keyboard.handle_byte(scancode);
            }
            // No owning driver; accept and acknowledge anyway.
            _ => {}
        }
        self.pics.acknowledge(bus, line);
    }

    /// Next decoded key event, non-blocking.
    pub fn next_key_event(&mut self) -> Option<KeyEvent> {
        self.keyboard.next_event()
    }

    pub fn pics(&self) -> &Pics {
        &self.pics
    }

    pub fn pit(&self) -> &Pit {
        &self.pit
    }

    pub fn ticks(&self) -> u64 {
        self.pit.ticks()
    }

    pub fn seconds(&self) -> u64 {
        self.pit.seconds()
    }

    pub fn milliseconds(&self) -> u64 {
        self.pit.milliseconds()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::fake::FakePortBus;

    const PIC_1_COMMAND: u16 = 0x20;
    const PIC_2_COMMAND: u16 = 0xA0;
    const EOI: u8 = 0x20;

    #[test]
    fn initialize_programs_the_controller_and_the_timer() {
        let mut dispatcher = Dispatcher::new();
        let mut bus = FakePortBus::new();
        dispatcher.initialize(&mut bus);

        // Both controllers get their ICW sequence...
        assert_eq!(bus.writes_to(PIC_1_COMMAND)[0], 0x11);
        assert_eq!(bus.writes_to(PIC_2_COMMAND)[0], 0x11);
        // ...and channel 0 is programmed to the default rate.
        assert_eq!(bus.writes_to(0x43), vec![0x36]);
        assert_eq!(bus.writes_to(0x40), vec![0, 0]);
    }

    #[test]
    fn timer_line_advances_ticks_and_acknowledges() {
        let mut dispatcher = Dispatcher::new();
        let mut bus = FakePortBus::new();

        dispatcher.handle_request_line(0, &mut bus);
        dispatcher.handle_request_line(0, &mut bus);

        assert_eq!(dispatcher.ticks(), 2);
        assert_eq!(bus.writes_to(PIC_1_COMMAND), vec![EOI, EOI]);
    }

    #[test]
    fn keyboard_line_drains_one_byte_and_queues_the_event() {
        let mut dispatcher = Dispatcher::new();
        let mut bus = FakePortBus::new();
        bus.script_read(0x60, 0x1E); // 'a' make code

        dispatcher.handle_request_line(1, &mut bus);

        let event = dispatcher.next_key_event().unwrap();
        assert_eq!(event.character, 'a');
        assert_eq!(dispatcher.next_key_event(), None);
        assert_eq!(bus.writes_to(PIC_1_COMMAND), vec![EOI]);
    }

    #[test]
    fn every_line_is_acknowledged_exactly_once() {
        let mut dispatcher = Dispatcher::new();
        for line in 0..16u8 {
            let mut bus = FakePortBus::new();
            dispatcher.handle_request_line(line, &mut bus);

            assert_eq!(bus.writes_to(PIC_1_COMMAND), vec![EOI], "line {line}");
            let secondary = bus.writes_to(PIC_2_COMMAND);
            if line >= 8 {
                assert_eq!(secondary, vec![EOI], "line {line}");
            } else {
                assert!(secondary.is_empty(), "line {line}");
            }
        }
    }

    #[test]
    fn unowned_lines_are_absorbed() {
        let mut dispatcher = Dispatcher::new();
        let mut bus = FakePortBus::new();

        dispatcher.handle_request_line(7, &mut bus);
        dispatcher.handle_request_line(12, &mut bus);

        assert_eq!(dispatcher.ticks(), 0);
        assert_eq!(dispatcher.next_key_event(), None);
    }

    #[test]
    fn page_fault_reports_but_continues() {
        let mut dispatcher = Dispatcher::new();
        let mut diag = String::new();

        let action = dispatcher.handle_exception(14, 0x2, &mut diag);
        assert_eq!(action, FaultAction::Continue);
        assert!(diag.contains("Page Fault"));
        assert!(diag.contains("0x2"));
    }

    #[test]
    fn all_other_exceptions_halt_after_reporting() {
        let mut dispatcher = Dispatcher::new();
        for vector in (0..32u8).filter(|v| *v != 14) {
            let mut diag = String::new();
            let action = dispatcher.handle_exception(vector, 0, &mut diag);
            assert_eq!(action, FaultAction::Halt, "vector {vector}");
            assert!(diag.contains(&format!("EXCEPTION {vector}")));
        }
    }

    #[test]
    fn error_code_is_reported_only_for_vectors_that_carry_one() {
        let mut dispatcher = Dispatcher::new();

        let mut diag = String::new();
        dispatcher.handle_exception(13, 0x10, &mut diag);
        assert!(diag.contains("General Protection Fault"));
        assert!(diag.contains("error code 0x10"));

        let mut diag = String::new();
        dispatcher.handle_exception(0, 0x10, &mut diag);
        assert!(diag.contains("Divide by Zero"));
        assert!(!diag.contains("error code"));
    }

    #[test]
    fn tick_projections_flow_through() {
        let mut dispatcher = Dispatcher::new();
        let mut bus = FakePortBus::new();
        for _ in 0..182 {
            dispatcher.handle_request_line(0, &mut bus);
        }
        assert_eq!(dispatcher.seconds(), 10);
        assert_eq!(dispatcher.milliseconds(), 182 * 549 / 10);
    }
}
