//! # Platform Adapter (x86)
//!
//! Everything that touches real CPU state lives here: the port
//! instruction binding, interrupt-flag control, the halt loop, the
//! serial diagnostic sink and the global dispatcher the assembly
//! trampolines call into. The portable modules receive only plain
//! values and the [`PortBus`](crate::port::PortBus) seam; nothing
//! outside this file executes a privileged instruction.
//!
//! The register save/restore trampolines themselves are assembly and
//! live with the boot code; their contract is the two `extern "C"`
//! entry points below, reached after the vector/line number (and error
//! code, when the vector pushes one) have been extracted.

/// Run `f` with interrupts masked, restoring the previous state after.
///
/// Handlers rely on this property explicitly: it is not automatic in
/// every target environment.
#[cfg(all(target_arch = "x86_64", not(test)))]
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    x86_64::instructions::interrupts::without_interrupts(f)
}

/// Hosted stand-in: there is no interrupt flag to mask.
#[cfg(any(not(target_arch = "x86_64"), test))]
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use spin::Mutex;
    use uart_16550::SerialPort;
    use x86_64::instructions::port::Port;

    use super::without_interrupts;
    use crate::drivers::ps2_keyboard::KeyEvent;
    use crate::interrupts::dispatch::{Dispatcher, FaultAction};
    use crate::port::PortBus;

    /// Production port accessor: every call is a real `in`/`out`
    /// instruction, never buffered or reordered.
    pub struct IoPortBus;

    impl PortBus for IoPortBus {
        fn read_byte(&mut self, port: u16) -> u8 {
            unsafe { Port::<u8>::new(port).read() }
        }

        fn write_byte(&mut self, port: u16, value: u8) {
            unsafe { Port::<u8>::new(port).write(value) }
        }
    }

    pub static SERIAL: Mutex<SerialPort> = Mutex::new(unsafe { SerialPort::new(0x3F8) });

    /// The one dispatcher instance shared by the trampolines and the
    /// foreground accessors.
    pub static DISPATCHER: Mutex<Dispatcher> = Mutex::new(Dispatcher::new());

    /// Remap the interrupt controller and reset driver state. Must run
    /// before [`enable_interrupts`]; the vector table is loaded by the
    /// boot code beforehand.
    pub fn init() {
        SERIAL.lock().init();
        let mut bus = IoPortBus;
        DISPATCHER.lock().initialize(&mut bus);
    }

    pub fn enable_interrupts() {
        x86_64::instructions::interrupts::enable();
    }

    /// Report-and-stop endpoint for fatal exceptions.
    pub fn halt_forever() -> ! {
        x86_64::instructions::interrupts::disable();
        loop {
            x86_64::instructions::hlt();
        }
    }

    /// Trampoline target for vectors 0-31.
    #[no_mangle]
    pub extern "C" fn exception_entry(vector: u8, error_code: u32) {
        let action = {
            let mut serial = SERIAL.lock();
            DISPATCHER
                .lock()
                .handle_exception(vector, error_code, &mut *serial)
        };
        if action == FaultAction::Halt {
            halt_forever();
        }
    }

    /// Trampoline target for vectors 32-47 (line = vector - 32).
    #[no_mangle]
    pub extern "C" fn irq_entry(line: u8) {
        let mut bus = IoPortBus;
        DISPATCHER.lock().handle_request_line(line, &mut bus);
    }

    /// Next decoded key event, non-blocking.
    ///
    /// Takes the dispatcher lock with interrupts masked so an IRQ
    /// cannot arrive while foreground code holds it.
    pub fn next_key_event() -> Option<KeyEvent> {
        without_interrupts(|| DISPATCHER.lock().next_key_event())
    }

    pub fn ticks() -> u64 {
        without_interrupts(|| DISPATCHER.lock().ticks())
    }

    pub fn seconds() -> u64 {
        without_interrupts(|| DISPATCHER.lock().seconds())
    }

    pub fn milliseconds() -> u64 {
        without_interrupts(|| DISPATCHER.lock().milliseconds())
    }
}

#[cfg(target_arch = "x86_64")]
pub use x86::{
    enable_interrupts, exception_entry, halt_forever, init, irq_entry, milliseconds,
    next_key_event, seconds, ticks, DISPATCHER, IoPortBus, SERIAL,
};

#[cfg(target_arch = "x86_64")]
#[macro_export]
macro_rules! println {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let mut serial = $crate::arch::SERIAL.lock();
        let _ = writeln!(serial, $($arg)*);
    }};
}
