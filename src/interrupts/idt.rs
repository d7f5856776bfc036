//! # Interrupt Vector Table
//!
//! Builds the 256-entry IDT mapping each vector to its trampoline.
//!
//! ## Vector Layout
//!
//! | Vector  | Class                    |
//! |---------|--------------------------|
//! | 0-31    | CPU exception            |
//! | 32-47   | Remapped IRQ line 0-15   |
//! | 48-255  | Absent                   |
//!
//! Entries are encoded for a 32-bit kernel: the handler address is
//! split into 16-bit halves around the selector and attribute bytes.
//! The table is built once before interrupts are enabled and never
//! mutated afterwards; loading it into the CPU's vector base register
//! is the platform adapter's job.
//!
//! Rather than one hand-written stub per vector, a single generic
//! trampoline consults [`classify`] to learn whether the vector pushes
//! an error code and which dispatch entry point owns it.

use super::{EXCEPTION_COUNT, IRQ_LINES, VECTOR_COUNT};

/// Kernel code segment selector used by every gate.
pub const KERNEL_CODE_SELECTOR: u16 = 0x08;

/// Gate attribute: present, ring 0, 32-bit interrupt gate.
pub const INTERRUPT_GATE: u8 = 0x8E;

/// Exception vectors for which the CPU pushes an error code.
pub const ERROR_CODE_VECTORS: [u8; 8] = [8, 10, 11, 12, 13, 14, 17, 30];

/// Dispatch class of a vector, consulted by the generic trampoline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorClass {
    /// CPU exception that pushes an error code.
    ExceptionWithErrorCode,
    /// CPU exception without an error code.
    Exception,
    /// Remapped hardware request line (vector - 32 = line number).
    RequestLine,
    /// No handler installed.
    Unused,
}

/// Classify a vector number per the fixed layout above.
pub fn classify(vector: u8) -> VectorClass {
    match vector {
        v if (v as usize) < EXCEPTION_COUNT => {
            if ERROR_CODE_VECTORS.contains(&v) {
                VectorClass::ExceptionWithErrorCode
            } else {
                VectorClass::Exception
            }
        }
        v if (v as usize) < EXCEPTION_COUNT + IRQ_LINES => VectorClass::RequestLine,
        _ => VectorClass::Unused,
    }
}

/// One 8-byte IDT gate in the CPU-defined format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, packed)]
pub struct IdtEntry {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

impl IdtEntry {
    /// An absent entry. The present bit (and everything else) is zero.
    pub const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            zero: 0,
            type_attr: 0,
            offset_high: 0,
        }
    }

    /// Encode a gate for `handler` with the given selector and attributes.
    pub fn new(handler: u32, selector: u16, type_attr: u8) -> Self {
        Self {
            offset_low: (handler & 0xFFFF) as u16,
            selector,
            zero: 0,
            type_attr,
            offset_high: (handler >> 16) as u16,
        }
    }

    /// Whether the present bit is set.
    pub fn is_present(&self) -> bool {
        self.type_attr & 0x80 != 0
    }

    /// The 32-bit handler address, reassembled from its halves.
    pub fn handler_address(&self) -> u32 {
        let low = self.offset_low;
        let high = self.offset_high;
        (high as u32) << 16 | low as u32
    }

    pub fn selector(&self) -> u16 {
        self.selector
    }

    pub fn type_attr(&self) -> u8 {
        self.type_attr
    }
}

/// The full 256-entry vector table.
#[repr(C, align(8))]
pub struct VectorTable {
    entries: [IdtEntry; VECTOR_COUNT],
}

impl VectorTable {
    /// A table with every entry absent.
    pub const fn empty() -> Self {
        Self {
            entries: [IdtEntry::missing(); VECTOR_COUNT],
        }
    }

    /// Install gates for the 32 exception vectors and 16 request-line
    /// vectors, leaving the remaining 208 entries absent.
    ///
    /// `trampoline_of` maps a vector number to the address of its
    /// trampoline. Deterministic setup, run once before interrupts are
    /// enabled.
    pub fn build<F>(&mut self, trampoline_of: F)
    where
        F: Fn(u8) -> u32,
    {
        for vector in 0..(EXCEPTION_COUNT + IRQ_LINES) as u8 {
            self.entries[vector as usize] =
                IdtEntry::new(trampoline_of(vector), KERNEL_CODE_SELECTOR, INTERRUPT_GATE);
        }
    }

    pub fn entry(&self, vector: u8) -> &IdtEntry {
        &self.entries[vector as usize]
    }

    /// Base address of the table, for the vector-base load performed by
    /// the platform adapter.
    pub fn base_address(&self) -> *const IdtEntry {
        self.entries.as_ptr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_trampoline(vector: u8) -> u32 {
        0x0010_0000 + (vector as u32) * 16
    }

    #[test]
    fn build_installs_exception_and_irq_gates() {
        let mut table = VectorTable::empty();
        table.build(fake_trampoline);

        for vector in 0..48u8 {
            let entry = table.entry(vector);
            assert!(entry.is_present(), "vector {vector} should be present");
            assert_eq!(entry.handler_address(), fake_trampoline(vector));
            assert_eq!(entry.selector(), KERNEL_CODE_SELECTOR);
            assert_eq!(entry.type_attr(), INTERRUPT_GATE);
        }
    }

    #[test]
    fn build_leaves_remaining_entries_absent() {
        let mut table = VectorTable::empty();
        table.build(fake_trampoline);

        for vector in 48..=255u8 {
            let entry = table.entry(vector);
            assert!(!entry.is_present());
            assert_eq!(*entry, IdtEntry::missing());
        }
    }

    #[test]
    fn entry_splits_handler_address_into_halves() {
        let entry = IdtEntry::new(0xDEAD_BEEF, KERNEL_CODE_SELECTOR, INTERRUPT_GATE);
        assert_eq!(entry.handler_address(), 0xDEAD_BEEF);
        let low = entry.offset_low;
        let high = entry.offset_high;
        assert_eq!(low, 0xBEEF);
        assert_eq!(high, 0xDEAD);
    }

    #[test]
    fn classify_matches_vector_layout() {
        assert_eq!(classify(0), VectorClass::Exception);
        assert_eq!(classify(3), VectorClass::Exception);
        assert_eq!(classify(8), VectorClass::ExceptionWithErrorCode);
        assert_eq!(classify(13), VectorClass::ExceptionWithErrorCode);
        assert_eq!(classify(14), VectorClass::ExceptionWithErrorCode);
        assert_eq!(classify(30), VectorClass::ExceptionWithErrorCode);
        assert_eq!(classify(31), VectorClass::Exception);
        assert_eq!(classify(32), VectorClass::RequestLine);
        assert_eq!(classify(47), VectorClass::RequestLine);
        assert_eq!(classify(48), VectorClass::Unused);
        assert_eq!(classify(0x80), VectorClass::Unused);
    }

    #[test]
    fn request_line_vectors_sit_at_the_remap_base() {
        assert_eq!(crate::interrupts::IRQ_BASE, 32);
        for line in 0..16u8 {
            assert_eq!(classify(crate::interrupts::IRQ_BASE + line), VectorClass::RequestLine);
        }
    }
}
