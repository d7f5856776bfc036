//! # Port Accessor
//!
//! The single seam between the drivers and hardware I/O ports. Every
//! register access in this crate goes through [`PortBus`]; production
//! binds it to real `in`/`out` instructions (`crate::arch::IoPortBus`),
//! tests bind it to an in-memory fake that records writes and serves
//! scripted reads.
//!
//! Port accesses are presumed to have hardware side effects. No
//! implementation may buffer, cache or elide them.

/// Byte-wide access to the I/O port address space.
pub trait PortBus {
    /// Read one byte from `port`.
    fn read_byte(&mut self, port: u16) -> u8;

    /// Write one byte to `port`.
    fn write_byte(&mut self, port: u16, value: u8);
}


#[cfg(test)]
mod tests {
    use super::fake::FakePortBus;
    use super::PortBus;

    #[test]
    fn scripted_reads_come_before_latched_writes() {
        let mut bus = FakePortBus::new();
        bus.write_byte(0x21, 0xFC);
        bus.script_read(0x21, 0xAA);
        assert_eq!(bus.read_byte(0x21), 0xAA);
        assert_eq!(bus.read_byte(0x21), 0xFC);
    }

    #[test]
    fn unwritten_port_reads_default() {
        let mut bus = FakePortBus::new();
        assert_eq!(bus.read_byte(0x60), 0);
        bus.set_default(0x71, 0x80);
        assert_eq!(bus.read_byte(0x71), 0x80);
    }
}
