//! # Programmable Interval Timer (8254 PIT)
//!
//! Programs channel 0's firing rate and keeps the monotonic tick count
//! advanced by IRQ0. The tick counter is the only timer state shared
//! with foreground code; it is a single relaxed atomic, so readers
//! tolerate it changing between consecutive loads.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::arch::without_interrupts;
use crate::port::PortBus;

/// Channel 0 input frequency in Hz.
pub const BASE_FREQUENCY: u32 = 1_193_182;

/// Lowest programmable rate: the divisor must fit the 16-bit counter.
pub const MIN_FREQUENCY: u32 = 19;

const CHANNEL_0_DATA: u16 = 0x40;
const COMMAND: u16 = 0x43;

// Channel 0, lobyte/hibyte access, mode 3 (square wave), binary.
const CMD_CHANNEL_0_SQUARE_WAVE: u8 = 0x36;

/// Timer driver: channel programming plus tick accounting.
pub struct Pit {
    ticks: AtomicU64,
}

impl Pit {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }

    /// Program channel 0 to fire at (approximately) `hz`.
    ///
    /// The request is clamped to `[MIN_FREQUENCY, BASE_FREQUENCY]` and
    /// the divisor computed by integer division. Interrupts stay
    /// disabled for the command-and-divisor write sequence: a timer
    /// interrupt against a half-written divisor is undefined. Returns
    /// the divisor actually programmed.
    pub fn set_frequency<B: PortBus>(&self, bus: &mut B, hz: u32) -> u16 {
        let hz = hz.clamp(MIN_FREQUENCY, BASE_FREQUENCY);
        let divisor = (BASE_FREQUENCY / hz) as u16;

        without_interrupts(|| {
            bus.write_byte(COMMAND, CMD_CHANNEL_0_SQUARE_WAVE);
            bus.write_byte(CHANNEL_0_DATA, (divisor & 0xFF) as u8);
            bus.write_byte(CHANNEL_0_DATA, (divisor >> 8) as u8);
        });

        divisor
    }

    /// Program channel 0 to its power-on rate of ~18.2 Hz.
    ///
    /// Divisor 0 is hardware shorthand for 65536, giving
    /// 1193182 / 65536 = 18.2065 Hz. This is the rate the
    /// [`Pit::seconds`] and [`Pit::milliseconds`] projections assume,
    /// so initialization runs it explicitly rather than trusting the
    /// firmware to have left the channel alone.
    pub fn program_default<B: PortBus>(&self, bus: &mut B) {
        without_interrupts(|| {
            bus.write_byte(COMMAND, CMD_CHANNEL_0_SQUARE_WAVE);
            bus.write_byte(CHANNEL_0_DATA, 0);
            bus.write_byte(CHANNEL_0_DATA, 0);
        });
    }

    /// Interrupt-path entry: count one IRQ0 firing.
    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Ticks since boot.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Elapsed seconds, assuming the default ~18.2 Hz rate.
    ///
    /// Integer approximation (ticks * 10 / 182); reprogramming the
    /// channel with [`Pit::set_frequency`] does not rescale this.
    pub fn seconds(&self) -> u64 {
        self.ticks() * 10 / 182
    }

    /// Elapsed milliseconds, assuming the default ~18.2 Hz rate.
    ///
    /// Integer approximation (ticks * 549 / 10); reprogramming the
    /// channel with [`Pit::set_frequency`] does not rescale this.
    pub fn milliseconds(&self) -> u64 {
        self.ticks() * 549 / 10
    }
}

impl Default for Pit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::fake::FakePortBus;

    #[test]
    fn set_frequency_writes_command_then_divisor_halves() {
        let pit = Pit::new();
        let mut bus = FakePortBus::new();
        let divisor = pit.set_frequency(&mut bus, 100);

        assert_eq!(divisor, 11931);
        assert_eq!(
            bus.writes,
            vec![
                (COMMAND, 0x36),
                (CHANNEL_0_DATA, (11931u16 & 0xFF) as u8),
                (CHANNEL_0_DATA, (11931u16 >> 8) as u8),
            ]
        );
    }

    #[test]
    fn frequency_is_clamped_at_both_ends() {
        let pit = Pit::new();
        let mut bus = FakePortBus::new();

        // Below the minimum: clamps to 19 Hz.
        assert_eq!(pit.set_frequency(&mut bus, 0), (BASE_FREQUENCY / 19) as u16);
        // Above the base: clamps to the base frequency, divisor 1.
        assert_eq!(pit.set_frequency(&mut bus, 2_000_000), 1);
        // Exactly the base.
        assert_eq!(pit.set_frequency(&mut bus, 1_193_182), 1);
    }

    #[test]
    fn divisor_is_exact_integer_division() {
        let pit = Pit::new();
        let mut bus = FakePortBus::new();
        assert_eq!(pit.set_frequency(&mut bus, 1000), 1193);
        assert_eq!(pit.set_frequency(&mut bus, 19), 62799);
    }

    #[test]
    fn program_default_selects_the_full_divisor() {
        let pit = Pit::new();
        let mut bus = FakePortBus::new();
        pit.program_default(&mut bus);

        // Divisor bytes 0/0 mean 65536: the ~18.2 Hz power-on rate.
        assert_eq!(
            bus.writes,
            vec![(COMMAND, 0x36), (CHANNEL_0_DATA, 0), (CHANNEL_0_DATA, 0)]
        );
    }

    #[test]
    fn ticks_advance_one_per_firing() {
        let pit = Pit::new();
        assert_eq!(pit.ticks(), 0);
        for _ in 0..5 {
            pit.record_tick();
        }
        assert_eq!(pit.ticks(), 5);
    }

    #[test]
    fn derived_times_use_the_fixed_rate() {
        let pit = Pit::new();
        for _ in 0..182 {
            pit.record_tick();
        }
        // 182 ticks at ~18.2 Hz is ten seconds.
        assert_eq!(pit.seconds(), 10);
        assert_eq!(pit.milliseconds(), 182 * 549 / 10);
    }
}
