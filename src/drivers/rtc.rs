//! # CMOS Real-Time Clock
//!
//! Register-level reader for the battery-backed clock. Unlike the
//! timer and keyboard this is not interrupt-driven: callers poll it
//! synchronously (e.g. a `time` shell command) and get back a
//! normalized snapshot or an explicit failure.
//!
//! ## Read Protocol
//!
//! 1. Wait (bounded) for the update-in-progress flag to clear.
//! 2. Probe status register B for BCD/binary and 12/24-hour storage.
//! 3. Read the six time fields twice; on disagreement the clock ticked
//!    mid-read, so wait for the flag once more and re-read (one retry).
//! 4. BCD-decode, range-validate, convert 12-hour values via the PM bit.
//! 5. Read the century register opportunistically (0xFF or a value
//!    outside {19, 20} means "unavailable", not an error).
//! 6. Apply the configured timezone offset, rolling day/month/year with
//!    a `year % 4` February rule — an approximation that only holds
//!    within a single century.

use core::fmt;

use crate::port::PortBus;

const INDEX_PORT: u16 = 0x70;
const DATA_PORT: u16 = 0x71;

const REG_SECONDS: u8 = 0x00;
const REG_MINUTES: u8 = 0x02;
const REG_HOURS: u8 = 0x04;
const REG_DAY: u8 = 0x07;
const REG_MONTH: u8 = 0x08;
const REG_YEAR: u8 = 0x09;
const REG_STATUS_A: u8 = 0x0A;
const REG_STATUS_B: u8 = 0x0B;
const REG_CENTURY: u8 = 0x32;

const UPDATE_IN_PROGRESS: u8 = 0x80;
const STATUS_B_24_HOUR: u8 = 0x02;
const STATUS_B_BINARY: u8 = 0x04;
const HOUR_PM_BIT: u8 = 0x80;
const CENTURY_UNAVAILABLE: u8 = 0xFF;

/// Iterations of the update-in-progress spin before giving up.
const UPDATE_POLL_LIMIT: u32 = 100_000;

/// Wall-clock snapshot, normalized to binary and 24-hour form with the
/// timezone offset already applied. Produced fresh on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcTime {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    /// Two-digit year (0-99).
    pub year: u8,
    /// 19 or 20 when the century register was readable, `None` otherwise.
    pub century: Option<u8>,
}

/// Failure modes of a clock read. Returned to the caller; never panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcError {
    /// The update-in-progress flag never cleared within the poll bound.
    UpdateTimeout,
    /// A field was outside its valid range after conversion.
    FieldOutOfRange(&'static str),
}

impl fmt::Display for RtcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtcError::UpdateTimeout => write!(f, "clock update never completed"),
            RtcError::FieldOutOfRange(field) => write!(f, "clock field out of range: {field}"),
        }
    }
}

// The six time registers as read, before any conversion.
#[derive(Clone, Copy, PartialEq, Eq)]
struct RawFields {
    second: u8,
    minute: u8,
    hour: u8,
    day: u8,
    month: u8,
    year: u8,
}

/// CMOS clock reader with a fixed timezone offset in whole hours,
/// applied to the clock's assumed-UTC storage on every read.
pub struct CmosClock {
    timezone_offset_hours: i8,
}

impl CmosClock {
    pub const fn new(timezone_offset_hours: i8) -> Self {
        Self {
            timezone_offset_hours,
        }
    }

    /// Read a validated snapshot.
    pub fn read<B: PortBus>(&self, bus: &mut B) -> Result<RtcTime, RtcError> {
        wait_update_clear(bus)?;
        let status_b = read_register(bus, REG_STATUS_B);

        let first = read_fields(bus);
        let second_pass = read_fields(bus);
        let raw = if first == second_pass {
            first
        } else {
            // The clock ticked over mid-read. One retry, not a loop.
            wait_update_clear(bus)?;
            read_fields(bus)
        };
        let raw_century = read_register(bus, REG_CENTURY);

        let bcd = status_b & STATUS_B_BINARY == 0;
        let twelve_hour = status_b & STATUS_B_24_HOUR == 0;

        let second = convert(raw.second, bcd);
        let minute = convert(raw.minute, bcd);
        // The PM bit is not a BCD digit; decode around it.
        let hour_raw = if bcd {
            bcd_to_bin(raw.hour & !HOUR_PM_BIT) | (raw.hour & HOUR_PM_BIT)
        } else {
            raw.hour
        };
        let day = convert(raw.day, bcd);
        let month = convert(raw.month, bcd);
        let year = convert(raw.year, bcd);

        if second > 59 {
            return Err(RtcError::FieldOutOfRange("second"));
        }
        if minute > 59 {
            return Err(RtcError::FieldOutOfRange("minute"));
        }
        if (hour_raw & !HOUR_PM_BIT) > 23 {
            return Err(RtcError::FieldOutOfRange("hour"));
        }
        if day < 1 || day > 31 {
            return Err(RtcError::FieldOutOfRange("day"));
        }
        if month < 1 || month > 12 {
            return Err(RtcError::FieldOutOfRange("month"));
        }
        if year > 99 {
            return Err(RtcError::FieldOutOfRange("year"));
        }

        let hour = if twelve_hour {
            let pm = hour_raw & HOUR_PM_BIT != 0;
            let mut h = hour_raw & !HOUR_PM_BIT;
            if h == 12 {
                h = 0; // 12 AM is hour 0; 12 PM becomes 0 + 12 below
            }
            if pm {
                h + 12
            } else {
                h
            }
        } else {
            hour_raw
        };
        if hour > 23 {
            return Err(RtcError::FieldOutOfRange("hour"));
        }

        let century = match raw_century {
            CENTURY_UNAVAILABLE => None,
            value => match convert(value, bcd) {
                c @ (19 | 20) => Some(c),
                _ => None,
            },
        };

        let mut time = RtcTime {
            second,
            minute,
            hour,
            day,
            month,
            year,
            century,
        };
        apply_timezone_offset(&mut time, self.timezone_offset_hours);
        Ok(time)
    }
}

// Select a CMOS register and read its value.
fn read_register<B: PortBus>(bus: &mut B, register: u8) -> u8 {
    bus.write_byte(INDEX_PORT, register);
    bus.read_byte(DATA_PORT)
}

fn read_fields<B: PortBus>(bus: &mut B) -> RawFields {
    RawFields {
        second: read_register(bus, REG_SECONDS),
        minute: read_register(bus, REG_MINUTES),
        hour: read_register(bus, REG_HOURS),
        day: read_register(bus, REG_DAY),
        month: read_register(bus, REG_MONTH),
        year: read_register(bus, REG_YEAR),
    }
}

// Bounded spin on the update-in-progress flag.
fn wait_update_clear<B: PortBus>(bus: &mut B) -> Result<(), RtcError> {
    for _ in 0..UPDATE_POLL_LIMIT {
        if read_register(bus, REG_STATUS_A) & UPDATE_IN_PROGRESS == 0 {
            return Ok(());
        }
    }
    Err(RtcError::UpdateTimeout)
}

fn bcd_to_bin(value: u8) -> u8 {
    (value & 0x0F) + (value >> 4) * 10
}

fn convert(value: u8, bcd: bool) -> u8 {
    if bcd {
        bcd_to_bin(value)
    } else {
        value
    }
}

fn days_in_month(month: u8, year: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        // year % 4 leap rule, valid within a single century.
        2 => {
            if year % 4 == 0 {
                29
            } else {
                28
            }
        }
        _ => 31,
    }
}

// Shift the snapshot by a whole-hour timezone offset, rolling
// day/month/year as needed. The century moves only when it was read.
fn apply_timezone_offset(time: &mut RtcTime, offset_hours: i8) {
    let mut hour = time.hour as i16 + offset_hours as i16;
    while hour >= 24 {
        hour -= 24;
        advance_day(time);
    }
    while hour < 0 {
        hour += 24;
        retreat_day(time);
    }
    time.hour = hour as u8;
}

fn advance_day(time: &mut RtcTime) {
    if time.day < days_in_month(time.month, time.year) {
        time.day += 1;
        return;
    }
    time.day = 1;
    if time.month < 12 {
        time.month += 1;
        return;
    }
    time.month = 1;
    if time.year < 99 {
        time.year += 1;
    } else {
        time.year = 0;
        time.century = time.century.map(|c| c + 1);
    }
}

fn retreat_day(time: &mut RtcTime) {
    if time.day > 1 {
        time.day -= 1;
        return;
    }
    if time.month > 1 {
        time.month -= 1;
    } else {
        time.month = 12;
        if time.year > 0 {
            time.year -= 1;
        } else {
            time.year = 99;
            time.century = time.century.map(|c| c - 1);
        }
    }
    time.day = days_in_month(time.month, time.year);
}
