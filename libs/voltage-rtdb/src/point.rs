//! Analog point representation
//!
//! A point is the unit of state reported to the master station: an index,
//! an engineering value, a quality flag set and the time it was produced.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Point quality flags (DNP3 analog quality bits)
///
/// Stored as a plain bit set. A freshly committed command value is always
/// `ONLINE`; the remaining bits are reported as received from the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags(u8);

impl Flags {
    pub const ONLINE: Flags = Flags(0x01);
    pub const RESTART: Flags = Flags(0x02);
    pub const COMM_LOST: Flags = Flags(0x04);
    pub const REMOTE_FORCED: Flags = Flags(0x08);
    pub const LOCAL_FORCED: Flags = Flags(0x10);
    pub const OVERRANGE: Flags = Flags(0x20);
    pub const REFERENCE_ERR: Flags = Flags(0x40);

    /// Empty flag set
    pub const fn empty() -> Self {
        Flags(0)
    }

    /// Build from the raw octet
    pub const fn from_bits(bits: u8) -> Self {
        Flags(bits)
    }

    /// Raw octet
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check that every bit of `other` is set
    #[inline]
    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets
    #[inline]
    pub const fn with(self, other: Flags) -> Self {
        Flags(self.0 | other.0)
    }

    #[inline]
    pub const fn is_online(self) -> bool {
        self.contains(Flags::ONLINE)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Timestamp in milliseconds since Unix epoch
///
/// Zero is a valid value and means "no time available", which is what the
/// reference deployment reports for every point.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`, saturating at zero if the clock
    /// went backwards.
    pub const fn millis_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// A single analog point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Database index
    pub index: u16,
    /// Engineering value
    pub value: f64,
    /// Quality flags
    pub flags: Flags,
    /// Time the value was produced
    pub time: Timestamp,
}

impl Point {
    pub fn new(index: u16, value: f64, flags: Flags, time: Timestamp) -> Self {
        Self {
            index,
            value,
            flags,
            time,
        }
    }

    /// Point carrying a freshly accepted value: quality `ONLINE`
    pub fn online(index: u16, value: f64, time: Timestamp) -> Self {
        Self::new(index, value, Flags::ONLINE, time)
    }
}
