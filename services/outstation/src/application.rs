//! Outstation application notifications
//!
//! Informational callbacks from the hosting stack. The default method bodies
//! only log; [`crate::Outstation`] overrides the ones that feed its link
//! monitor.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::link::LinkState;

/// Operational state of the outstation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutstationState {
    #[default]
    Disabled,
    Enabled,
}

impl fmt::Display for OutstationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutstationState::Disabled => f.write_str("DISABLED"),
            OutstationState::Enabled => f.write_str("ENABLED"),
        }
    }
}

const LSB_NAMES: [&str; 8] = [
    "BROADCAST",
    "CLASS1_EVENTS",
    "CLASS2_EVENTS",
    "CLASS3_EVENTS",
    "NEED_TIME",
    "LOCAL_CONTROL",
    "DEVICE_TROUBLE",
    "DEVICE_RESTART",
];

const MSB_NAMES: [&str; 8] = [
    "FUNC_NOT_SUPPORTED",
    "OBJECT_UNKNOWN",
    "PARAM_ERROR",
    "EVENT_BUFFER_OVERFLOW",
    "ALREADY_EXECUTING",
    "CONFIG_CORRUPT",
    "RESERVED1",
    "RESERVED2",
];

/// Internal indications, two octets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Iin {
    pub lsb: u8,
    pub msb: u8,
}

impl Iin {
    pub const DEVICE_RESTART: u8 = 0x80;
    pub const NEED_TIME: u8 = 0x10;
    pub const DEVICE_TROUBLE: u8 = 0x40;
    pub const FUNC_NOT_SUPPORTED: u8 = 0x01;
    pub const EVENT_BUFFER_OVERFLOW: u8 = 0x08;

    pub fn new(lsb: u8, msb: u8) -> Self {
        Self { lsb, msb }
    }

    pub fn device_restart(&self) -> bool {
        self.lsb & Self::DEVICE_RESTART != 0
    }

    pub fn need_time(&self) -> bool {
        self.lsb & Self::NEED_TIME != 0
    }

    pub fn device_trouble(&self) -> bool {
        self.lsb & Self::DEVICE_TROUBLE != 0
    }

    pub fn func_not_supported(&self) -> bool {
        self.msb & Self::FUNC_NOT_SUPPORTED != 0
    }

    pub fn event_buffer_overflow(&self) -> bool {
        self.msb & Self::EVENT_BUFFER_OVERFLOW != 0
    }

    /// Names of the bits that are set, LSB first
    pub fn set_bits(&self) -> Vec<&'static str> {
        let pick = |octet: u8, names: &'static [&'static str; 8]| {
            (0..8)
                .filter(move |&bit| octet & (1u8 << bit) != 0)
                .map(move |bit| names[bit])
        };
        pick(self.lsb, &LSB_NAMES)
            .chain(pick(self.msb, &MSB_NAMES))
            .collect()
    }
}

impl fmt::Display for Iin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = self.set_bits();
        if bits.is_empty() {
            f.write_str("[]")
        } else {
            write!(f, "[{}]", bits.join(", "))
        }
    }
}

/// Application-level notifications from the hosting stack
pub trait OutstationApplication {
    fn on_state_change(&mut self, state: OutstationState) {
        info!(%state, "Outstation state changed");
    }

    fn on_link_state_change(&mut self, state: LinkState) {
        info!(%state, "Link state changed");
    }

    /// IIN seen on a poll from the master
    fn on_receive_iin(&mut self, iin: Iin) {
        debug!(%iin, "IIN received");
    }

    fn on_keep_alive_initiated(&mut self) {
        debug!("Keep-alive initiated");
    }

    fn on_keep_alive_failure(&mut self) {
        warn!("Keep-alive failure");
    }

    fn on_keep_alive_success(&mut self) {
        debug!("Keep-alive success");
    }
}

/// Application that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingApplication;

impl OutstationApplication for LoggingApplication {}
