//! Channel lifecycle notifications
//!
//! The hosting stack owns the TCP channel and reports its lifecycle here.
//! Frames arrive already parsed; only the link header is inspected, to spot
//! `RESET_LINK_STATES` requests from the master.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelState {
    #[default]
    Closed,
    Opening,
    Open,
    Shutdown,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelState::Closed => "CLOSED",
            ChannelState::Opening => "OPENING",
            ChannelState::Open => "OPEN",
            ChannelState::Shutdown => "SHUTDOWN",
        };
        f.write_str(s)
    }
}

/// Primary-to-secondary link function codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkFunction {
    ResetLinkStates,
    TestLinkStates,
    ConfirmedUserData,
    UnconfirmedUserData,
    RequestLinkStatus,
    Other(u8),
}

impl LinkFunction {
    pub fn from_code(code: u8) -> Self {
        match code & 0x0F {
            0x00 => LinkFunction::ResetLinkStates,
            0x02 => LinkFunction::TestLinkStates,
            0x03 => LinkFunction::ConfirmedUserData,
            0x04 => LinkFunction::UnconfirmedUserData,
            0x09 => LinkFunction::RequestLinkStatus,
            other => LinkFunction::Other(other),
        }
    }

    pub fn code(&self) -> u8 {
        match *self {
            LinkFunction::ResetLinkStates => 0x00,
            LinkFunction::TestLinkStates => 0x02,
            LinkFunction::ConfirmedUserData => 0x03,
            LinkFunction::UnconfirmedUserData => 0x04,
            LinkFunction::RequestLinkStatus => 0x09,
            LinkFunction::Other(code) => code,
        }
    }
}

/// Parsed link-layer header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkHeader {
    pub function: LinkFunction,
    pub source: u16,
    pub destination: u16,
}

impl LinkHeader {
    pub fn new(function: LinkFunction, source: u16, destination: u16) -> Self {
        Self {
            function,
            source,
            destination,
        }
    }

    #[inline]
    pub fn is_reset_link_states(&self) -> bool {
        self.function == LinkFunction::ResetLinkStates
    }
}

/// Channel lifecycle callbacks
pub trait ChannelListener {
    fn on_channel_state_change(&mut self, state: ChannelState);

    fn on_open(&mut self) {}

    fn on_close(&mut self) {}

    fn on_send_result(&mut self, num_bytes: usize);

    fn on_receive(&mut self, header: &LinkHeader, body: &[u8]);
}

/// Channel counters kept by [`ChannelMonitor`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub opens: u64,
    pub closes: u64,
    pub bytes_sent: u64,
    pub frames_received: u64,
    pub reset_requests: u64,
}

/// Default listener: tracks state and counters, queues link reset requests
#[derive(Debug, Clone, Default)]
pub struct ChannelMonitor {
    state: ChannelState,
    stats: ChannelStats,
    pending_resets: u32,
}

impl ChannelMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Take the `RESET_LINK_STATES` requests seen since the last call
    pub fn take_reset_requests(&mut self) -> u32 {
        std::mem::take(&mut self.pending_resets)
    }
}

impl ChannelListener for ChannelMonitor {
    fn on_channel_state_change(&mut self, state: ChannelState) {
        info!(from = %self.state, to = %state, "Channel state changed");
        self.state = state;
    }

    fn on_open(&mut self) {
        self.stats.opens += 1;
        info!("Channel opened");
    }

    fn on_close(&mut self) {
        self.stats.closes += 1;
        info!("Channel closed");
    }

    fn on_send_result(&mut self, num_bytes: usize) {
        self.stats.bytes_sent = self.stats.bytes_sent.saturating_add(num_bytes as u64);
        trace!(num_bytes, "Sent");
    }

    fn on_receive(&mut self, header: &LinkHeader, body: &[u8]) {
        self.stats.frames_received += 1;
        if header.is_reset_link_states() {
            self.stats.reset_requests += 1;
            self.pending_resets = self.pending_resets.saturating_add(1);
            info!(
                source = header.source,
                destination = header.destination,
                "RESET_LINK_STATES received"
            );
        }
        debug!(
            function = ?header.function,
            source = header.source,
            body_len = body.len(),
            "Frame received"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_codes() {
        assert_eq!(LinkFunction::from_code(0x40), LinkFunction::ResetLinkStates);
        assert_eq!(LinkFunction::from_code(0x49), LinkFunction::RequestLinkStatus);
        assert_eq!(LinkFunction::from_code(0x0E), LinkFunction::Other(0x0E));
        assert_eq!(LinkFunction::UnconfirmedUserData.code(), 0x04);
    }

    #[test]
    fn test_monitor_counts_reset_requests() {
        let mut monitor = ChannelMonitor::new();
        monitor.on_channel_state_change(ChannelState::Open);
        monitor.on_open();
        monitor.on_receive(&LinkHeader::new(LinkFunction::ResetLinkStates, 100, 1), &[]);
        monitor.on_receive(
            &LinkHeader::new(LinkFunction::UnconfirmedUserData, 100, 1),
            &[0xC0, 0x01],
        );
        monitor.on_send_result(10);
        monitor.on_send_result(5);

        let stats = monitor.stats();
        assert_eq!(monitor.state(), ChannelState::Open);
        assert_eq!(stats.frames_received, 2);
        assert_eq!(stats.reset_requests, 1);
        assert_eq!(stats.bytes_sent, 15);
        assert_eq!(monitor.take_reset_requests(), 1);
        assert_eq!(monitor.take_reset_requests(), 0);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_reset_request_is_logged() {
        let mut monitor = ChannelMonitor::new();
        monitor.on_receive(&LinkHeader::new(LinkFunction::ResetLinkStates, 100, 1), &[]);
        assert!(logs_contain("RESET_LINK_STATES received"));
    }
}
