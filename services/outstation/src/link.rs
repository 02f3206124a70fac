//! Link-layer state tracking
//!
//! The monitor is a passive observer of the link layer. A reset request
//! (`toReset`) clears the outstation's auxiliary bookkeeping: the request
//! counter and the buffer of recently committed updates. The point database
//! is never touched.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use voltage_rtdb::Point;

/// Default capacity of the recent-update buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 64;

/// Largest accepted capacity of the recent-update buffer
pub const MAX_BUFFER_CAPACITY: usize = 65_536;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkState {
    #[default]
    Unreset,
    Reset,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Unreset => f.write_str("UNRESET"),
            LinkState::Reset => f.write_str("RESET"),
        }
    }
}

/// Link-layer event delivered by the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkEvent {
    ToUnreset,
    ToReset,
}

/// Tracks link state and owns the bookkeeping cleared on reset
#[derive(Debug, Clone)]
pub struct LinkStateMonitor {
    state: LinkState,
    counter: u64,
    buffer: VecDeque<Point>,
    capacity: usize,
    resets: u64,
    keep_alive_failures: u32,
}

impl Default for LinkStateMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

impl LinkStateMonitor {
    /// Monitor keeping at most `capacity` recent updates
    ///
    /// The buffer grows on demand up to `capacity`; nothing is allocated
    /// up front.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: LinkState::Unreset,
            counter: 0,
            buffer: VecDeque::new(),
            capacity,
            resets: 0,
            keep_alive_failures: 0,
        }
    }

    /// Apply a link-layer event
    ///
    /// Every `ToReset` runs exactly one internal reset, including when the
    /// link is already `RESET`. `ToUnreset` only changes the state.
    pub fn on_link_event(&mut self, event: LinkEvent) {
        let previous = self.state;
        match event {
            LinkEvent::ToUnreset => {
                self.state = LinkState::Unreset;
                debug!(from = %previous, "Link state UNRESET");
            },
            LinkEvent::ToReset => {
                self.state = LinkState::Reset;
                self.reset_internal_state();
            },
        }
    }

    /// Clear the request counter and the recent-update buffer
    pub fn reset_internal_state(&mut self) {
        let cleared_requests = self.counter;
        let cleared_updates = self.buffer.len();
        self.counter = 0;
        self.buffer.clear();
        self.resets += 1;
        info!(
            cleared_requests,
            cleared_updates,
            resets = self.resets,
            "Link reset handled"
        );
    }

    /// Count one processed command request
    pub fn record_request(&mut self) {
        self.counter = self.counter.saturating_add(1);
    }

    /// Remember a committed update, evicting the oldest when full
    pub fn buffer_update(&mut self, point: Point) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(point);
    }

    pub fn on_keep_alive_failure(&mut self) {
        self.keep_alive_failures = self.keep_alive_failures.saturating_add(1);
        warn!(
            consecutive = self.keep_alive_failures,
            "Link keep-alive failed"
        );
    }

    pub fn on_keep_alive_success(&mut self) {
        if self.keep_alive_failures > 0 {
            debug!(after = self.keep_alive_failures, "Link keep-alive recovered");
        }
        self.keep_alive_failures = 0;
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn request_count(&self) -> u64 {
        self.counter
    }

    pub fn buffered(&self) -> impl Iterator<Item = &Point> {
        self.buffer.iter()
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of internal resets performed
    pub fn reset_count(&self) -> u64 {
        self.resets
    }

    pub fn keep_alive_failures(&self) -> u32 {
        self.keep_alive_failures
    }
}
