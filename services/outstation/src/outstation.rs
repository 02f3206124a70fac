//! Outstation wiring
//!
//! `Outstation` ties the command arbiter, the link monitor and the channel
//! monitor together behind the three callback traits the hosting stack
//! drives. It is single-threaded; `SharedOutstation` serializes access for
//! hosts that deliver events from several tasks.

use std::sync::Arc;

use errors::VoltageResult;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use voltage_rtdb::{Point, PointDatabase, PropagationTable, TimeProvider};

use crate::application::{Iin, OutstationApplication, OutstationState};
use crate::arbiter::{CommandArbiter, CommandHandler, CommandPolicy, Selection};
use crate::channel::{ChannelListener, ChannelMonitor, ChannelState, LinkHeader};
use crate::command::{AnalogCommand, CommandMode, CommandRequest, CommandStatus, OperationType};
use crate::config::{LinkConfig, OutstationConfig};
use crate::link::{LinkEvent, LinkState, LinkStateMonitor};
use crate::sink::UpdateSink;

/// Forwards to the user sink and stages updates for the link monitor
struct StagingSink<S> {
    inner: S,
    staged: Vec<Point>,
}

impl<S: UpdateSink> UpdateSink for StagingSink<S> {
    fn on_update(&mut self, point: &Point) {
        self.staged.push(*point);
        self.inner.on_update(point);
    }
}

pub struct Outstation<S> {
    arbiter: CommandArbiter<StagingSink<S>>,
    link: LinkStateMonitor,
    channel: ChannelMonitor,
    state: OutstationState,
    link_config: LinkConfig,
    allow_unsolicited: bool,
    /// A `RESET_LINK_STATES` frame was handled and its state notification is pending
    frame_reset_pending: bool,
}

impl<S: UpdateSink> Outstation<S> {
    /// Build from parts; the outstation starts disabled
    pub fn new(
        database: PointDatabase,
        propagation: PropagationTable,
        policy: CommandPolicy,
        sink: S,
        clock: Arc<dyn TimeProvider>,
    ) -> VoltageResult<Self> {
        let sink = StagingSink {
            inner: sink,
            staged: Vec::new(),
        };
        Ok(Self {
            arbiter: CommandArbiter::new(database, propagation, policy, sink, clock)?,
            link: LinkStateMonitor::default(),
            channel: ChannelMonitor::new(),
            state: OutstationState::Disabled,
            link_config: LinkConfig::default(),
            allow_unsolicited: true,
            frame_reset_pending: false,
        })
    }

    /// Validate `config` and build the outstation it describes
    pub fn from_config(
        config: &OutstationConfig,
        sink: S,
        clock: Arc<dyn TimeProvider>,
    ) -> VoltageResult<Self> {
        config.validate()?;
        let database = config.build_database(clock.now())?;
        let propagation = config.build_propagation()?;
        let mut outstation =
            Self::new(database, propagation, config.build_policy(), sink, clock)?;
        outstation.link = LinkStateMonitor::new(config.outstation.buffer_capacity);
        outstation.link_config = config.link;
        outstation.allow_unsolicited = config.outstation.allow_unsolicited;
        Ok(outstation)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn enable(&mut self) {
        if self.state != OutstationState::Enabled {
            self.state = OutstationState::Enabled;
            self.on_state_change(OutstationState::Enabled);
        }
    }

    /// Stop accepting commands and drop any outstanding selection
    pub fn disable(&mut self) {
        if self.state != OutstationState::Disabled {
            self.state = OutstationState::Disabled;
            self.arbiter.clear_selection();
            self.on_state_change(OutstationState::Disabled);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state == OutstationState::Enabled
    }

    pub fn state(&self) -> OutstationState {
        self.state
    }

    // ========================================================================
    // Link events
    // ========================================================================

    pub fn on_link_event(&mut self, event: LinkEvent) {
        self.link.on_link_event(event);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn database(&self) -> &PointDatabase {
        self.arbiter.database()
    }

    pub fn read(&self, index: u16) -> VoltageResult<&Point> {
        self.arbiter.database().read(index)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.arbiter.selection()
    }

    pub fn link(&self) -> &LinkStateMonitor {
        &self.link
    }

    pub fn channel(&self) -> &ChannelMonitor {
        &self.channel
    }

    pub fn link_config(&self) -> LinkConfig {
        self.link_config
    }

    pub fn allow_unsolicited(&self) -> bool {
        self.allow_unsolicited
    }

    pub fn sink(&self) -> &S {
        &self.arbiter.sink().inner
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.arbiter.sink_mut().inner
    }

    fn guard(&mut self, index: u16) -> bool {
        if self.is_enabled() {
            self.link.record_request();
            true
        } else {
            warn!(index, "Command refused: outstation disabled");
            false
        }
    }

    fn flush_staged(&mut self) {
        let staged = std::mem::take(&mut self.arbiter.sink_mut().staged);
        for point in staged {
            self.link.buffer_update(point);
        }
    }
}

impl<S: UpdateSink> CommandHandler for Outstation<S> {
    fn begin(&mut self) {
        self.arbiter.begin();
    }

    fn end(&mut self) {
        self.arbiter.end();
    }

    fn select(
        &mut self,
        command: AnalogCommand,
        index: u16,
        op_type: OperationType,
    ) -> CommandStatus {
        if !self.guard(index) {
            return CommandStatus::NotSupported;
        }
        self.arbiter.select(command, index, op_type)
    }

    fn operate(
        &mut self,
        command: AnalogCommand,
        index: u16,
        op_type: OperationType,
    ) -> CommandStatus {
        if !self.guard(index) {
            return CommandStatus::NotSupported;
        }
        let status = self.arbiter.operate(command, index, op_type);
        self.flush_staged();
        status
    }

    fn direct_operate(
        &mut self,
        command: AnalogCommand,
        index: u16,
        op_type: OperationType,
    ) -> CommandStatus {
        if !self.guard(index) {
            return CommandStatus::NotSupported;
        }
        let status = self.arbiter.direct_operate(command, index, op_type);
        self.flush_staged();
        status
    }

    fn handle(&mut self, request: CommandRequest) -> CommandStatus {
        self.begin();
        let status = match request.mode {
            CommandMode::Select => {
                self.select(request.command, request.index, request.op_type)
            },
            CommandMode::Operate => {
                self.operate(request.command, request.index, request.op_type)
            },
            CommandMode::DirectOperate => {
                self.direct_operate(request.command, request.index, request.op_type)
            },
        };
        self.end();
        info!(
            mode = ?request.mode,
            index = request.index,
            status = %status,
            "Command handled"
        );
        status
    }
}

impl<S: UpdateSink> OutstationApplication for Outstation<S> {
    /// A `RESET` notification that follows a `RESET_LINK_STATES` frame
    /// reports the reset already run for that frame and is not repeated.
    fn on_link_state_change(&mut self, state: LinkState) {
        info!(%state, "Link state changed");
        match state {
            LinkState::Reset => {
                if std::mem::take(&mut self.frame_reset_pending) {
                    debug!("Link reset already handled for frame");
                } else {
                    self.on_link_event(LinkEvent::ToReset);
                }
            },
            LinkState::Unreset => {
                self.frame_reset_pending = false;
                self.on_link_event(LinkEvent::ToUnreset);
            },
        }
    }

    fn on_receive_iin(&mut self, iin: Iin) {
        info!(%iin, "Polling attempt received");
    }

    fn on_keep_alive_failure(&mut self) {
        self.link.on_keep_alive_failure();
    }

    fn on_keep_alive_success(&mut self) {
        self.link.on_keep_alive_success();
    }
}

impl<S: UpdateSink> ChannelListener for Outstation<S> {
    fn on_channel_state_change(&mut self, state: ChannelState) {
        self.channel.on_channel_state_change(state);
    }

    fn on_open(&mut self) {
        self.channel.on_open();
    }

    fn on_close(&mut self) {
        self.channel.on_close();
    }

    fn on_send_result(&mut self, num_bytes: usize) {
        self.channel.on_send_result(num_bytes);
    }

    /// `RESET_LINK_STATES` frames are routed to the link monitor
    fn on_receive(&mut self, header: &LinkHeader, body: &[u8]) {
        self.channel.on_receive(header, body);
        for _ in 0..self.channel.take_reset_requests() {
            self.on_link_event(LinkEvent::ToReset);
            self.frame_reset_pending = true;
        }
    }
}

/// Cloneable handle serializing access to one outstation
pub struct SharedOutstation<S> {
    inner: Arc<Mutex<Outstation<S>>>,
}

impl<S> Clone for SharedOutstation<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: UpdateSink> SharedOutstation<S> {
    pub fn new(outstation: Outstation<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(outstation)),
        }
    }

    pub fn handle(&self, request: CommandRequest) -> CommandStatus {
        self.inner.lock().handle(request)
    }

    pub fn on_link_event(&self, event: LinkEvent) {
        self.inner.lock().on_link_event(event);
    }

    /// Copy of the current point
    pub fn read(&self, index: u16) -> VoltageResult<Point> {
        self.inner.lock().read(index).copied()
    }

    /// Run `f` with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut Outstation<S>) -> R) -> R {
        f(&mut *self.inner.lock())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::channel::LinkFunction;
    use voltage_rtdb::FixedTimeProvider;

    fn atlas() -> Outstation<Vec<Point>> {
        let mut outstation = Outstation::from_config(
            &OutstationConfig::default(),
            Vec::new(),
            Arc::new(FixedTimeProvider::default()),
        )
        .unwrap();
        outstation.enable();
        outstation
    }

    #[test]
    fn test_disabled_outstation_refuses_commands() {
        let mut outstation = atlas();
        outstation.disable();
        let status = outstation.handle(CommandRequest::direct_operate(AnalogCommand::Int16(9), 0));
        assert_eq!(status, CommandStatus::NotSupported);
        assert_eq!(outstation.link().request_count(), 0);
        assert!(outstation.sink().is_empty());
    }

    #[test]
    fn test_disable_drops_selection() {
        let mut outstation = atlas();
        outstation.handle(CommandRequest::select(AnalogCommand::Int16(9), 0));
        outstation.disable();
        outstation.enable();
        let status = outstation.handle(CommandRequest::operate(AnalogCommand::Int16(9), 0));
        assert_eq!(status, CommandStatus::NoSelect);
    }

    #[test]
    fn test_commits_are_buffered_until_link_reset() {
        let mut outstation = atlas();
        outstation.handle(CommandRequest::direct_operate(AnalogCommand::Int16(9), 0));
        assert_eq!(outstation.link().request_count(), 1);
        assert_eq!(outstation.link().buffered_len(), 2);

        outstation.on_receive(&LinkHeader::new(LinkFunction::ResetLinkStates, 100, 1), &[]);
        assert_eq!(outstation.link().state(), LinkState::Reset);
        assert_eq!(outstation.link().request_count(), 0);
        assert_eq!(outstation.link().buffered_len(), 0);
        // Database untouched by the reset
        assert_eq!(outstation.read(4).unwrap().value, 9.0);
    }

    #[test]
    fn test_link_state_notification_routes_to_monitor() {
        let mut outstation = atlas();
        outstation.on_link_state_change(LinkState::Reset);
        assert_eq!(outstation.link().reset_count(), 1);
        outstation.on_link_state_change(LinkState::Unreset);
        assert_eq!(outstation.link().state(), LinkState::Unreset);
        assert_eq!(outstation.link().reset_count(), 1);
    }

    #[test]
    fn test_reset_frame_then_notification_resets_once() {
        let mut outstation = atlas();
        let frame = LinkHeader::new(LinkFunction::ResetLinkStates, 100, 1);
        outstation.on_receive(&frame, &[]);
        outstation.on_link_state_change(LinkState::Reset);
        assert_eq!(outstation.link().reset_count(), 1);

        // Later notifications without a frame each reset
        outstation.on_link_state_change(LinkState::Reset);
        outstation.on_link_state_change(LinkState::Reset);
        assert_eq!(outstation.link().reset_count(), 3);
    }

    #[test]
    fn test_unreset_discards_pending_frame_reset() {
        let mut outstation = atlas();
        outstation.on_receive(&LinkHeader::new(LinkFunction::ResetLinkStates, 100, 1), &[]);
        outstation.on_link_state_change(LinkState::Unreset);
        outstation.handle(CommandRequest::direct_operate(AnalogCommand::Int16(9), 0));

        outstation.on_link_state_change(LinkState::Reset);
        assert_eq!(outstation.link().reset_count(), 2);
        assert_eq!(outstation.link().request_count(), 0);
        assert_eq!(outstation.link().buffered_len(), 0);
    }

    #[test]
    fn test_state_callbacks_resolve_by_method_syntax() {
        let mut outstation = atlas();
        outstation.disable();
        outstation.on_state_change(OutstationState::Enabled);
        outstation.on_channel_state_change(ChannelState::Open);
        assert_eq!(outstation.channel().state(), ChannelState::Open);
        // The notification is informational; the enable flag is owned by `enable`
        assert!(!outstation.is_enabled());
    }

    #[test]
    fn test_keep_alive_tracking() {
        let mut outstation = atlas();
        outstation.on_keep_alive_initiated();
        outstation.on_keep_alive_failure();
        assert_eq!(outstation.link().keep_alive_failures(), 1);
        outstation.on_keep_alive_success();
        assert_eq!(outstation.link().keep_alive_failures(), 0);
    }

    #[test]
    fn test_shared_handle() {
        let shared = SharedOutstation::new(atlas());
        let other = shared.clone();
        assert_eq!(
            other.handle(CommandRequest::select(AnalogCommand::Int16(3), 1)),
            CommandStatus::Success
        );
        assert_eq!(
            shared.handle(CommandRequest::operate(AnalogCommand::Int16(3), 1)),
            CommandStatus::Success
        );
        assert_eq!(shared.read(5).unwrap().value, 3.0);
        assert_eq!(shared.with(|o| o.sink().len()), 2);
    }
}
