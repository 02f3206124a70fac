//! Select-before-operate command arbitration
//!
//! ```text
//!              select (accepted)
//!   NotSelected ───────────────► Selected ──┐ select: re-arm at new index
//!        ▲  │                        │  ◄───┘
//!        │  │ direct_operate         │ operate (same index and type)
//!        │  ▼                        ▼
//!        └─────────── Committed ◄────┘
//! ```
//!
//! There is a single selection slot for the whole outstation. A commit writes
//! the operated value to every index of the propagation plan, one
//! single-point update at a time, and reports each update to the sink. The
//! plan is validated against the database before the first write, so a
//! commit either applies completely or not at all.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use errors::{VoltageError, VoltageResult};
use tracing::{debug, error, info, warn};
use voltage_rtdb::{Flags, PointDatabase, PropagationTable, TimeProvider, Timestamp};

use crate::command::{AnalogCommand, CommandKind, CommandRequest, CommandMode, CommandStatus, OperationType};
use crate::sink::UpdateSink;

/// Handler for the three command entry points a master station may invoke
///
/// The transport calls these synchronously, one request at a time. `begin`
/// and `end` bracket the commands carried by one request fragment.
pub trait CommandHandler {
    fn begin(&mut self) {}

    fn end(&mut self) {}

    fn select(&mut self, command: AnalogCommand, index: u16, op_type: OperationType)
        -> CommandStatus;

    fn operate(&mut self, command: AnalogCommand, index: u16, op_type: OperationType)
        -> CommandStatus;

    fn direct_operate(
        &mut self,
        command: AnalogCommand,
        index: u16,
        op_type: OperationType,
    ) -> CommandStatus;

    /// Dispatch a parsed request to the matching entry point
    fn handle(&mut self, request: CommandRequest) -> CommandStatus {
        match request.mode {
            CommandMode::Select => self.select(request.command, request.index, request.op_type),
            CommandMode::Operate => self.operate(request.command, request.index, request.op_type),
            CommandMode::DirectOperate => {
                self.direct_operate(request.command, request.index, request.op_type)
            },
        }
    }
}

/// Which commands this outstation accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPolicy {
    writable: BTreeSet<u16>,
    supported: Vec<CommandKind>,
    select_timeout: Option<Duration>,
}

impl CommandPolicy {
    pub fn new(
        writable: impl IntoIterator<Item = u16>,
        supported: impl IntoIterator<Item = CommandKind>,
    ) -> Self {
        let mut supported: Vec<CommandKind> = supported.into_iter().collect();
        supported.dedup();
        Self {
            writable: writable.into_iter().collect(),
            supported,
            select_timeout: None,
        }
    }

    /// Expire selections older than `timeout`
    pub fn with_select_timeout(mut self, timeout: Duration) -> Self {
        self.select_timeout = Some(timeout);
        self
    }

    #[inline]
    pub fn is_writable(&self, index: u16) -> bool {
        self.writable.contains(&index)
    }

    #[inline]
    pub fn supports(&self, kind: CommandKind) -> bool {
        self.supported.contains(&kind)
    }

    /// Both the command type and the index are accepted
    #[inline]
    pub fn accepts(&self, kind: CommandKind, index: u16) -> bool {
        self.supports(kind) && self.is_writable(index)
    }

    pub fn writable(&self) -> impl Iterator<Item = u16> + '_ {
        self.writable.iter().copied()
    }

    pub fn select_timeout(&self) -> Option<Duration> {
        self.select_timeout
    }
}

/// The outstanding selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub index: u16,
    pub kind: CommandKind,
    pub selected_at: Timestamp,
}

/// Select/operate arbiter owning the point database it writes to
pub struct CommandArbiter<S> {
    database: PointDatabase,
    propagation: PropagationTable,
    policy: CommandPolicy,
    selection: Option<Selection>,
    sink: S,
    clock: Arc<dyn TimeProvider>,
}

impl<S: UpdateSink> CommandArbiter<S> {
    /// Wire the arbiter to its database, rules and update sink
    ///
    /// # Errors
    /// `PointIndexOutOfRange` if a writable index or any propagation index
    /// does not address a point of `database`.
    pub fn new(
        database: PointDatabase,
        propagation: PropagationTable,
        policy: CommandPolicy,
        sink: S,
        clock: Arc<dyn TimeProvider>,
    ) -> VoltageResult<Self> {
        let size = database.size();
        let rule_indices = propagation
            .rules()
            .flat_map(|rule| std::iter::once(rule.source).chain(rule.targets.iter().copied()));
        if let Some(index) = policy
            .writable()
            .chain(rule_indices)
            .find(|&index| !database.contains(index))
        {
            return Err(VoltageError::PointIndexOutOfRange { index, size });
        }

        Ok(Self {
            database,
            propagation,
            policy,
            selection: None,
            sink,
            clock,
        })
    }

    pub fn database(&self) -> &PointDatabase {
        &self.database
    }

    pub fn propagation(&self) -> &PropagationTable {
        &self.propagation
    }

    pub fn policy(&self) -> &CommandPolicy {
        &self.policy
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Drop any outstanding selection
    pub fn clear_selection(&mut self) {
        if let Some(selection) = self.selection.take() {
            debug!(index = selection.index, "Selection cleared");
        }
    }

    fn is_expired(&self, selection: &Selection) -> bool {
        match self.policy.select_timeout {
            Some(timeout) => {
                let age = self.clock.now().millis_since(selection.selected_at);
                u128::from(age) > timeout.as_millis()
            },
            None => false,
        }
    }

    /// Commit `command` to `index` and every propagation target
    fn execute(&mut self, command: AnalogCommand, index: u16) -> CommandStatus {
        let plan = self.propagation.commit_plan(index);
        if let Some(&target) = plan.iter().find(|&&i| !self.database.contains(i)) {
            error!(
                index,
                target,
                size = self.database.size(),
                "Commit aborted: plan references a point outside the database"
            );
            return CommandStatus::NotSupported;
        }

        let value = command.value();
        let time = self.clock.now();
        for target in plan {
            // Plan validated above; commit cannot fail here
            let point = match self.database.commit(target, value, Flags::ONLINE, time) {
                Ok(point) => point,
                Err(e) => {
                    error!(index, target, "Commit failed: {}", e);
                    return CommandStatus::NotSupported;
                },
            };
            debug!(source = index, index = target, value, "Commit applied");
            self.sink.on_update(&point);
        }

        info!(index, value, kind = %command.kind(), "Command executed");
        CommandStatus::Success
    }
}

impl<S: UpdateSink> CommandHandler for CommandArbiter<S> {
    fn begin(&mut self) {
        debug!("Command sequence begin");
    }

    fn end(&mut self) {
        debug!("Command sequence end");
    }

    fn select(
        &mut self,
        command: AnalogCommand,
        index: u16,
        op_type: OperationType,
    ) -> CommandStatus {
        let kind = command.kind();
        if !self.policy.accepts(kind, index) {
            warn!(index, %kind, ?op_type, "Selection rejected: not supported");
            return CommandStatus::NotSupported;
        }

        let selection = Selection {
            index,
            kind,
            selected_at: self.clock.now(),
        };
        if let Some(previous) = self.selection.replace(selection) {
            debug!(previous = previous.index, index, "Selection replaced");
        }
        info!(index, %kind, ?op_type, "Selection armed");
        CommandStatus::Success
    }

    fn operate(
        &mut self,
        command: AnalogCommand,
        index: u16,
        op_type: OperationType,
    ) -> CommandStatus {
        let Some(selection) = self.selection else {
            warn!(index, ?op_type, "Operate rejected: no selection");
            return CommandStatus::NoSelect;
        };

        let kind = command.kind();
        if selection.index != index || selection.kind != kind {
            warn!(
                index,
                %kind,
                selected_index = selection.index,
                selected_kind = %selection.kind,
                "Operate rejected: selection mismatch"
            );
            return CommandStatus::NoSelect;
        }

        if self.is_expired(&selection) {
            self.selection = None;
            warn!(index, "Operate rejected: selection expired");
            return CommandStatus::Timeout;
        }

        let status = self.execute(command, index);
        if status.is_success() {
            self.selection = None;
        }
        status
    }

    fn direct_operate(
        &mut self,
        command: AnalogCommand,
        index: u16,
        op_type: OperationType,
    ) -> CommandStatus {
        let kind = command.kind();
        if !self.policy.accepts(kind, index) {
            warn!(index, %kind, ?op_type, "Direct operate rejected: not supported");
            return CommandStatus::NotSupported;
        }
        self.execute(command, index)
    }
}
