//! Command types delivered by the transport layer
//!
//! Only analog output commands reach this core. The transport has already
//! parsed the request; what arrives here is the typed command value, the
//! target index, the operation type and which of the three entry points the
//! master invoked.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Analog output command type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// Group 41 variation 2
    #[serde(alias = "int16")]
    AnalogOutputInt16,
    /// Group 41 variation 1
    #[serde(alias = "int32")]
    AnalogOutputInt32,
    /// Group 41 variation 3
    #[serde(alias = "float32")]
    AnalogOutputFloat32,
    /// Group 41 variation 4
    #[serde(alias = "double64")]
    AnalogOutputDouble64,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::AnalogOutputInt16 => "AnalogOutputInt16",
            CommandKind::AnalogOutputInt32 => "AnalogOutputInt32",
            CommandKind::AnalogOutputFloat32 => "AnalogOutputFloat32",
            CommandKind::AnalogOutputDouble64 => "AnalogOutputDouble64",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analog output command with its typed value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalogCommand {
    Int16(i16),
    Int32(i32),
    Float32(f32),
    Double64(f64),
}

impl AnalogCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            AnalogCommand::Int16(_) => CommandKind::AnalogOutputInt16,
            AnalogCommand::Int32(_) => CommandKind::AnalogOutputInt32,
            AnalogCommand::Float32(_) => CommandKind::AnalogOutputFloat32,
            AnalogCommand::Double64(_) => CommandKind::AnalogOutputDouble64,
        }
    }

    /// Engineering value stored into the analog point
    ///
    /// Lossless for every variant: an `f64` holds any `i16`, `i32` or `f32`.
    pub fn value(&self) -> f64 {
        match *self {
            AnalogCommand::Int16(v) => f64::from(v),
            AnalogCommand::Int32(v) => f64::from(v),
            AnalogCommand::Float32(v) => f64::from(v),
            AnalogCommand::Double64(v) => v,
        }
    }
}

impl fmt::Display for AnalogCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.value())
    }
}

/// Operation type carried alongside the command
///
/// Meaningful for binary outputs; analog setpoints accept whatever the
/// master sends, and the core only logs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OperationType {
    #[default]
    Nul,
    PulseOn,
    PulseOff,
    LatchOn,
    LatchOff,
    Undefined,
}

/// Command response status (DNP3 control status codes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandStatus {
    /// Command accepted and executed
    Success,
    /// Selection expired before the operate arrived
    Timeout,
    /// Operate without a matching select
    NoSelect,
    /// Command type or index not accepted by this outstation
    NotSupported,
}

impl CommandStatus {
    /// Status code as reported on the wire
    pub fn code(&self) -> u8 {
        match self {
            CommandStatus::Success => 0,
            CommandStatus::Timeout => 1,
            CommandStatus::NoSelect => 2,
            CommandStatus::NotSupported => 4,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommandStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Success => "SUCCESS",
            CommandStatus::Timeout => "TIMEOUT",
            CommandStatus::NoSelect => "NO_SELECT",
            CommandStatus::NotSupported => "NOT_SUPPORTED",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which entry point the master invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandMode {
    Select,
    Operate,
    DirectOperate,
}

/// A parsed command request as delivered by the transport layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandRequest {
    pub mode: CommandMode,
    pub command: AnalogCommand,
    pub index: u16,
    pub op_type: OperationType,
}

impl CommandRequest {
    pub fn select(command: AnalogCommand, index: u16) -> Self {
        Self::new(CommandMode::Select, command, index)
    }

    pub fn operate(command: AnalogCommand, index: u16) -> Self {
        Self::new(CommandMode::Operate, command, index)
    }

    pub fn direct_operate(command: AnalogCommand, index: u16) -> Self {
        Self::new(CommandMode::DirectOperate, command, index)
    }

    fn new(mode: CommandMode, command: AnalogCommand, index: u16) -> Self {
        Self {
            mode,
            command,
            index,
            op_type: OperationType::default(),
        }
    }

    pub fn with_op_type(mut self, op_type: OperationType) -> Self {
        self.op_type = op_type;
        self
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_command_value_and_kind() {
        assert_eq!(AnalogCommand::Int16(-42).value(), -42.0);
        assert_eq!(AnalogCommand::Int32(70_000).value(), 70_000.0);
        assert_eq!(AnalogCommand::Float32(1.5).value(), 1.5);
        assert_eq!(
            AnalogCommand::Double64(0.25).kind(),
            CommandKind::AnalogOutputDouble64
        );
        assert_eq!(AnalogCommand::Int16(42).to_string(), "AnalogOutputInt16(42)");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CommandStatus::Success.code(), 0);
        assert_eq!(CommandStatus::NoSelect.code(), 2);
        assert_eq!(CommandStatus::NotSupported.code(), 4);
        assert_eq!(CommandStatus::NoSelect.to_string(), "NO_SELECT");
    }

    #[test]
    fn test_kind_deserialize_aliases() {
        let kinds: Vec<CommandKind> =
            serde_json::from_str(r#"["AnalogOutputInt16", "int32"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![CommandKind::AnalogOutputInt16, CommandKind::AnalogOutputInt32]
        );
    }

    #[test]
    fn test_request_builders() {
        let req = CommandRequest::operate(AnalogCommand::Int16(5), 1)
            .with_op_type(OperationType::LatchOn);
        assert_eq!(req.mode, CommandMode::Operate);
        assert_eq!(req.op_type, OperationType::LatchOn);
        assert_eq!(
            CommandRequest::select(AnalogCommand::Int16(5), 1).op_type,
            OperationType::Nul
        );
    }
}
