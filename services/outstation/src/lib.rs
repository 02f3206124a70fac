//! Outstation command core
//!
//! Select-before-operate arbitration of analog setpoints, propagation of
//! committed values to derived points, and link reset bookkeeping for a
//! DNP3-style outstation. Framing, transport and channel management belong
//! to the hosting protocol stack, which drives this crate through the
//! callback traits below.
//!
//! # Components
//!
//! - **CommandArbiter**: select / operate / direct operate state machine
//! - **LinkStateMonitor**: `UNRESET`/`RESET` tracking and internal reset
//! - **ChannelMonitor**: channel lifecycle and `RESET_LINK_STATES` detection
//! - **Outstation**: wiring of the above, built from `OutstationConfig`

pub mod application;
pub mod arbiter;
pub mod channel;
pub mod command;
pub mod config;
pub mod link;
pub mod outstation;
pub mod sink;

pub use application::{Iin, LoggingApplication, OutstationApplication, OutstationState};
pub use arbiter::{CommandArbiter, CommandHandler, CommandPolicy, Selection};
pub use channel::{
    ChannelListener, ChannelMonitor, ChannelState, ChannelStats, LinkFunction, LinkHeader,
};
pub use command::{
    AnalogCommand, CommandKind, CommandMode, CommandRequest, CommandStatus, OperationType,
};
pub use config::OutstationConfig;
pub use link::{LinkEvent, LinkState, LinkStateMonitor};
pub use outstation::{Outstation, SharedOutstation};
pub use sink::{NullSink, UpdateSink};

/// Common imports for hosts embedding the outstation
pub mod prelude {
    pub use crate::{
        AnalogCommand, ChannelListener, CommandHandler, CommandRequest, CommandStatus, LinkEvent,
        Outstation, OutstationApplication, OutstationConfig, UpdateSink,
    };
    pub use voltage_rtdb::{Point, SystemTimeProvider, TimeProvider};
}
