//! VoltageEMS Realtime Point Database
//!
//! Holds the outstation's analog points and the static rules that republish a
//! committed value to derived points.
//!
//! # Key Components
//!
//! - **PointDatabase**: fixed-size, fully initialized point storage
//! - **PropagationTable**: `source → [targets]` republication rules
//! - **TimeProvider**: injected clock used to stamp commits

pub mod database;

pub mod point;

pub mod propagation;

pub mod time;

// Re-exports
pub use database::PointDatabase;
pub use point::{Flags, Point, Timestamp};
pub use propagation::{PropagationRule, PropagationTable};
pub use time::{FixedTimeProvider, ManualTimeProvider, SystemTimeProvider, TimeProvider};
