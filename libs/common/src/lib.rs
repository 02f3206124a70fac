//! `VoltageEMS` basic library
//!
//! Provides functions shared by the outstation crates:
//! - logging initialization
//! - layered configuration loading

pub mod config_loader;
pub mod logging;

pub use config_loader::{figment_for, load_config};
pub use logging::{init_with_config, LogConfig};

// Re-export common dependencies
pub use figment;
pub use serde;
