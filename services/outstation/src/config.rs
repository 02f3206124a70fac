//! Outstation configuration
//!
//! Loaded through `common::load_config` (defaults ← file ← `OUTSTATION_`
//! environment variables). `Default` is the ATLAS reference deployment.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::LogConfig;
use errors::{VoltageError, VoltageResult};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use voltage_rtdb::{PointDatabase, PropagationRule, PropagationTable, Timestamp};

use crate::arbiter::CommandPolicy;
use crate::command::CommandKind;
use crate::link::{DEFAULT_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "OUTSTATION_";

// ============================================================================
// Sections
// ============================================================================

/// One analog point with its initial value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointConfig {
    pub index: u16,
    #[serde(default)]
    pub name: String,
    pub value: f64,
}

impl PointConfig {
    pub fn new(index: u16, name: impl Into<String>, value: f64) -> Self {
        Self {
            index,
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub size: u16,
    pub points: Vec<PointConfig>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let points = vec![
            PointConfig::new(0, "ATLAS_AGC_STATUS_CMOD", 1.0),
            PointConfig::new(1, "ATLAS_SETPOINT_ECHO", 2.0),
            PointConfig::new(2, "ATLAS_NET_MW", 3.0),
            PointConfig::new(3, "ATLAS_LOAD", 4.0),
            PointConfig::new(4, "ATLAS_SETPOINT_INSTRUCTION", 5.0),
            PointConfig::new(5, "ATLAS_SETPOINT_INSTRUCTION.status", 6.0),
            PointConfig::new(6, "ATLAS_SETPOINT_INSTRUCTION.oper", 7.0),
        ];
        Self {
            size: points.len() as u16,
            points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Indices that accept select and direct operate
    pub writable: Vec<u16>,
    pub supported: Vec<CommandKind>,
    /// Selection lifetime; selections never expire when unset
    pub select_timeout_ms: Option<u64>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            writable: vec![0, 1],
            supported: vec![CommandKind::AnalogOutputInt16],
            select_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    pub rules: Vec<PropagationRule>,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                PropagationRule::targets_only(0, vec![4, 6]),
                PropagationRule::targets_only(1, vec![1, 5]),
            ],
        }
    }
}

/// Link-layer addressing, consumed by the hosting stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub local_addr: u16,
    pub remote_addr: u16,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            local_addr: 1,
            remote_addr: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutstationSection {
    pub allow_unsolicited: bool,
    /// Recent updates kept until the next link reset
    pub buffer_capacity: usize,
}

impl Default for OutstationSection {
    fn default() -> Self {
        Self {
            allow_unsolicited: true,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            dir: None,
        }
    }
}

// ============================================================================
// Root
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutstationConfig {
    pub database: DatabaseConfig,
    pub commands: CommandsConfig,
    pub propagation: PropagationConfig,
    pub link: LinkConfig,
    pub outstation: OutstationSection,
    pub logging: LoggingConfig,
}

impl OutstationConfig {
    /// Load and validate
    pub fn load(path: Option<&Path>) -> VoltageResult<Self> {
        let config: Self = common::load_config(path, ENV_PREFIX)?;
        if let Err(e) = config.validate() {
            error!(
                code = e.error_code(),
                category = ?e.category(),
                "Outstation configuration rejected: {}",
                e
            );
            return Err(e);
        }
        info!(
            points = config.database.size,
            rules = config.propagation.rules.len(),
            local_addr = config.link.local_addr,
            remote_addr = config.link.remote_addr,
            "Outstation configuration ready"
        );
        Ok(config)
    }

    /// Check every cross-reference before anything is built
    pub fn validate(&self) -> VoltageResult<()> {
        if self.database.size == 0 {
            return Err(VoltageError::InvalidConfig {
                field: "database.size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        let mut names = HashSet::new();
        for point in &self.database.points {
            if !point.name.is_empty() && !names.insert(point.name.as_str()) {
                return Err(VoltageError::InvalidConfig {
                    field: "database.points".to_string(),
                    reason: format!("duplicate point name '{}'", point.name),
                });
            }
        }

        if self.commands.supported.is_empty() {
            return Err(VoltageError::InvalidConfig {
                field: "commands.supported".to_string(),
                reason: "at least one command type is required".to_string(),
            });
        }
        if let Some(&index) = self
            .commands
            .writable
            .iter()
            .find(|&&index| index >= self.database.size)
        {
            return Err(VoltageError::PointIndexOutOfRange {
                index,
                size: self.database.size,
            });
        }
        if self.outstation.buffer_capacity > MAX_BUFFER_CAPACITY {
            return Err(VoltageError::InvalidConfig {
                field: "outstation.buffer_capacity".to_string(),
                reason: format!("must not exceed {}", MAX_BUFFER_CAPACITY),
            });
        }
        if self.commands.select_timeout_ms == Some(0) {
            return Err(VoltageError::InvalidConfig {
                field: "commands.select_timeout_ms".to_string(),
                reason: "must be greater than 0 when set".to_string(),
            });
        }

        self.build_database(Timestamp::ZERO)?;
        self.build_propagation()?;
        Ok(())
    }

    pub fn build_database(&self, time: Timestamp) -> VoltageResult<PointDatabase> {
        PointDatabase::initialize(
            self.database.size,
            self.database.points.iter().map(|p| (p.index, p.value)),
            time,
        )
    }

    pub fn build_propagation(&self) -> VoltageResult<PropagationTable> {
        PropagationTable::new(self.propagation.rules.iter().cloned(), self.database.size)
    }

    pub fn build_policy(&self) -> CommandPolicy {
        let policy = CommandPolicy::new(
            self.commands.writable.iter().copied(),
            self.commands.supported.iter().copied(),
        );
        match self.commands.select_timeout_ms {
            Some(ms) => policy.with_select_timeout(Duration::from_millis(ms)),
            None => policy,
        }
    }

    /// Configured name of a point, if any
    pub fn point_name(&self, index: u16) -> Option<&str> {
        self.database
            .points
            .iter()
            .find(|p| p.index == index && !p.name.is_empty())
            .map(|p| p.name.as_str())
    }

    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.logging.level.clone(),
            log_dir: self.logging.dir.clone(),
            enable_json: self.logging.json,
            ..LogConfig::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_default_is_atlas_deployment() {
        let config = OutstationConfig::default();
        config.validate().unwrap();

        let db = config.build_database(Timestamp::ZERO).unwrap();
        assert_eq!(db.values(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(config.point_name(2), Some("ATLAS_NET_MW"));

        let table = config.build_propagation().unwrap();
        assert_eq!(table.commit_plan(0), vec![4, 6]);
        assert_eq!(table.commit_plan(1), vec![1, 5]);

        let policy = config.build_policy();
        assert!(policy.accepts(CommandKind::AnalogOutputInt16, 1));
        assert!(!policy.accepts(CommandKind::AnalogOutputInt16, 2));
        assert_eq!(policy.select_timeout(), None);

        assert_eq!(config.link.local_addr, 1);
        assert_eq!(config.link.remote_addr, 100);
        assert!(config.outstation.allow_unsolicited);
    }

    #[test]
    fn test_partial_database_rejected() {
        let mut config = OutstationConfig::default();
        config.database.points.pop();
        assert!(matches!(
            config.validate(),
            Err(VoltageError::MissingConfig(_))
        ));
    }

    #[test]
    fn test_writable_out_of_range_rejected() {
        let mut config = OutstationConfig::default();
        config.commands.writable.push(7);
        assert!(matches!(
            config.validate(),
            Err(VoltageError::PointIndexOutOfRange { index: 7, size: 7 })
        ));
    }

    #[test]
    fn test_duplicate_point_name_rejected() {
        let mut config = OutstationConfig::default();
        config.database.points[3].name = "ATLAS_NET_MW".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = OutstationConfig::default();
        config.commands.select_timeout_ms = Some(0);
        assert!(config.validate().is_err());

        config.commands.select_timeout_ms = Some(250);
        config.validate().unwrap();
        assert_eq!(
            config.build_policy().select_timeout(),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_buffer_capacity_bounded() {
        let mut config = OutstationConfig::default();
        config.outstation.buffer_capacity = usize::MAX;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            VoltageError::InvalidConfig { ref field, .. } if field == "outstation.buffer_capacity"
        ));
        assert!(err.is_fatal());

        config.outstation.buffer_capacity = MAX_BUFFER_CAPACITY;
        config.validate().unwrap();
        config.outstation.buffer_capacity = 0;
        config.validate().unwrap();
    }

    #[test]
    fn test_log_config_mapping() {
        let mut config = OutstationConfig::default();
        config.logging.level = "debug".to_string();
        config.logging.json = true;
        let log = config.to_log_config();
        assert_eq!(log.service_name, "outstation");
        assert_eq!(log.level, "debug");
        assert!(log.enable_json);
        assert!(log.log_dir.is_none());
    }
}
