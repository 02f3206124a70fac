//! Unified error handling for the VoltageEMS outstation
//!
//! Command arbitration never fails with an error: rejected commands are
//! reported through protocol status codes. `VoltageError` covers everything
//! else, which in practice means configuration and database invariants.

use thiserror::Error;

// ============================================================================
// VoltageError - Main error type
// ============================================================================

/// Main error type for the outstation crates
#[derive(Debug, Error)]
pub enum VoltageError {
    // ======================================
    // Configuration Errors
    // ======================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // ======================================
    // Point Database Errors
    // ======================================
    #[error("Point index {index} out of range for database of size {size}")]
    PointIndexOutOfRange { index: u16, size: u16 },

    #[error("Point {0} defined more than once")]
    DuplicatePoint(u16),

    #[error("Propagation rule for source {0} defined more than once")]
    DuplicateRule(u16),
}

/// Result type alias using VoltageError
pub type VoltageResult<T> = Result<T, VoltageError>;

/// Error category enum - used for classification in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Database,
}

impl VoltageError {
    /// Get error code (for logs and monitoring)
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::MissingConfig(_) => "MISSING_CONFIG",
            Self::PointIndexOutOfRange { .. } => "POINT_INDEX_OUT_OF_RANGE",
            Self::DuplicatePoint(_) => "DUPLICATE_POINT",
            Self::DuplicateRule(_) => "DUPLICATE_RULE",
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::InvalidConfig { .. } | Self::MissingConfig(_) => {
                ErrorCategory::Configuration
            },

            Self::PointIndexOutOfRange { .. } | Self::DuplicatePoint(_) | Self::DuplicateRule(_) => {
                ErrorCategory::Database
            },
        }
    }

    /// Whether the outstation must refuse to start when this error is raised
    ///
    /// Every error this crate defines is raised while building the
    /// outstation; none of them is recoverable at runtime.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Configuration | ErrorCategory::Database
        )
    }
}

impl From<figment::Error> for VoltageError {
    fn from(err: figment::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

// Helper macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::VoltageError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::VoltageError::Configuration(format!($fmt, $($arg)*))
    };
}
