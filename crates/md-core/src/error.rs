//! Configuration error type.
//!
//! Sub-crates define their own error enums and wrap `ConfigError` as one
//! variant via `#[from]`, so a malformed table surfaces the same way no
//! matter which component tripped over it.

use thiserror::Error;

/// Raised while building or validating a [`SimConfig`][crate::SimConfig].
/// Always fatal for run construction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        field:  &'static str,
        reason: String,
    },

    #[error("road type {0:?} is required but not configured")]
    MissingRoadType(String),

    #[error("unknown road type {0:?}")]
    UnknownRoadType(String),

    #[error("unknown automation level {0:?}: expected L0, L2, L3 or L4")]
    UnknownLevel(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid { field, reason: reason.into() }
    }
}

/// Shorthand result type for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;
