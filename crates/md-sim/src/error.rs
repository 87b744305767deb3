//! Orchestrator error type.
//!
//! Construction errors from the lower crates convert in with `#[from]`.
//! `NotReset` and `Terminated` are caller errors on the reset/step contract
//! and are never recovered from inside the crate.

use md_action::ActionError;
use md_core::ConfigError;
use md_road::RoadError;
use md_rules::RuleError;
use md_safety::SafetyError;
use thiserror::Error;

use crate::TerminalReason;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("road error: {0}")]
    Road(#[from] RoadError),

    #[error("action error: {0}")]
    Action(#[from] ActionError),

    #[error("decision rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("safety configuration error: {0}")]
    Safety(#[from] SafetyError),

    #[error("step called before reset")]
    NotReset,

    /// The run already ended; a new `reset` is required.
    #[error("step called on a finished run ({0})")]
    Terminated(TerminalReason),

    #[error("action {0:?} is not in the configured vocabulary")]
    Unavailable(String),

    #[error("simulation invariant violated: {0}")]
    Invariant(String),
}

pub type SimResult<T> = Result<T, SimError>;
