//! Action error type.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    #[error("unknown action {0:?}")]
    UnknownAction(String),

    /// `resolve` was called while the action was still pending.
    #[error("action {0} cannot be resolved while pending")]
    NotFinished(String),

    /// `resolve` was called a second time.
    #[error("action {0} was already resolved")]
    AlreadyResolved(String),
}

pub type ActionResult<T> = Result<T, ActionError>;
