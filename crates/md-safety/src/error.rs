//! Safety error type.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SafetyError {
    /// A configured safety predicate name is not in the registry.
    #[error("unknown safety event {0:?}")]
    UnknownKind(String),
}

pub type SafetyResult<T> = Result<T, SafetyError>;
