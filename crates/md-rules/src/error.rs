//! Rule error type.
//!
//! Parse-time errors (`Syntax`, `Indent`, `DanglingRule`, `UnknownTree`,
//! `DuplicateTree`, `Cycle`) make a tree unusable.  Evaluation errors
//! (`VariableDomain`, `UnknownVariable`, `Type`) fail the decision for one
//! tick; no default branch is ever guessed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("wrong indentation on line {line}: {text:?}")]
    Indent { line: usize, text: String },

    #[error("rule on line {line} has no branches")]
    DanglingRule { line: usize },

    /// The evaluated value has no corresponding branch.
    #[error("{value} is not a valid value for `{expr}`")]
    VariableDomain { value: String, expr: String },

    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("unknown tree {0:?}")]
    UnknownTree(String),

    #[error("tree name {0:?} is used more than once")]
    DuplicateTree(String),

    #[error("tree {0:?} includes itself")]
    Cycle(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuleError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        RuleError::Syntax { line, message: message.into() }
    }
}

pub type RuleResult<T> = Result<T, RuleError>;
