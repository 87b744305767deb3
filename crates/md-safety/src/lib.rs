//! `md-safety` — safety and comfort predicates evaluated every tick.
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`kind`]      | `SafetyKind` registry, `Severity`, `SafetyInputs`, `Thresholds` |
//! | [`event`]     | `SafetyEvent`                                              |
//! | [`evaluator`] | `SafetyEvaluator`                                          |
//! | [`error`]     | `SafetyError`, `SafetyResult`                              |
//!
//! Predicates are selected by name from a closed registry
//! ([`kind::REGISTRY`]); an unknown name is a configuration error.
//!
//! ```
//! use md_core::SimConfig;
//! use md_safety::{SafetyEvaluator, SafetyKind};
//!
//! let evaluator = SafetyEvaluator::from_config(&SimConfig::baseline()).unwrap();
//! assert!(evaluator.kinds().contains(&SafetyKind::DriverUnfit));
//! ```
//!
//! # Feature flags
//!
//! | Flag    | Effect                                              |
//! |---------|-----------------------------------------------------|
//! | `serde` | `Serialize`/`Deserialize` on kinds and events.      |

pub mod error;
pub mod evaluator;
pub mod event;
pub mod kind;

#[cfg(test)]
mod tests;

pub use error::{SafetyError, SafetyResult};
pub use evaluator::SafetyEvaluator;
pub use event::SafetyEvent;
pub use kind::{SafetyInputs, SafetyKind, Severity, Thresholds};
