//! `md-action` — what the mediator can ask of the driver and the car.
//!
//! | Module     | Contents                                                       |
//! |------------|----------------------------------------------------------------|
//! | [`id`]     | `ActionId`, `ActionCommand`, `ActionArgs`, `Vocabulary`        |
//! | [`action`] | `Action` lifecycle, `Resolution`, `ActionSummary`              |
//! | [`error`]  | `ActionError`, `ActionResult`                                  |
//!
//! At most one action is pending in a run.  The orchestrator owns it, steps
//! it every tick and resolves it once its outcome is fixed; resolution
//! mutates the driver directly and reports level shifts and emergency stops
//! back as a [`Resolution`].
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | `Serialize`/`Deserialize` on ids, commands and summaries.  |

pub mod action;
pub mod error;
pub mod id;


pub use action::{Action, ActionSummary, Resolution};
pub use error::{ActionError, ActionResult};
pub use id::{ActionArgs, ActionCommand, ActionId, Vocabulary, ACTION_CODES, CANCEL, DO_NOTHING};
