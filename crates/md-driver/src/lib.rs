//! `md-driver` — the driver of a mediator run.
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`event`]     | `DriverEvent` and its per-kind state machines             |
//! | [`generator`] | `DriverEventGenerator` (random and preset)                |
//! | [`driver`]    | `Driver`, `DriverState`, the TTDU/TTDF model              |

pub mod driver;
pub mod event;
pub mod generator;


pub use driver::{Driver, DriverState};
pub use event::{DriverEvent, EventPhase};
pub use generator::DriverEventGenerator;
