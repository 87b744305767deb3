//! `md-core` — foundational types for the mediator simulator.
//!
//! This crate is a dependency of every other `md-*` crate.  It has no `md-*`
//! dependencies and minimal external ones (`rand`, `rand_distr` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module            | Contents                                                 |
//! |-------------------|----------------------------------------------------------|
//! | [`level`]         | `Level` (L0 < L2 < L3 < L4), `Variant`                   |
//! | [`time`]          | `Tick`, `SimClock`                                       |
//! | [`rng`]           | `SimRng`, `Stream` (per-entity seeded sub-streams)       |
//! | [`calibration`]   | per-timestep probabilities, Gaussian windows, `ndtri`    |
//! | [`config`]        | `SimConfig` and its sections, `NEVER` sentinel           |
//! | [`error`]         | `ConfigError`, `ConfigResult`                            |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod calibration;
pub mod config;
pub mod error;
pub mod level;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use calibration::{gaussian_window, ndtri, probability_per_timestep, GaussianWindow};
pub use config::{
    ActionParams, CarParams, DriverEventConfig, DriverEventKind, DriverParams, EventTypeConfig,
    Preferences, RoadParams, RoadTypeConfig, SimConfig, TtdTables, NEVER,
};
pub use error::{ConfigError, ConfigResult};
pub use level::{Level, Variant};
pub use rng::{SimRng, Stream};
pub use time::{SimClock, Tick};

/// Round `x` to `places` decimal places (half away from zero).
#[inline]
pub fn round_to(x: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (x * factor).round() / factor
}
