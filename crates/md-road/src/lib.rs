//! `md-road` — the road timeline of a mediator run.
//!
//! | Module              | Contents                                                |
//! |---------------------|---------------------------------------------------------|
//! | [`segment`]         | `RoadSegment`                                           |
//! | [`generator`]       | random and preset segment sequences                     |
//! | [`event`]           | `RoadEvent`, `EventKind`                                |
//! | [`event_generator`] | static events, `RoadEventGenerator` for dynamic events  |
//! | [`forecast`]        | `LevelForecaster` (TTAF/TTAU, travel-time integration)  |
//! | [`road`]            | `Road`, the per-run timeline stepped every tick         |
//! | [`preset`]          | `PresetRoad` and its CSV loaders                        |
//!
//! Positions are kilometres from the start of the road, speeds km/h and
//! times seconds.

pub mod error;
pub mod event;
pub mod event_generator;
pub mod forecast;
pub mod generator;
pub mod preset;
pub mod road;
pub mod segment;

#[cfg(test)]
mod tests;

pub use error::{RoadError, RoadResult};
pub use event::{EventKind, RoadEvent};
pub use event_generator::{generate_static_events, RoadEventGenerator};
pub use forecast::{Forecast, LevelForecaster, LevelInterval, SpeedInterval};
pub use generator::{generate_segments, segments_from_preset};
pub use preset::{
    load_driver_events_csv, load_driver_events_reader, load_events_csv, load_events_reader, load_route_csv,
    load_route_reader, load_segments_csv, load_segments_reader, PresetDriverEvent, PresetEvent, PresetRoad,
    PresetSegment, RouteSample,
};
pub use road::Road;
pub use segment::RoadSegment;
