//! Road events.

use std::fmt;

use md_core::{EventTypeConfig, Level, Variant};

/// Whether an event exists from the start of a run or appears during it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    Static,
    Dynamic,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::Static  => "static",
            EventKind::Dynamic => "dynamic",
        })
    }
}

/// A road condition that restricts the maximum level and speed over
/// `[start, end]`.
///
/// Invariant: `pessimistic <= max_level <= optimistic`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoadEvent {
    pub name:        String,
    pub kind:        EventKind,
    pub start:       f64,
    pub end:         f64,
    pub max_level:   Level,
    pub optimistic:  Level,
    pub pessimistic: Level,
    /// km/h.
    pub max_speed:   f64,
}

impl RoadEvent {
    pub fn new(name: impl Into<String>, kind: EventKind, start: f64, end: f64, max_level: Level, max_speed: f64) -> Self {
        RoadEvent {
            name: name.into(),
            kind,
            start,
            end,
            max_level,
            optimistic: max_level.increment(),
            pessimistic: max_level.decrement(),
            max_speed,
        }
    }

    /// An event of configured type `cfg` over `[start, end]`.
    pub fn from_config(cfg: &EventTypeConfig, kind: EventKind, start: f64, end: f64) -> Self {
        RoadEvent::new(cfg.name.clone(), kind, start, end, cfg.default_level, cfg.default_speed)
    }

    /// The maximum level this event allows under `variant`.
    #[inline]
    pub fn level(&self, variant: Variant) -> Level {
        match variant {
            Variant::Nominal     => self.max_level,
            Variant::Optimistic  => self.optimistic,
            Variant::Pessimistic => self.pessimistic,
        }
    }

    #[inline]
    pub fn is_active_at(&self, position: f64) -> bool {
        self.start <= position && position <= self.end
    }
}
