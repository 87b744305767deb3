//! Plain-data views of the simulation for collaborators.

use std::fmt;

use md_action::ActionSummary;
use md_core::{Level, Tick};
use md_road::Forecast;
use md_rules::{State, Value};
use md_safety::SafetyEvent;

/// Why a run ended.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminalReason {
    /// An emergency stop resolved.
    EmergencyStop,
    /// The car reached the end of the road.
    EndOfRoad,
    /// Replayed route samples ran out.
    EndOfRoute,
}

impl TerminalReason {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminalReason::EmergencyStop => "emergency stop",
            TerminalReason::EndOfRoad     => "end of road",
            TerminalReason::EndOfRoute    => "end of route data",
        }
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── DriverSnapshot ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverSnapshot {
    pub fatigue:               u8,
    pub distraction:           u8,
    pub ndrt:                  u8,
    pub request:               Option<Level>,
    pub uncorrectable_fatigue: bool,
    pub ttdu:                  f64,
    pub ttdf:                  f64,
    /// Time of the last declined suggestion per level, indexed by
    /// [`Level::index`].
    pub last_declines:         [Option<f64>; 4],
}

// ── SimSnapshot ───────────────────────────────────────────────────────────────

/// Everything observable about a run after a completed tick.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimSnapshot {
    pub seed:                u64,
    pub tick:                Tick,
    /// Simulated seconds since reset.
    pub time:                f64,
    pub position:            f64,
    pub speed:               f64,
    pub level:               Level,
    pub road_max_level:      Level,
    pub total_distance:      f64,
    /// Nominal forecast at the car's position.
    pub forecast:            Forecast,
    pub driver:              DriverSnapshot,
    pub pending_action:      Option<ActionSummary>,
    /// The action created by the last step.
    pub last_action:         Option<ActionSummary>,
    /// The action resolved by the last step.
    pub resolved_action:     Option<ActionSummary>,
    /// The level changed during the last step.
    pub switched:            bool,
    pub time_of_last_switch: Option<f64>,
    pub active_safety:       Vec<SafetyEvent>,
    pub done:                Option<TerminalReason>,
}

impl SimSnapshot {
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done.is_some()
    }

    /// Flat key/value view of the snapshot, usable as decision-tree input or
    /// by an external observation encoder.
    pub fn to_state(&self) -> State {
        let mut state = State::default();
        let mut put = |key: &str, value: Value| {
            state.insert(key.to_owned(), value);
        };
        put("tick", Value::Num(self.tick.0 as f64));
        put("time_passed", self.time.into());
        put("position", self.position.into());
        put("speed", self.speed.into());
        put("current_level", self.level.into());
        put("road_max_level", self.road_max_level.into());
        put("road_length", self.total_distance.into());
        for (i, level) in Level::FORECAST.iter().enumerate() {
            let suffix = level.as_str().to_lowercase();
            put(&format!("ttaf_{suffix}"), self.forecast.ttaf[i].into());
            put(&format!("ttau_{suffix}"), self.forecast.ttau[i].into());
        }
        put("fatigue", self.driver.fatigue.into());
        put("distraction", self.driver.distraction.into());
        put("ndrt", self.driver.ndrt.into());
        put("driver_request", self.driver.request.into());
        put("uncorrectable_fatigue", self.driver.uncorrectable_fatigue.into());
        put("ttdu", self.driver.ttdu.into());
        put("ttdf", self.driver.ttdf.into());
        put("pending_action", self.pending_action.as_ref().map(|a| a.name.clone()).into());
        put("time_of_last_switch", self.time_of_last_switch.into());
        put("switched", self.switched.into());
        put("done", self.done.is_some().into());
        state
    }
}

// ── StepOutcome ───────────────────────────────────────────────────────────────

/// Result of one [`Sim::step`][crate::Sim::step].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepOutcome {
    pub snapshot: SimSnapshot,
    pub done:     bool,
    pub reason:   Option<TerminalReason>,
}
