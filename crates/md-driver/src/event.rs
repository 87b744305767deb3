//! Driver events.
//!
//! Each event is a small state machine stepped once per tick while pending.
//! Events mutate the driver's [`DriverState`] directly and raise its update
//! flags so the TTDU/TTDF model re-reads its tables.

use md_core::{DriverEventKind, DriverParams, Level, SimRng};

use crate::DriverState;

/// Kind-specific progress of a driver event.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventPhase {
    Fatigue,
    /// `increased` is set once the distraction level has been raised.
    Distraction { increased: bool },
    /// `started` is set once the NDRT level has been drawn.
    Ndrt { started: bool },
    /// `assigned` is set once the request is visible on the driver.
    DriverRequest { level: Level, assigned: bool },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverEvent {
    pub phase:   EventPhase,
    /// Car position when the event started.
    pub start:   f64,
    /// Car position at the event's last step.
    pub end:     f64,
    pub pending: bool,
}

impl DriverEvent {
    fn new(phase: EventPhase, start: f64) -> Self {
        DriverEvent { phase, start, end: start, pending: true }
    }

    pub fn fatigue(start: f64) -> Self {
        DriverEvent::new(EventPhase::Fatigue, start)
    }

    pub fn distraction(start: f64) -> Self {
        DriverEvent::new(EventPhase::Distraction { increased: false }, start)
    }

    pub fn ndrt(start: f64) -> Self {
        DriverEvent::new(EventPhase::Ndrt { started: false }, start)
    }

    pub fn request(start: f64, level: Level) -> Self {
        DriverEvent::new(EventPhase::DriverRequest { level, assigned: false }, start)
    }

    pub fn kind(&self) -> DriverEventKind {
        match self.phase {
            EventPhase::Fatigue              => DriverEventKind::Fatigue,
            EventPhase::Distraction { .. }   => DriverEventKind::Distraction,
            EventPhase::Ndrt { .. }          => DriverEventKind::Ndrt,
            EventPhase::DriverRequest { .. } => DriverEventKind::DriverRequest,
        }
    }

    /// Whether the event can start while the car drives at `level`.
    pub fn is_possible(&self, level: Level) -> bool {
        match self.phase {
            EventPhase::Fatigue                         => true,
            EventPhase::Distraction { .. }              => level < Level::L3,
            EventPhase::Ndrt { .. }                     => level >= Level::L3,
            EventPhase::DriverRequest { level: req, .. } => req != level,
        }
    }

    /// Stop the event at `position`.
    #[inline]
    pub fn finish(&mut self, position: f64) {
        self.pending = false;
        self.end = position;
    }

    pub(crate) fn step(&mut self, state: &mut DriverState, params: &DriverParams, position: f64, rng: &mut SimRng) {
        if !self.pending {
            return;
        }
        self.end = position;

        match &mut self.phase {
            EventPhase::Fatigue => {
                // Never ends on the tick it started.
                if self.start == self.end {
                    return;
                }
                state.fatigue = (state.fatigue + 1).min(4);
                state.update_fatigue = true;
                self.pending = false;
            }
            EventPhase::Distraction { increased } => {
                if !*increased && state.distraction < 3 {
                    state.distraction += 1;
                    state.update_distraction = true;
                    *increased = true;
                } else if state.distraction < 3 {
                    let r = rng.unit();
                    if r < params.distraction_increase_prob.powi(i32::from(state.distraction)) {
                        state.distraction += 1;
                        state.update_distraction = true;
                    } else if r > 1.0 - params.distraction_ends_midway_prob {
                        state.distraction = 0;
                        state.update_distraction = true;
                        self.pending = false;
                    }
                } else if rng.unit() < params.distractions_ends_prob {
                    state.distraction = 0;
                    state.update_distraction = true;
                    self.pending = false;
                }
            }
            EventPhase::Ndrt { started } => {
                if !*started {
                    state.ndrt = rng.gen_range(1..4);
                    *started = true;
                } else if rng.unit() < params.ndrt_ends_prob {
                    state.ndrt = 0;
                    self.pending = false;
                }
            }
            EventPhase::DriverRequest { level, assigned } => {
                if !*assigned {
                    state.request = Some(*level);
                    *assigned = true;
                } else if rng.unit() < params.driver_request_cancel_prob {
                    state.request = None;
                    self.pending = false;
                }
            }
        }
    }
}
