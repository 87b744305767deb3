//! Recorded safety events.

use crate::{SafetyKind, Severity};

/// One occurrence of a safety predicate, from the position where it first
/// held to the position where it was last seen.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SafetyEvent {
    pub kind:     SafetyKind,
    pub severity: Severity,
    /// Position (km) where the event opened.
    pub start:    f64,
    /// Position (km) at the last step.
    pub end:      f64,
    /// Seconds the event stayed open while the car was moving.
    pub duration: f64,
    pub pending:  bool,
}

impl SafetyEvent {
    pub fn open(kind: SafetyKind, position: f64) -> Self {
        SafetyEvent {
            kind,
            severity: kind.severity(),
            start:    position,
            end:      position,
            duration: 0.0,
            pending:  true,
        }
    }

    /// Advance an open event to `position`.  `still_active` is the kind's
    /// continuation verdict for this tick.
    pub fn step(&mut self, position: f64, timestep: f64, still_active: bool) {
        self.end = position;
        self.pending = still_active;
        if self.start != self.end {
            self.duration += timestep;
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}
