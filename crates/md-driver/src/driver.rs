//! The driver model.
//!
//! # TTDU / TTDF
//!
//! Time-to-driver-unfit is tracked separately for fatigue, distraction and
//! NDRT; the driver's TTDU is the minimum of the three.  When an event or an
//! action changes a state level, the corresponding table entry (scaled by the
//! current automation level) is re-read.  Otherwise fatigue and distraction
//! TTDU decay by one timestep per tick, never below zero, and decaying
//! fatigue TTDU raises the fatigue level once it crosses the next table
//! threshold.  NDRT TTDU is always the table value.
//!
//! Time-to-driver-fit is the maximum of the three TTDF table entries.

use tracing::debug;

use md_core::{DriverEventKind, DriverParams, Level, SimConfig, SimRng, TtdTables};
use md_road::PresetDriverEvent;

use crate::event::EventPhase;
use crate::{DriverEvent, DriverEventGenerator};

// ── DriverState ───────────────────────────────────────────────────────────────

/// Levels and flags mutated by driver events.
///
/// Invariant: at most one of `distraction` and `ndrt` is non-zero.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverState {
    /// 0..=4.
    pub fatigue:               u8,
    /// 0..=3.
    pub distraction:           u8,
    pub previous_distraction:  u8,
    /// 0..=4.
    pub ndrt:                  u8,
    pub request:               Option<Level>,
    /// Set when a fatigue correction failed: the fatigue is physiological.
    pub uncorrectable_fatigue: bool,
    pub update_fatigue:        bool,
    pub update_distraction:    bool,
}

// ── Driver ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Driver {
    state:            DriverState,
    ttdu_fatigue:     f64,
    ttdu_distraction: f64,
    ttdu_ndrt:        f64,
    ttdu:             f64,
    ttdf:             f64,
    /// Time of the last declined suggestion, per target level.
    last_decline:     [Option<f64>; 4],
    pending:          Vec<DriverEvent>,
    finished:         Vec<DriverEvent>,
    generator:        DriverEventGenerator,
    params:           DriverParams,
    ttd:              TtdTables,
    timestep:         f64,
    rng:              SimRng,
}

impl Driver {
    pub fn new(
        cfg: &SimConfig,
        level: Level,
        estimated_total_time: f64,
        preset: Option<&[PresetDriverEvent]>,
        rng: SimRng,
    ) -> Self {
        let state = DriverState {
            fatigue:               cfg.driver.initial_fatigue,
            distraction:           cfg.driver.initial_distraction,
            previous_distraction:  cfg.driver.initial_distraction,
            ndrt:                  0,
            request:               None,
            uncorrectable_fatigue: false,
            update_fatigue:        true,
            update_distraction:    true,
        };
        let ttd = cfg.ttd.clone();
        let mut driver = Driver {
            ttdu_fatigue:     ttd.ttdu_fatigue(level, state.fatigue),
            ttdu_distraction: ttd.ttdu_distraction(level, state.distraction),
            ttdu_ndrt:        ttd.ttdu_ndrt(level, 0),
            ttdu:             0.0,
            ttdf:             0.0,
            state,
            last_decline:     [None; 4],
            pending:          Vec::new(),
            finished:         Vec::new(),
            generator:        DriverEventGenerator::new(
                &cfg.driver.events,
                cfg.timestep,
                estimated_total_time,
                cfg.maximum_automation_level,
                preset,
            ),
            params:           cfg.driver.clone(),
            ttd,
            timestep:         cfg.timestep,
            rng,
        };
        driver.update_ttdu(level);
        driver.update_ttdf();
        driver
    }

    /// Advance one tick with the car at `position` driving at `level`.
    ///
    /// Returns the kind of the event generated this tick, if any.
    pub fn step(&mut self, level: Level, position: f64) -> Option<DriverEventKind> {
        self.convert_distraction_to_ndrt(level, position);
        self.convert_ndrt_to_distraction(level, position);

        let generated = self
            .generator
            .next_event(position, level, &self.pending, &mut self.rng);
        let generated_kind = generated.as_ref().map(DriverEvent::kind);
        if let Some(event) = generated {
            debug!(kind = %event.kind(), position, "driver event started");
            self.pending.push(event);
        }

        for event in &mut self.pending {
            event.step(&mut self.state, &self.params, position, &mut self.rng);
        }
        let (pending, done): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|e| e.pending);
        self.pending = pending;
        self.finished.extend(done);

        self.update_ttdu(level);
        self.update_ttdf();
        self.state.previous_distraction = self.state.distraction;
        generated_kind
    }

    /// In an automated level a pending distraction becomes an NDRT of the
    /// same level.
    fn convert_distraction_to_ndrt(&mut self, level: Level, position: f64) {
        if level <= Level::L2 {
            return;
        }
        let Some(event) = self
            .pending
            .iter_mut()
            .find(|e| e.pending && e.kind() == DriverEventKind::Distraction)
        else {
            return;
        };
        event.finish(position);
        let mut ndrt = DriverEvent::ndrt(position);
        ndrt.phase = EventPhase::Ndrt { started: true };
        self.state.ndrt = self.state.distraction;
        self.state.distraction = 0;
        self.state.update_distraction = true;
        self.pending.push(ndrt);
    }

    /// Below L3 a pending NDRT becomes a distraction of the same level.
    fn convert_ndrt_to_distraction(&mut self, level: Level, position: f64) {
        if level >= Level::L3 {
            return;
        }
        let Some(event) = self
            .pending
            .iter_mut()
            .find(|e| e.pending && e.kind() == DriverEventKind::Ndrt)
        else {
            return;
        };
        event.finish(position);
        let mut distraction = DriverEvent::distraction(position);
        distraction.phase = EventPhase::Distraction { increased: true };
        self.state.distraction = self.state.ndrt.min(3);
        self.state.ndrt = 0;
        self.state.update_distraction = true;
        self.pending.push(distraction);
    }

    fn update_ttdu(&mut self, level: Level) {
        let state = &mut self.state;

        if state.update_fatigue {
            self.ttdu_fatigue = self.ttd.ttdu_fatigue(level, state.fatigue);
        } else {
            self.ttdu_fatigue = (self.ttdu_fatigue - self.timestep).max(0.0);
            let row = &self.ttd.ttdu_fatigue[level.index()];
            if self.ttdu_fatigue <= row[4] {
                state.fatigue = 4;
            } else if state.fatigue < 4 && self.ttdu_fatigue <= row[usize::from(state.fatigue) + 1] {
                state.fatigue += 1;
            }
        }

        let decayed = (self.ttdu_distraction - self.timestep).max(0.0);
        self.ttdu_distraction = if !state.update_distraction {
            decayed
        } else if state.distraction < state.previous_distraction {
            self.ttd.ttdu_distraction(level, state.distraction)
        } else {
            // Raised: a long-running distraction may already be below the
            // table value.
            self.ttd.ttdu_distraction(level, state.distraction).min(decayed)
        };

        self.ttdu_ndrt = self.ttd.ttdu_ndrt(level, state.ndrt);
        self.ttdu = self.ttdu_fatigue.min(self.ttdu_distraction).min(self.ttdu_ndrt);
        state.update_fatigue = false;
        state.update_distraction = false;
    }

    fn update_ttdf(&mut self) {
        self.ttdf = self
            .ttd
            .ttdf_distraction(self.state.distraction)
            .max(self.ttd.ttdf_fatigue(self.state.fatigue))
            .max(self.ttd.ttdf_ndrt(self.state.ndrt));
    }

    // ── Action outcomes ───────────────────────────────────────────────────

    /// A fatigue correction succeeded: one level less and correctable again.
    pub fn fatigue_corrected(&mut self) {
        self.state.uncorrectable_fatigue = false;
        self.state.fatigue = self.state.fatigue.saturating_sub(1);
        self.state.update_fatigue = true;
    }

    /// A fatigue correction failed while the driver was fatigued.
    pub fn fatigue_uncorrectable(&mut self) {
        if self.state.fatigue > 0 {
            self.state.uncorrectable_fatigue = true;
        }
    }

    pub fn distraction_corrected(&mut self, position: f64) {
        self.state.distraction = 0;
        self.state.update_distraction = true;
        self.end_events(DriverEventKind::Distraction, position);
    }

    pub fn ndrt_corrected(&mut self, position: f64) {
        self.state.ndrt = 0;
        self.end_events(DriverEventKind::Ndrt, position);
    }

    pub fn request_cleared(&mut self, position: f64) {
        self.state.request = None;
        self.end_events(DriverEventKind::DriverRequest, position);
    }

    /// Record that a suggestion to `level` was declined at `time` seconds.
    pub fn record_decline(&mut self, level: Level, time: f64) {
        self.last_decline[level.index()] = Some(time);
    }

    /// End every pending event of `kind` at `position`.
    pub fn end_events(&mut self, kind: DriverEventKind, position: f64) {
        for event in self.pending.iter_mut().filter(|e| e.pending && e.kind() == kind) {
            event.finish(position);
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    /// Direct access for scenario setup.  Set the `update_*` flags to have
    /// TTDU re-read from the tables on the next step.
    pub fn state_mut(&mut self) -> &mut DriverState {
        &mut self.state
    }

    #[inline]
    pub fn fatigue(&self) -> u8 {
        self.state.fatigue
    }

    #[inline]
    pub fn distraction(&self) -> u8 {
        self.state.distraction
    }

    #[inline]
    pub fn ndrt(&self) -> u8 {
        self.state.ndrt
    }

    #[inline]
    pub fn request(&self) -> Option<Level> {
        self.state.request
    }

    #[inline]
    pub fn uncorrectable_fatigue(&self) -> bool {
        self.state.uncorrectable_fatigue
    }

    #[inline]
    pub fn ttdu(&self) -> f64 {
        self.ttdu
    }

    #[inline]
    pub fn ttdf(&self) -> f64 {
        self.ttdf
    }

    /// TTDU components as `(fatigue, distraction, ndrt)`.
    pub fn ttdu_components(&self) -> (f64, f64, f64) {
        (self.ttdu_fatigue, self.ttdu_distraction, self.ttdu_ndrt)
    }

    #[inline]
    pub fn last_decline(&self, level: Level) -> Option<f64> {
        self.last_decline[level.index()]
    }

    pub fn last_declines(&self) -> &[Option<f64>; 4] {
        &self.last_decline
    }

    pub fn pending_events(&self) -> &[DriverEvent] {
        &self.pending
    }

    /// Every event of the run so far: finished ones first, then pending.
    pub fn events(&self) -> impl Iterator<Item = &DriverEvent> {
        self.finished.iter().chain(self.pending.iter())
    }
}
