//! The action lifecycle.
//!
//! # Lifecycle
//!
//! An action is created at the car's position (`earliest_start`) and may be
//! given a deadline (`latest_start`).  With randomized starts enabled the
//! actual `start` is drawn uniformly inside that window of opportunity.
//! Each tick the orchestrator calls [`Action::step`]; once the car has
//! reached `start` the action counts steps and advances its kind-specific
//! timing model until an outcome is fixed.  A finished action is applied
//! exactly once with [`Action::resolve`].
//!
//! A step taken exactly at `start` is not counted, so an action never ends
//! in the tick it began.
//!
//! # Timing models
//!
//! | Kind | Model                                                                 |
//! |------|-----------------------------------------------------------------------|
//! | SSL  | per-tick response trial over the response window, then acceptance     |
//! | ESL  | deterministic countdown, enforced when less than one tick remains      |
//! | CF   | per-tick Bernoulli trial calibrated over `max_correct_fatigue_time`   |
//! | CD   | Gaussian success time inside `[timestep, max_cd_time]`, skewed early  |
//! | PD   | Gaussian success time inside `[timestep, ttdf(ndrt)]`, skewed late    |
//! | CR   | succeeds on the first counted step                                    |
//! | ES   | succeeds on the first counted step                                    |

use tracing::debug;

use md_core::{gaussian_window, probability_per_timestep, Level, SimConfig, SimRng};
use md_driver::Driver;

use crate::{ActionArgs, ActionError, ActionId, ActionResult};

/// Offset added to `end` when an action is finished instantly, so that it
/// still spans a visible distance.
const INSTANT_SPAN: f64 = 0.05;

/// Skew of the correct-distraction success time (success tends to come early).
const CD_SKEW: f64 = -0.5;
/// Skew of the prepare-driver success time (success tends to come late).
const PD_SKEW: f64 = 1.0;

// ── Progress ──────────────────────────────────────────────────────────────────

/// Kind-specific timing state.
#[derive(Clone, Debug)]
enum Progress {
    SuggestShift {
        remaining:  f64,
        response_p: f64,
        acceptance: f64,
    },
    EnforceShift {
        remaining: f64,
    },
    CorrectFatigue {
        tick_p:    f64,
        success_p: f64,
        max_time:  f64,
    },
    CorrectDistraction {
        success_step: Option<u64>,
        success_p:    f64,
        max_time:     f64,
    },
    PrepareDriver {
        success_step: Option<u64>,
        success_p:    f64,
        ttdf:         f64,
    },
    ClearRequest,
    EmergencyStop,
}

/// Step at which a Gaussian success time falls, if it lies inside
/// `[timestep, max_time]`.
fn gaussian_success_step(
    timestep: f64,
    max_time: f64,
    success_p: f64,
    skew: f64,
    rng: &mut SimRng,
) -> Option<u64> {
    let window = gaussian_window(timestep, max_time, success_p, skew);
    let t = rng.normal(window.mean, window.std_dev);
    (timestep <= t && t <= max_time).then(|| (t / timestep).round() as u64)
}

// ── Resolution ────────────────────────────────────────────────────────────────

/// The effect of resolving an action, for the orchestrator to apply to state
/// outside the driver.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Resolution {
    /// The car switches to the level.
    LevelShifted(Level),
    /// A suggestion was declined or not answered in time.
    SuggestionDeclined(Level),
    FatigueCorrected,
    FatigueNotCorrected,
    DistractionCorrected,
    NdrtCorrected,
    RequestCleared,
    /// The run terminates.
    EmergencyStopped,
    /// The action failed without side effects.
    Unchanged,
}

// ── Action ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Action {
    id:             ActionId,
    progress:       Progress,
    start:          f64,
    earliest_start: f64,
    latest_start:   f64,
    end:            f64,
    time_passed:    f64,
    steps_taken:    u64,
    outcome:        Option<bool>,
    resolved:       bool,
    timestep:       f64,
    instant:        bool,
}

impl Action {
    /// Create `id` at `position`.
    ///
    /// `args` only applies to shift actions: `time` overrides the response
    /// window (SSL) or countdown (ESL), `last` sets the latest start.
    pub fn new(
        id: ActionId,
        args: ActionArgs,
        position: f64,
        cfg: &SimConfig,
        driver: &Driver,
        rng: &mut SimRng,
    ) -> Self {
        let dt = cfg.timestep;
        let p = &cfg.actions;
        let time = args.time.filter(|t| *t > 0.0);

        let progress = match id {
            ActionId::SuggestShift(level) => {
                let remaining = time.unwrap_or(cfg.preferences.comfortable_shift_time);
                let requested = driver.request() == Some(level);
                let (response, acceptance) = if requested {
                    (p.ss_resp_prob_dr, p.ss_acc_prob_dr)
                } else {
                    (
                        p.suggested_shift_response_probability,
                        p.suggested_shift_acceptance_probability[level.index()],
                    )
                };
                Progress::SuggestShift {
                    remaining,
                    response_p: probability_per_timestep(remaining / dt, response),
                    acceptance,
                }
            }
            ActionId::EnforceShift(_) => Progress::EnforceShift {
                remaining: time.unwrap_or(p.min_esl_time),
            },
            ActionId::CorrectFatigue => Progress::CorrectFatigue {
                tick_p:    probability_per_timestep(p.max_correct_fatigue_time / dt, p.cf_success_probability),
                success_p: p.cf_success_probability,
                max_time:  p.max_correct_fatigue_time,
            },
            ActionId::CorrectDistraction => Progress::CorrectDistraction {
                success_step: gaussian_success_step(dt, p.max_cd_time, p.cd_success_probability, CD_SKEW, rng),
                success_p:    p.cd_success_probability,
                max_time:     p.max_cd_time,
            },
            ActionId::PrepareDriver => {
                let ttdf = cfg.ttd.ttdf_ndrt(driver.ndrt());
                let success_step = if ttdf > 0.0 {
                    gaussian_success_step(dt, ttdf, p.pd_success_probability, PD_SKEW, rng)
                } else {
                    None
                };
                Progress::PrepareDriver { success_step, success_p: p.pd_success_probability, ttdf }
            }
            ActionId::ClearRequest  => Progress::ClearRequest,
            ActionId::EmergencyStop => Progress::EmergencyStop,
        };

        let latest_start = if id.is_shift() { args.last.unwrap_or(position) } else { position };
        let start = if latest_start > position && cfg.random_start_in_woo {
            rng.uniform(position, latest_start)
        } else {
            position
        };

        Action {
            id,
            progress,
            start,
            earliest_start: position,
            latest_start,
            end:            start,
            time_passed:    0.0,
            steps_taken:    0,
            outcome:        None,
            resolved:       false,
            timestep:       dt,
            instant:        cfg.instant_actions,
        }
    }

    /// Advance one tick with the car at `position`.
    ///
    /// Returns `true` when the tick counted as a step of the action.
    pub fn step(&mut self, position: f64, driver: &Driver, rng: &mut SimRng) -> bool {
        if !self.is_pending() || position < self.start {
            return false;
        }
        self.end = position;
        if self.instant {
            self.end_action(rng);
            self.end += INSTANT_SPAN;
            return false;
        }
        if self.end == self.start {
            return false;
        }
        self.time_passed += self.timestep;
        self.steps_taken += 1;
        self.advance(driver, rng);
        true
    }

    fn advance(&mut self, driver: &Driver, rng: &mut SimRng) {
        let dt = self.timestep;
        let steps = self.steps_taken;
        let time_passed = self.time_passed;

        self.outcome = match &mut self.progress {
            Progress::SuggestShift { remaining, response_p, acceptance, .. } => {
                let outcome = if rng.unit() < *response_p {
                    Some(rng.unit() < *acceptance)
                } else if *remaining < dt {
                    // No response inside the window counts as a decline.
                    Some(false)
                } else {
                    None
                };
                *remaining -= dt;
                outcome
            }
            Progress::EnforceShift { remaining, .. } => {
                let outcome = (*remaining < dt).then_some(true);
                *remaining -= dt;
                outcome
            }
            Progress::CorrectFatigue { tick_p, max_time, .. } => {
                if driver.uncorrectable_fatigue() || driver.fatigue() == 0 {
                    Some(false)
                } else if rng.unit() < *tick_p {
                    Some(true)
                } else if time_passed >= *max_time {
                    Some(false)
                } else {
                    None
                }
            }
            Progress::CorrectDistraction { success_step, max_time, .. } => {
                if driver.distraction() == 0 {
                    Some(false)
                } else if *success_step == Some(steps) {
                    Some(true)
                } else if time_passed >= *max_time {
                    Some(false)
                } else {
                    None
                }
            }
            Progress::PrepareDriver { success_step, ttdf, .. } => {
                if driver.ndrt() == 0 {
                    Some(false)
                } else if *success_step == Some(steps) {
                    Some(true)
                } else if time_passed >= *ttdf {
                    Some(false)
                } else {
                    None
                }
            }
            Progress::ClearRequest | Progress::EmergencyStop => Some(true),
        };
    }

    /// Fix the outcome immediately, bypassing the timing model.
    pub fn end_action(&mut self, rng: &mut SimRng) {
        self.outcome = Some(match &self.progress {
            Progress::SuggestShift { acceptance, .. } => rng.unit() < *acceptance,
            Progress::CorrectFatigue { success_p, .. }
            | Progress::CorrectDistraction { success_p, .. }
            | Progress::PrepareDriver { success_p, .. } => rng.unit() < *success_p,
            Progress::EnforceShift { .. } | Progress::ClearRequest | Progress::EmergencyStop => true,
        });
    }

    /// Move the deadline to `latest` (or to `position` when `None`).
    ///
    /// Has no effect once the action has started.  If the current start lies
    /// past the new deadline it is redrawn between `position` and the
    /// deadline.
    pub fn update_latest_start(&mut self, position: f64, latest: Option<f64>, rng: &mut SimRng) {
        if self.start <= position {
            return;
        }
        self.latest_start = latest.unwrap_or(position);
        if self.start > self.latest_start {
            self.start = rng.uniform(position, self.latest_start);
            self.end = self.start;
        }
    }

    /// Apply a re-issued command for the same action: `time` replaces the
    /// remaining budget of a shift and `last` moves the deadline.
    pub fn update_args(&mut self, position: f64, args: ActionArgs, rng: &mut SimRng) {
        if let Some(time) = args.time {
            if let Progress::SuggestShift { remaining, .. } | Progress::EnforceShift { remaining, .. } =
                &mut self.progress
            {
                *remaining = time;
            }
        }
        if args.last.is_some() {
            self.update_latest_start(position, args.last, rng);
        }
    }

    /// Apply the outcome to the driver and report the remaining effect.
    ///
    /// `now` is the simulated time in seconds, recorded for declined
    /// suggestions.
    pub fn resolve(&mut self, driver: &mut Driver, now: f64) -> ActionResult<Resolution> {
        if self.resolved {
            return Err(ActionError::AlreadyResolved(self.name()));
        }
        let Some(success) = self.outcome else {
            return Err(ActionError::NotFinished(self.name()));
        };
        self.resolved = true;

        let resolution = match (self.id, success) {
            (ActionId::SuggestShift(level), true) | (ActionId::EnforceShift(level), true) => {
                Resolution::LevelShifted(level)
            }
            (ActionId::SuggestShift(level), false) => {
                driver.record_decline(level, now);
                Resolution::SuggestionDeclined(level)
            }
            (ActionId::CorrectFatigue, true) => {
                driver.fatigue_corrected();
                Resolution::FatigueCorrected
            }
            (ActionId::CorrectFatigue, false) => {
                driver.fatigue_uncorrectable();
                Resolution::FatigueNotCorrected
            }
            (ActionId::CorrectDistraction, true) => {
                driver.distraction_corrected(self.end);
                Resolution::DistractionCorrected
            }
            (ActionId::PrepareDriver, true) => {
                driver.ndrt_corrected(self.end);
                Resolution::NdrtCorrected
            }
            (ActionId::ClearRequest, true) => {
                driver.request_cleared(self.end);
                Resolution::RequestCleared
            }
            (ActionId::EmergencyStop, _) => Resolution::EmergencyStopped,
            _ => Resolution::Unchanged,
        };
        debug!(action = %self.id, success, start = self.start, end = self.end, "action resolved");
        Ok(resolution)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn name(&self) -> String {
        self.id.to_string()
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.outcome.is_none()
    }

    /// `true` once finished with a successful outcome.  An emergency stop is
    /// always successful.
    #[inline]
    pub fn is_successful(&self) -> bool {
        self.outcome == Some(true)
    }

    #[inline]
    pub fn outcome(&self) -> Option<bool> {
        self.outcome
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    #[inline]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[inline]
    pub fn earliest_start(&self) -> f64 {
        self.earliest_start
    }

    #[inline]
    pub fn latest_start(&self) -> f64 {
        self.latest_start
    }

    #[inline]
    pub fn end(&self) -> f64 {
        self.end
    }

    #[inline]
    pub fn time_passed(&self) -> f64 {
        self.time_passed
    }

    #[inline]
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Remaining response window (SSL) or countdown (ESL) in seconds.
    pub fn remaining_time(&self) -> Option<f64> {
        match &self.progress {
            Progress::SuggestShift { remaining, .. } | Progress::EnforceShift { remaining, .. } => {
                Some(*remaining)
            }
            _ => None,
        }
    }

    pub fn summary(&self) -> ActionSummary {
        ActionSummary {
            name:           self.name(),
            id:             self.id,
            start:          self.start,
            earliest_start: self.earliest_start,
            latest_start:   self.latest_start,
            end:            self.end,
            time_passed:    self.time_passed,
            steps_taken:    self.steps_taken,
            outcome:        self.outcome,
        }
    }
}

// ── ActionSummary ─────────────────────────────────────────────────────────────

/// Plain-data view of an action for snapshots and reports.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionSummary {
    pub name:           String,
    pub id:             ActionId,
    pub start:          f64,
    pub earliest_start: f64,
    pub latest_start:   f64,
    pub end:            f64,
    pub time_passed:    f64,
    pub steps_taken:    u64,
    pub outcome:        Option<bool>,
}
