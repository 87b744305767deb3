//! The `Sim` struct and its reset/step contract.

use md_action::{Action, ActionArgs, ActionCommand, ActionId, ActionSummary, Resolution, Vocabulary};
use md_core::{SimClock, SimConfig, SimRng, Stream, Variant};
use md_driver::Driver;
use md_road::{Forecast, PresetRoad, Road, RouteSample};
use md_rules::State;
use md_safety::{SafetyEvaluator, SafetyInputs, SafetyKind, Thresholds};
use tracing::{debug, info, trace};

use crate::metrics::TickActivity;
use crate::snapshot::DriverSnapshot;
use crate::{Car, Choice, RunMetrics, SimError, SimResult, SimSnapshot, StepOutcome, TerminalReason};

// ── RunState ──────────────────────────────────────────────────────────────────

/// Everything owned by one run, rebuilt by every `reset`.
#[derive(Clone, Debug)]
pub struct RunState {
    seed:       u64,
    clock:      SimClock,
    road:       Road,
    car:        Car,
    driver:     Driver,
    safety:     SafetyEvaluator,
    metrics:    RunMetrics,
    action_rng: SimRng,
    pending:    Option<Action>,
    /// Created by the last step.
    last:       Option<ActionSummary>,
    /// Resolved by the last step.
    resolved:   Option<ActionSummary>,
    /// Every resolved action of the run, in resolution order.
    finished:   Vec<ActionSummary>,
    switched:   bool,
    done:       Option<TerminalReason>,
}

impl RunState {
    fn new(cfg: &SimConfig, preset: Option<&PresetRoad>, kinds: &[SafetyKind], seed: u64) -> SimResult<Self> {
        let road = Road::new(cfg, preset, SimRng::stream(seed, Stream::Road))?;
        let car = Car::new(cfg, SimRng::stream(seed, Stream::Car));
        let driver = Driver::new(
            cfg,
            cfg.initial_level,
            road.estimated_total_time(),
            preset.and_then(|p| p.driver_events.as_deref()),
            SimRng::stream(seed, Stream::Driver),
        );
        let safety = SafetyEvaluator::new(kinds.to_vec(), Thresholds::from_config(cfg));
        let metrics = RunMetrics::new(seed, road.total_distance());

        Ok(RunState {
            seed,
            clock: SimClock::new(cfg.timestep),
            road,
            car,
            driver,
            safety,
            metrics,
            action_rng: SimRng::stream(seed, Stream::Action),
            pending: None,
            last: None,
            resolved: None,
            finished: Vec::new(),
            switched: false,
            done: None,
        })
    }

    /// One tick.  The command has already been checked against the
    /// vocabulary.
    fn step(
        &mut self,
        cfg: &SimConfig,
        route: Option<&[RouteSample]>,
        command: ActionCommand,
        args: ActionArgs,
    ) -> SimResult<()> {
        self.last = None;
        self.resolved = None;
        self.switched = false;
        let mut emergency_stop = false;

        // ── Actions ───────────────────────────────────────────────────────
        if command.cancel {
            if let Some(cancelled) = self.pending.take() {
                debug!(action = %cancelled.id(), position = self.car.position(), "action cancelled");
            }
        }
        if let Some(id) = command.action.filter(|_| self.pending.is_none()) {
            let id = id.clamped(cfg.maximum_automation_level);
            let action = Action::new(id, args, self.car.position(), cfg, &self.driver, &mut self.action_rng);
            debug!(
                action       = %id,
                start        = action.start(),
                latest_start = action.latest_start(),
                "action created"
            );
            self.last = Some(action.summary());
            self.pending = Some(action);
        }

        let mut ended = false;
        if let Some(action) = self.pending.as_mut() {
            action.step(self.car.position(), &self.driver, &mut self.action_rng);
            if !action.is_pending() {
                match action.resolve(&mut self.driver, self.clock.time_passed)? {
                    Resolution::LevelShifted(level) => {
                        self.car.set_level(level);
                        self.switched = true;
                    }
                    Resolution::EmergencyStopped => emergency_stop = true,
                    _ => {}
                }
                let summary = action.summary();
                self.finished.push(summary.clone());
                self.resolved = Some(summary);
                ended = true;
            }
        }
        if self.pending.as_ref().is_some_and(|a| !a.is_pending()) {
            self.pending = None;
        }

        // ── Car, driver, road ─────────────────────────────────────────────
        let now = self.clock.time_passed;
        let index = self.clock.current_tick.index();
        let mut route_done = false;
        match route {
            Some(samples) => {
                let sample = samples.get(index).ok_or_else(|| {
                    SimError::Invariant(format!("no route sample for tick {index}"))
                })?;
                self.car.replay(now, index, sample);
                route_done = index + 1 >= samples.len();
            }
            None => self.car.drive(now, self.road.target_speed()),
        }
        self.driver.step(self.car.level(), self.car.position());
        self.road.step(self.car.position());

        // ── Safety and metrics ────────────────────────────────────────────
        self.safety.step(&SafetyInputs {
            time:           now,
            position:       self.car.position(),
            level:          self.car.level(),
            road_max_level: self.road.current_max_level(),
            ttdu:           self.driver.ttdu(),
            ttdf:           self.driver.ttdf(),
            request:        self.driver.request(),
            last_declines:  *self.driver.last_declines(),
            new_action:     self.last.as_ref().map(|a| a.id),
            resolved:       self.resolved.as_ref(),
            switched:       self.switched,
        });
        self.metrics.record_tick(
            now,
            cfg.timestep,
            self.car.level(),
            &self.safety,
            TickActivity {
                started: self.last.is_some(),
                pending: self.pending.is_some(),
                ended,
            },
        );

        match route {
            Some(samples) if !route_done => self.clock.advance_to(samples[index + 1].timestamp),
            _ => self.clock.advance(),
        }
        trace!(
            tick     = self.clock.current_tick.0,
            position = self.car.position(),
            speed    = self.car.speed(),
            level    = %self.car.level(),
            "tick"
        );

        // ── Termination ───────────────────────────────────────────────────
        self.done = if emergency_stop {
            Some(TerminalReason::EmergencyStop)
        } else if route_done {
            Some(TerminalReason::EndOfRoute)
        } else if self.car.position() >= self.road.total_distance() {
            Some(TerminalReason::EndOfRoad)
        } else {
            None
        };
        if let Some(reason) = self.done {
            self.metrics.finalize(self.clock.time_passed, &self.safety, emergency_stop);
            info!(
                seed     = self.seed,
                %reason,
                time     = self.clock.time_passed,
                position = self.car.position(),
                actions  = self.metrics.action_count,
                "run finished"
            );
        }
        Ok(())
    }

    fn snapshot(&self, forecast: Forecast) -> SimSnapshot {
        let d = &self.driver;
        SimSnapshot {
            seed:                self.seed,
            tick:                self.clock.current_tick,
            time:                self.clock.time_passed,
            position:            self.car.position(),
            speed:               self.car.speed(),
            level:               self.car.level(),
            road_max_level:      self.road.current_max_level(),
            total_distance:      self.road.total_distance(),
            forecast,
            driver:              DriverSnapshot {
                fatigue:               d.fatigue(),
                distraction:           d.distraction(),
                ndrt:                  d.ndrt(),
                request:               d.request(),
                uncorrectable_fatigue: d.uncorrectable_fatigue(),
                ttdu:                  d.ttdu(),
                ttdf:                  d.ttdf(),
                last_declines:         *d.last_declines(),
            },
            pending_action:      self.pending.as_ref().map(Action::summary),
            last_action:         self.last.clone(),
            resolved_action:     self.resolved.clone(),
            switched:            self.switched,
            time_of_last_switch: self.safety.time_of_last_switch(),
            active_safety:       self.safety.active_events().cloned().collect(),
            done:                self.done,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Simulated seconds since reset.
    #[inline]
    pub fn time(&self) -> f64 {
        self.clock.time_passed
    }

    pub fn road(&self) -> &Road {
        &self.road
    }

    pub fn car(&self) -> &Car {
        &self.car
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn safety(&self) -> &SafetyEvaluator {
        &self.safety
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    pub fn pending_action(&self) -> Option<&Action> {
        self.pending.as_ref()
    }

    pub fn last_action(&self) -> Option<&ActionSummary> {
        self.last.as_ref()
    }

    pub fn resolved_action(&self) -> Option<&ActionSummary> {
        self.resolved.as_ref()
    }

    pub fn finished_actions(&self) -> &[ActionSummary] {
        &self.finished
    }

    pub fn switched(&self) -> bool {
        self.switched
    }

    pub fn time_of_last_switch(&self) -> Option<f64> {
        self.safety.time_of_last_switch()
    }

    pub fn done(&self) -> Option<TerminalReason> {
        self.done
    }
}

// ── Sim ───────────────────────────────────────────────────────────────────────

/// The tick orchestrator.
///
/// A `Sim` is built once per scenario by [`SimBuilder`][crate::SimBuilder]
/// and runs any number of seeded episodes:
///
/// ```text
///   Uninitialized ──reset──▶ Running ──step──▶ Running
///                               ▲                 │ emergency stop,
///                               │                 │ end of road/route
///                               └─────reset───── Done
/// ```
///
/// Each `step`:
///
/// 1. applies the command: an explicit cancel drops the pending action, a
///    new action is created only when none is pending;
/// 2. steps the pending action and resolves it once it has an outcome;
/// 3. moves the car (speed model or route replay);
/// 4. steps the driver;
/// 5. steps the road;
/// 6. steps the safety evaluator and the run metrics;
/// 7. advances the clock and checks for termination.
///
/// Stepping before the first reset or after termination is an error.
#[derive(Debug)]
pub struct Sim {
    config:     SimConfig,
    preset:     Option<PresetRoad>,
    vocabulary: Vocabulary,
    kinds:      Vec<SafetyKind>,
    run:        Option<RunState>,
    last_seed:  Option<u64>,
}

impl Sim {
    pub(crate) fn from_parts(
        config:     SimConfig,
        preset:     Option<PresetRoad>,
        vocabulary: Vocabulary,
        kinds:      Vec<SafetyKind>,
    ) -> Self {
        Sim { config, preset, vocabulary, kinds, run: None, last_seed: None }
    }

    // ── Reset / step ──────────────────────────────────────────────────────

    /// Start a new run from `seed`.  Every stochastic entity draws from its
    /// own stream derived from the seed.
    pub fn reset(&mut self, seed: u64) -> SimResult<SimSnapshot> {
        let run = RunState::new(&self.config, self.preset.as_ref(), &self.kinds, seed)?;
        info!(
            seed,
            road_length   = run.road.total_distance(),
            segments      = run.road.segments().len(),
            static_events = run.road.events().len(),
            "run reset"
        );
        self.run = Some(run);
        self.last_seed = Some(seed);
        self.snapshot()
    }

    /// Reset with the configured seed on the first call and the previous
    /// seed plus one afterwards.
    pub fn reset_next(&mut self) -> SimResult<SimSnapshot> {
        let seed = self.last_seed.map_or(self.config.seed, |s| s.wrapping_add(1));
        self.reset(seed)
    }

    /// Advance one tick applying `command`.
    ///
    /// The command's vocabulary code (including any `CANCEL` prefix) must
    /// be configured.  A new action is ignored while another is pending
    /// unless the command also cancels.
    pub fn step(&mut self, command: ActionCommand, args: ActionArgs) -> SimResult<StepOutcome> {
        let run = self.run.as_mut().ok_or(SimError::NotReset)?;
        if let Some(reason) = run.done {
            return Err(SimError::Terminated(reason));
        }
        let code = command.to_string();
        if !self.vocabulary.contains(&code) {
            return Err(SimError::Unavailable(code));
        }
        let route = self.preset.as_ref().and_then(|p| p.route.as_deref());
        run.step(&self.config, route, command, args)?;

        let snapshot = self.snapshot()?;
        let reason = snapshot.done;
        Ok(StepOutcome { snapshot, done: reason.is_some(), reason })
    }

    /// [`step`][Self::step] with a vocabulary code such as `"CANCELSSL3"`.
    pub fn step_code(&mut self, code: &str, args: ActionArgs) -> SimResult<StepOutcome> {
        let code = code.trim();
        if !self.vocabulary.contains(code) {
            return Err(SimError::Unavailable(code.to_owned()));
        }
        let command = ActionCommand::parse(code, self.config.maximum_automation_level)?;
        self.step(command, args)
    }

    /// [`step`][Self::step] with a discrete action number: the index of an
    /// entry in the vocabulary.
    pub fn step_index(&mut self, index: usize, args: ActionArgs) -> SimResult<StepOutcome> {
        let code = self
            .vocabulary
            .get(index)
            .ok_or_else(|| SimError::Unavailable(format!("#{index}")))?
            .to_owned();
        self.step_code(&code, args)
    }

    /// Turn a mediator's raw choice into the command to apply, given the
    /// pending action:
    ///
    /// - re-choosing the pending action collapses to `DN` and applies the
    ///   choice's `time`/`last` to the pending action;
    /// - choosing a different action while one is pending becomes
    ///   `CANCEL<action>`;
    /// - `DN` while an emergency stop is pending cancels it;
    /// - anything outside the vocabulary becomes `DN`.
    pub fn reconcile(&mut self, choice: &Choice) -> SimResult<ActionCommand> {
        let max_level = self.config.maximum_automation_level;
        let run = self.run.as_mut().ok_or(SimError::NotReset)?;
        let code = choice.action.trim();

        let command = match ActionCommand::parse(code, max_level) {
            Ok(command) => command,
            Err(err) => {
                debug!(action = code, %err, "unparseable choice replaced by DN");
                return Ok(ActionCommand::NOTHING);
            }
        };

        let command = match (&mut run.pending, command) {
            (Some(pending), ActionCommand { cancel: false, action: Some(id) }) if id == pending.id() => {
                pending.update_args(run.car.position(), choice.args, &mut run.action_rng);
                ActionCommand::NOTHING
            }
            (Some(_), ActionCommand { cancel: false, action: Some(id) }) => ActionCommand::replace(id),
            (Some(pending), ActionCommand { cancel: false, action: None })
                if pending.id() == ActionId::EmergencyStop =>
            {
                ActionCommand::CANCEL
            }
            (_, command) => command,
        };

        if self.vocabulary.contains(&command.to_string()) {
            Ok(command)
        } else {
            debug!(command = %command, "command outside the vocabulary replaced by DN");
            Ok(ActionCommand::NOTHING)
        }
    }

    /// Reconcile `choice` and step with the result.
    pub fn step_choice(&mut self, choice: &Choice) -> SimResult<(ActionCommand, StepOutcome)> {
        let command = self.reconcile(choice)?;
        let outcome = self.step(command, choice.args)?;
        Ok((command, outcome))
    }

    // ── Observation ───────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SimResult<SimSnapshot> {
        let run = self.current()?;
        let forecast = self.current_forecast(Variant::Nominal)?;
        Ok(run.snapshot(forecast))
    }

    /// The snapshot as a flat key/value map.
    pub fn state(&self) -> SimResult<State> {
        Ok(self.snapshot()?.to_state())
    }

    /// TTAF/TTAU of the current road at `position`.
    pub fn forecast(&self, position: f64, variant: Variant) -> SimResult<Forecast> {
        Ok(self.current()?.road.forecast(position, variant))
    }

    /// Forecast at the car's position.  With replayed route data and
    /// `use_parsed_tta_for_actions`, the nominal L2 figures are the recorded
    /// ones.
    pub fn current_forecast(&self, variant: Variant) -> SimResult<Forecast> {
        let run = self.current()?;
        let mut forecast = run.road.forecast(run.car.position(), variant);
        if variant == Variant::Nominal && self.config.use_parsed_tta_for_actions {
            let sample = run
                .car
                .route_index()
                .and_then(|i| self.preset.as_ref()?.route.as_ref()?.get(i));
            if let Some(sample) = sample {
                forecast.ttaf[0] = sample.ttaf;
                forecast.ttau[0] = sample.ttau;
            }
        }
        Ok(forecast)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// The current run.
    pub fn current(&self) -> SimResult<&RunState> {
        self.run.as_ref().ok_or(SimError::NotReset)
    }

    /// The metrics of the current run; finalized once it is done.
    pub fn metrics(&self) -> SimResult<&RunMetrics> {
        Ok(&self.current()?.metrics)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn preset(&self) -> Option<&PresetRoad> {
        self.preset.as_ref()
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn safety_kinds(&self) -> &[SafetyKind] {
        &self.kinds
    }

    pub fn is_done(&self) -> bool {
        self.run.as_ref().is_some_and(|r| r.done.is_some())
    }
}
