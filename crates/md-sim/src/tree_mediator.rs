//! A mediator driven by a parsed decision tree.
//!
//! The tree never sees raw positions or times.  It sees decision variables
//! derived from the run: which levels stay available long enough for a
//! comfortable shift, where the last comfortable shift position lies,
//! whether a level was declined recently, and so on.

use md_action::{ActionArgs, ActionId, ACTION_CODES};
use md_core::{Level, SimConfig, Variant};
use md_road::Road;
use md_rules::{Decision, DecisionTree, State, TreeRegistry, Value};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::future;
use crate::{Choice, FutureShift, Mediator, Sim, SimResult};

/// Constant offsets added to the forecast and driver timings the tree sees.
/// Values of zero are left untouched.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Noise {
    pub ttaf: f64,
    pub ttau: f64,
    pub ttdf: f64,
    pub ttdu: f64,
}

impl Noise {
    #[inline]
    fn apply(offset: f64, value: f64) -> f64 {
        if value > 0.0 { value + offset } else { value }
    }
}

/// The raw quantities the decision variables are derived from.
///
/// Captured from the live run, or synthesized for a position ahead of the
/// car with a neutral driver.
#[derive(Clone, Debug, PartialEq)]
pub struct MediatorInputs {
    pub position:              f64,
    pub time:                  f64,
    pub level:                 Level,
    /// `[L2, L3, L4]`.
    pub ttaf:                  [f64; 3],
    pub ttau:                  [f64; 3],
    pub ttdf:                  f64,
    pub ttdu:                  f64,
    pub distraction:           u8,
    pub fatigue:               u8,
    pub uncorrectable_fatigue: bool,
    pub request:               Option<Level>,
    pub pending:               Option<ActionId>,
    pub last_declines:         [Option<f64>; 4],
    pub last_switch:           Option<f64>,
}

/// Timing budgets derived from the preferences, in seconds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Budgets {
    /// Window of opportunity plus a comfortable shift.
    pub comfortable_enforce:  f64,
    /// How long a level must stay available to be worth a comfortable
    /// switch to it.
    pub minimum_availability: f64,
    /// Shortest enforced shift given the driver's time to fitness.
    pub minimum_enforce:      f64,
    /// Latest point to start an enforced shift at the end of the window.
    pub latest_enforce:       f64,
}

impl Budgets {
    pub fn new(cfg: &SimConfig, ttdf: f64) -> Self {
        let p = &cfg.preferences;
        let comfortable_enforce = p.window_of_opportunity_time + p.comfortable_shift_time + cfg.timestep;
        Budgets {
            comfortable_enforce,
            minimum_availability: p.comfortable_shift_time + p.uncomfortable_switch + comfortable_enforce,
            minimum_enforce:      cfg.actions.min_esl_time + ttdf + cfg.timestep,
            latest_enforce:       p.comfortable_shift_time + cfg.timestep,
        }
    }
}

// ── TreeMediator ──────────────────────────────────────────────────────────────

pub struct TreeMediator {
    tree:    DecisionTree,
    variant: Variant,
    noise:   Noise,
    /// Previously predicted shifts by action name.
    futures: FxHashMap<String, Vec<FutureShift>>,
}

impl TreeMediator {
    pub fn new(tree: DecisionTree) -> Self {
        TreeMediator {
            tree,
            variant: Variant::Nominal,
            noise:   Noise::default(),
            futures: FxHashMap::default(),
        }
    }

    /// A registry that accepts every action code as a tree terminal.
    pub fn registry() -> TreeRegistry {
        TreeRegistry::new(&ACTION_CODES)
    }

    /// Parse the single tree `name` from `source`.
    pub fn from_source(name: &str, source: &str) -> SimResult<Self> {
        let tree = TreeMediator::registry().with_source(name, source)?.parse(name)?;
        Ok(TreeMediator::new(tree))
    }

    /// Which forecast partition the tree looks at.
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_noise(mut self, noise: Noise) -> Self {
        self.noise = noise;
        self
    }

    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    pub(crate) fn predicted(&self, name: &str) -> Option<&FutureShift> {
        self.futures.get(name).and_then(|v| v.last())
    }

    pub(crate) fn remember(&mut self, shift: FutureShift) {
        self.futures.entry(shift.action.to_string()).or_default().push(shift);
    }

    /// Every shift predicted since the last reset, by action name.
    pub fn predictions(&self) -> &FxHashMap<String, Vec<FutureShift>> {
        &self.futures
    }

    // ── State building ────────────────────────────────────────────────────

    /// The inputs as they are at the car's position right now.
    pub fn inputs(&self, sim: &Sim) -> SimResult<MediatorInputs> {
        let run = sim.current()?;
        let forecast = sim.current_forecast(self.variant)?;
        let driver = run.driver();
        Ok(MediatorInputs {
            position:              run.car().position(),
            time:                  run.time(),
            level:                 run.car().level(),
            ttaf:                  forecast.ttaf,
            ttau:                  forecast.ttau,
            ttdf:                  driver.ttdf(),
            ttdu:                  driver.ttdu(),
            distraction:           driver.distraction(),
            fatigue:               driver.fatigue(),
            uncorrectable_fatigue: driver.uncorrectable_fatigue(),
            request:               driver.request(),
            pending:               run.pending_action().map(|a| a.id()),
            last_declines:         *driver.last_declines(),
            last_switch:           run.time_of_last_switch(),
        })
    }

    /// Derive the decision variables the tree is evaluated against.
    pub fn decision_state(&self, sim: &Sim, inputs: &MediatorInputs) -> SimResult<State> {
        let road = sim.current()?.road();
        let cfg = sim.config();
        let top = highest_suggestion(sim);
        Ok(derive_state(cfg, road, top, &self.noisy(inputs)))
    }

    /// Evaluate the tree on `inputs`.
    pub fn decide(&self, sim: &Sim, inputs: &MediatorInputs) -> SimResult<Decision> {
        let state = self.decision_state(sim, inputs)?;
        let decision = self.tree.evaluate(&state)?;
        trace!(
            tree     = self.tree.name(),
            action   = %decision.action,
            position = inputs.position,
            "tree decision"
        );
        Ok(decision)
    }

    fn noisy(&self, inputs: &MediatorInputs) -> MediatorInputs {
        let n = self.noise;
        MediatorInputs {
            ttaf: inputs.ttaf.map(|t| Noise::apply(n.ttaf, t)),
            ttau: inputs.ttau.map(|t| Noise::apply(n.ttau, t)),
            ttdf: Noise::apply(n.ttdf, inputs.ttdf),
            ttdu: Noise::apply(n.ttdu, inputs.ttdu),
            ..inputs.clone()
        }
    }
}

impl Mediator for TreeMediator {
    fn choose(&mut self, sim: &Sim) -> SimResult<Choice> {
        let inputs = self.inputs(sim)?;
        let decision = self.decide(sim, &inputs)?;
        Ok(choice_from(decision))
    }

    fn future_action(&mut self, sim: &Sim) -> SimResult<Option<FutureShift>> {
        future::predict(self, sim)
    }

    fn reset(&mut self) {
        self.futures.clear();
    }
}

/// Turn a tree decision into a choice; `time` and `last` are the only
/// arguments actions understand.
pub(crate) fn choice_from(decision: Decision) -> Choice {
    let args = ActionArgs {
        time: decision.arg_num("time"),
        last: decision.arg_num("last"),
    };
    Choice { action: decision.action, args }
}

/// The highest level any configured suggestion targets.  Caps
/// `max_level_long` and `max_available_level` so the tree never aims above
/// what it could suggest.
fn highest_suggestion(sim: &Sim) -> Level {
    sim.vocabulary()
        .entries()
        .iter()
        .filter_map(|code| match code.parse::<ActionId>() {
            Ok(ActionId::SuggestShift(level)) => Some(level),
            _ => None,
        })
        .max()
        .unwrap_or(Level::L0)
}

/// Highest level available now (`ttaf == 0`) whose `ttau` exceeds
/// `threshold`, capped at `top`.
fn highest_available(ttaf: &[f64; 3], ttau: &[f64; 3], threshold: f64, top: Level) -> Level {
    (0..3)
        .rev()
        .find(|&i| ttaf[i] == 0.0 && ttau[i] > threshold)
        .map_or(Level::L0, |i| Level::FORECAST[i])
        .min(top)
}

fn derive_state(cfg: &SimConfig, road: &Road, top: Level, v: &MediatorInputs) -> State {
    let b = Budgets::new(cfg, v.ttdf);
    let p = &cfg.preferences;
    let ttau_l2 = v.ttau[0];

    let position_before = |ttau: f64, margin: f64| -> Value {
        if ttau <= margin {
            Value::None
        } else {
            road.position_in_time(v.position, ttau - margin).into()
        }
    };
    let declined = |level: Level| -> bool {
        v.last_declines[level.index()].is_some_and(|t| v.time - t < p.decline_threshold)
    };
    let moving_to = v.pending.and_then(ActionId::target_level);
    let comfortable_switch = v.last_switch.is_none_or(|t| v.time - t > p.uncomfortable_switch);
    let ttau_current = v.level.forecast_index().map(|i| v.ttau[i]);

    let mut state = State::default();
    let mut put = |key: &str, value: Value| {
        state.insert(key.to_owned(), value);
    };
    put("current_level", v.level.into());
    put("preferred_level", p.preferred_level.into());
    put("moving_to_level", moving_to.into());
    put("max_level_long", highest_available(&v.ttaf, &v.ttau, b.minimum_availability, top).into());
    put("latest_max_level_long_position", position_before(ttau_l2, b.minimum_availability));
    put(
        "max_available_level",
        highest_available(&v.ttaf, &v.ttau, b.comfortable_enforce + b.minimum_enforce, top).into(),
    );
    put("latest_esl_position", position_before(ttau_l2, b.latest_enforce));
    put("distraction", v.distraction.into());
    put("fatigue", v.fatigue.into());
    put("uncorrectable_fatigue", v.uncorrectable_fatigue.into());
    put("ssl4_declined", declined(Level::L4).into());
    put("ssl3_declined", declined(Level::L3).into());
    put("ssl2_declined", declined(Level::L2).into());
    put("ssl0_declined", declined(Level::L0).into());
    put("preferred_level_declined", declined(p.preferred_level).into());
    put("comfortable_switch", comfortable_switch.into());
    put("ttau", ttau_current.into());
    put("ttau_l4", v.ttau[2].into());
    put("ttau_l3", v.ttau[1].into());
    put("ttau_l2", ttau_l2.into());
    put("ttdf", v.ttdf.into());
    put("ttdu", v.ttdu.into());
    put("min_esl_time", cfg.actions.min_esl_time.into());
    put("timestep", cfg.timestep.into());
    put("active_request", v.request.is_some().into());
    put("driver_request", v.request.into());
    put("road_length", road.total_distance().into());
    state
}
