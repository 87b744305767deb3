//! The per-tick safety evaluator.

use md_core::SimConfig;
use tracing::debug;

use crate::kind::Persistence;
use crate::{SafetyEvent, SafetyInputs, SafetyKind, SafetyResult, Severity, Thresholds};

/// Tracks every configured safety predicate across a run.
///
/// Each tick the open events are stepped first and closed when their kind
/// says so.  Every configured kind without an open event is then tested
/// once and, if it holds, opens a new event.  At most one event per kind is
/// open at any time.
#[derive(Clone, Debug)]
pub struct SafetyEvaluator {
    kinds:        Vec<SafetyKind>,
    thresholds:   Thresholds,
    /// Every event of the run, in opening order.
    events:       Vec<SafetyEvent>,
    /// Indices into `events` of the open ones.
    active:       Vec<usize>,
    active_now:   [bool; 3],
    active_steps: [u64; 3],
    time:         f64,
    last_switch:  Option<f64>,
}

impl SafetyEvaluator {
    pub fn new(kinds: Vec<SafetyKind>, thresholds: Thresholds) -> Self {
        SafetyEvaluator {
            kinds,
            thresholds,
            events:       Vec::new(),
            active:       Vec::new(),
            active_now:   [false; 3],
            active_steps: [0; 3],
            time:         0.0,
            last_switch:  None,
        }
    }

    /// An evaluator for the predicates named in `cfg.safety_events`.
    pub fn from_config(cfg: &SimConfig) -> SafetyResult<Self> {
        let kinds = SafetyKind::parse_list(&cfg.safety_events)?;
        Ok(SafetyEvaluator::new(kinds, Thresholds::from_config(cfg)))
    }

    pub fn step(&mut self, inputs: &SafetyInputs<'_>) {
        self.time = inputs.time;
        let th = self.thresholds;

        for &i in &self.active {
            let event = &mut self.events[i];
            let still_active = match event.kind.persistence() {
                Persistence::Live => event.kind.triggers(inputs, self.last_switch, &th),
                Persistence::UntilMoved => true,
                Persistence::OneTick => false,
            };
            event.step(inputs.position, th.timestep, still_active);
            if event.kind.persistence() == Persistence::UntilMoved && event.start != event.end {
                event.pending = false;
            }
            if !event.pending {
                debug!(
                    kind     = event.name(),
                    start    = event.start,
                    end      = event.end,
                    duration = event.duration,
                    "safety event closed"
                );
            }
        }
        let events = &self.events;
        self.active.retain(|&i| events[i].pending);

        for &kind in &self.kinds {
            if self.active.iter().any(|&i| self.events[i].kind == kind) {
                continue;
            }
            if kind.triggers(inputs, self.last_switch, &th) {
                debug!(kind = kind.name(), severity = %kind.severity(), position = inputs.position, "safety event opened");
                self.active.push(self.events.len());
                self.events.push(SafetyEvent::open(kind, inputs.position));
            }
        }

        for severity in Severity::ALL {
            let on = self.active.iter().any(|&i| self.events[i].severity == severity);
            self.active_now[severity.index()] = on;
            if on {
                self.active_steps[severity.index()] += 1;
            }
        }

        if inputs.switched {
            self.last_switch = Some(self.time);
        }
    }

    pub fn kinds(&self) -> &[SafetyKind] {
        &self.kinds
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Every event of the run, open or closed, in opening order.
    pub fn events(&self) -> &[SafetyEvent] {
        &self.events
    }

    pub fn active_events(&self) -> impl Iterator<Item = &SafetyEvent> {
        self.active.iter().map(|&i| &self.events[i])
    }

    pub fn is_active(&self, kind: SafetyKind) -> bool {
        self.active_events().any(|e| e.kind == kind)
    }

    /// Whether an event of `severity` was open at the end of the last step.
    pub fn severity_active(&self, severity: Severity) -> bool {
        self.active_now[severity.index()]
    }

    /// Number of steps that ended with an open event of `severity`.
    pub fn active_steps(&self, severity: Severity) -> u64 {
        self.active_steps[severity.index()]
    }

    /// Time of the last level switch.
    pub fn time_of_last_switch(&self) -> Option<f64> {
        self.last_switch
    }
}
