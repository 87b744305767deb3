//! Per-run evaluation metrics.

use md_core::Level;
use md_safety::{SafetyEvaluator, SafetyKind, Severity};

// ── SeverityMetrics ───────────────────────────────────────────────────────────

/// Time spent with at least one open safety event of one severity.
///
/// An "event" here is a maximal stretch of consecutive ticks during which
/// some event of the severity was open, regardless of how many predicates
/// overlapped.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeverityMetrics {
    pub event_count: u64,
    pub total_time:  f64,
    /// `None` until the first stretch is recorded.
    pub shortest:    Option<f64>,
    pub longest:     f64,
    /// Set by [`RunMetrics::finalize`].
    pub avg_time:    f64,
    /// Share of the run's time, set by [`RunMetrics::finalize`].
    pub time_ratio:  f64,
    current:         f64,
    was_active:      bool,
}

impl SeverityMetrics {
    fn record(&mut self, active: bool, dt: f64) {
        if active {
            self.total_time += dt;
            if self.was_active {
                self.current += dt;
            } else {
                self.event_count += 1;
                self.current = dt;
            }
            self.longest = self.longest.max(self.current);
            self.shortest = Some(self.shortest.map_or(self.current, |s| s.min(self.current)));
        }
        self.was_active = active;
    }
}

/// Count and summed duration of one safety predicate's events.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KindMetrics {
    pub kind:     SafetyKind,
    pub count:    usize,
    pub duration: f64,
}

/// What happened to actions during one tick.
#[derive(Copy, Clone, Debug, Default)]
pub struct TickActivity {
    /// An action was created this tick.
    pub started: bool,
    /// An action is still pending after this tick.
    pub pending: bool,
    /// An action resolved this tick.
    pub ended:   bool,
}

// ── RunMetrics ────────────────────────────────────────────────────────────────

/// Accumulated outcome of one run.  Updated every tick by the orchestrator
/// and finalized once when the run ends.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunMetrics {
    pub seed:                       u64,
    /// Simulated seconds at the end of the run.
    pub time_passed:                f64,
    pub road_length:                f64,
    /// Seconds spent at each level, indexed by [`Level::index`].
    pub time_in_level:              [f64; 4],
    /// Indexed by [`Severity::index`].
    pub severity:                   [SeverityMetrics; 3],
    pub per_kind:                   Vec<KindMetrics>,
    pub action_count:               u64,
    pub total_time_between_actions: f64,
    pub avg_time_between_actions:   f64,
    /// Actions per 100 km.
    pub action_frequency:           f64,
    pub time_without_actions:       f64,
    pub emergency_stop:             bool,
    pub finalized:                  bool,
    last_action_time:               Option<f64>,
    first_action_time:              Option<f64>,
}

impl RunMetrics {
    pub fn new(seed: u64, road_length: f64) -> Self {
        RunMetrics {
            seed,
            time_passed:                0.0,
            road_length,
            time_in_level:              [0.0; 4],
            severity:                   Default::default(),
            per_kind:                   Vec::new(),
            action_count:               0,
            total_time_between_actions: 0.0,
            avg_time_between_actions:   0.0,
            action_frequency:           0.0,
            time_without_actions:       0.0,
            emergency_stop:             false,
            finalized:                  false,
            last_action_time:           None,
            first_action_time:          None,
        }
    }

    /// Record one tick at simulated time `now` (start of the tick).
    pub fn record_tick(&mut self, now: f64, dt: f64, level: Level, safety: &SafetyEvaluator, actions: TickActivity) {
        self.time_in_level[level.index()] += dt;
        for severity in Severity::ALL {
            self.severity[severity.index()].record(safety.severity_active(severity), dt);
        }

        if actions.started {
            self.action_count += 1;
            match self.last_action_time {
                Some(last) => self.total_time_between_actions += now - last,
                None => self.first_action_time = Some(now),
            }
        }
        if actions.pending || actions.ended {
            self.last_action_time = Some(now);
        }
    }

    /// Derive averages and per-kind totals once the run has ended.
    pub fn finalize(&mut self, time_passed: f64, safety: &SafetyEvaluator, emergency_stop: bool) {
        self.time_passed = time_passed;
        self.emergency_stop = emergency_stop;

        for s in &mut self.severity {
            s.avg_time = if s.event_count > 0 { s.total_time / s.event_count as f64 } else { 0.0 };
            s.time_ratio = if time_passed > 0.0 { s.total_time / time_passed } else { 0.0 };
        }

        self.per_kind = safety
            .kinds()
            .iter()
            .map(|&kind| {
                let events = safety.events().iter().filter(|e| e.kind == kind);
                let (count, duration) = events.fold((0, 0.0), |(n, d), e| (n + 1, d + e.duration));
                KindMetrics { kind, count, duration }
            })
            .collect();

        self.action_frequency = if self.road_length > 0.0 {
            self.action_count as f64 * 100.0 / self.road_length
        } else {
            0.0
        };
        self.avg_time_between_actions = if self.action_count >= 2 {
            self.total_time_between_actions / (self.action_count - 1) as f64
        } else {
            0.0
        };
        self.time_without_actions = match (self.first_action_time, self.last_action_time) {
            (Some(first), Some(last)) => first + self.total_time_between_actions + (time_passed - last),
            _ => time_passed,
        };
        self.finalized = true;
    }

    pub fn severity(&self, severity: Severity) -> &SeverityMetrics {
        &self.severity[severity.index()]
    }

    pub fn kind(&self, kind: SafetyKind) -> Option<&KindMetrics> {
        self.per_kind.iter().find(|k| k.kind == kind)
    }
}
