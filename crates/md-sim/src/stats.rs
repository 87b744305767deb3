//! Batch aggregation of finished runs.
//!
//! A [`BatchStats`] holds only sums, counts, minima and maxima, so merging
//! is associative and commutative: a batch split across workers merges to
//! the same totals in any order.  Averages are derived on demand by
//! [`BatchStats::report`].

use std::collections::BTreeMap;
use std::time::Duration;

use md_safety::Severity;

use crate::RunMetrics;

// ── Totals ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeverityTotals {
    /// Runs with at least one event of this severity.
    pub active_runs:  u64,
    pub total_events: u64,
    pub total_time:   f64,
    pub shortest:     Option<f64>,
    pub longest:      f64,
}

impl SeverityTotals {
    fn merge(&mut self, other: &SeverityTotals) {
        self.active_runs += other.active_runs;
        self.total_events += other.total_events;
        self.total_time += other.total_time;
        self.shortest = match (self.shortest, other.shortest) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.longest = self.longest.max(other.longest);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KindTotals {
    pub count:    u64,
    pub duration: f64,
}

/// One row per finished run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunRow {
    pub seed:                     u64,
    pub simulation_time:          f64,
    pub time_without_actions:     f64,
    pub action_count:             u64,
    pub action_frequency:         f64,
    pub avg_time_between_actions: f64,
    pub emergency_stop:           bool,
    /// Events per severity, indexed by [`Severity::index`].
    pub events:                   [u64; 3],
    pub event_time:               [f64; 3],
}

impl RunRow {
    fn from_run(m: &RunMetrics) -> Self {
        RunRow {
            seed:                     m.seed,
            simulation_time:          m.time_passed,
            time_without_actions:     m.time_without_actions,
            action_count:             m.action_count,
            action_frequency:         m.action_frequency,
            avg_time_between_actions: m.avg_time_between_actions,
            emergency_stop:           m.emergency_stop,
            events:                   m.severity.each_ref().map(|s| s.event_count),
            event_time:               m.severity.each_ref().map(|s| s.total_time),
        }
    }
}

// ── BatchStats ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchStats {
    pub total_runs:                 u64,
    pub total_time_driven:          f64,
    pub total_distance:             f64,
    pub time_in_level:              [f64; 4],
    pub severity:                   [SeverityTotals; 3],
    /// Keyed by predicate name.
    pub per_kind:                   BTreeMap<String, KindTotals>,
    pub total_action_count:         u64,
    pub total_time_between_actions: f64,
    pub emergency_stops:            u64,
    /// Sorted by seed.
    pub runs:                       Vec<RunRow>,
}

impl BatchStats {
    pub fn new() -> Self {
        BatchStats::default()
    }

    /// Statistics of a single finished run.
    pub fn from_run(m: &RunMetrics) -> Self {
        let mut stats = BatchStats::new();
        stats.add_run(m);
        stats
    }

    pub fn add_run(&mut self, m: &RunMetrics) {
        self.total_runs += 1;
        self.total_time_driven += m.time_passed;
        self.total_distance += m.road_length;
        for (total, t) in self.time_in_level.iter_mut().zip(m.time_in_level) {
            *total += t;
        }
        for (total, s) in self.severity.iter_mut().zip(&m.severity) {
            total.merge(&SeverityTotals {
                active_runs:  u64::from(s.event_count > 0),
                total_events: s.event_count,
                total_time:   s.total_time,
                shortest:     s.shortest,
                longest:      s.longest,
            });
        }
        for k in &m.per_kind {
            let totals = self.per_kind.entry(k.kind.name().to_owned()).or_default();
            totals.count += k.count as u64;
            totals.duration += k.duration;
        }
        self.total_action_count += m.action_count;
        self.total_time_between_actions += m.total_time_between_actions;
        self.emergency_stops += u64::from(m.emergency_stop);
        self.insert_row(RunRow::from_run(m));
    }

    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: &BatchStats) {
        self.total_runs += other.total_runs;
        self.total_time_driven += other.total_time_driven;
        self.total_distance += other.total_distance;
        for (total, t) in self.time_in_level.iter_mut().zip(other.time_in_level) {
            *total += t;
        }
        for (total, s) in self.severity.iter_mut().zip(&other.severity) {
            total.merge(s);
        }
        for (name, k) in &other.per_kind {
            let totals = self.per_kind.entry(name.clone()).or_default();
            totals.count += k.count;
            totals.duration += k.duration;
        }
        self.total_action_count += other.total_action_count;
        self.total_time_between_actions += other.total_time_between_actions;
        self.emergency_stops += other.emergency_stops;
        for row in &other.runs {
            self.insert_row(row.clone());
        }
    }

    /// `merge` by value, for folds and reductions.
    pub fn merged(mut self, other: BatchStats) -> Self {
        self.merge(&other);
        self
    }

    fn insert_row(&mut self, row: RunRow) {
        let at = self.runs.partition_point(|r| r.seed <= row.seed);
        self.runs.insert(at, row);
    }

    // ── Report ────────────────────────────────────────────────────────────

    /// Derived averages and percentages.  `runtime` is the wall-clock time
    /// the batch took.
    pub fn report(&self, runtime: Duration) -> BatchReport {
        let runs = self.total_runs as f64;
        let per_run = |x: f64| if self.total_runs > 0 { x / runs } else { 0.0 };
        let ratio = |x: f64, of: f64| if of > 0.0 { x / of } else { 0.0 };

        let percentage_in_level = self
            .time_in_level
            .map(|t| md_core::round_to(ratio(t, self.total_time_driven) * 100.0, 1));

        let severity = Severity::ALL
            .iter()
            .map(|&severity| {
                let s = &self.severity[severity.index()];
                SeverityReport {
                    severity,
                    active_runs:    s.active_runs,
                    avg_events:     per_run(s.total_events as f64),
                    avg_event_time: ratio(s.total_time, s.total_events as f64),
                    shortest:       s.shortest,
                    longest:        s.longest,
                    time_ratio:     ratio(s.total_time, self.total_time_driven),
                }
            })
            .collect();

        let avg_time_between_actions = if self.total_action_count > 1 {
            self.total_time_between_actions / (self.total_action_count - 1) as f64
        } else {
            0.0
        };

        BatchReport {
            total_runs:               self.total_runs,
            runtime_secs:             runtime.as_secs_f64(),
            avg_driving_time:         per_run(self.total_time_driven),
            percentage_in_level,
            avg_action_count:         per_run(self.total_action_count as f64),
            action_frequency:         ratio(self.total_action_count as f64 * 100.0, self.total_distance),
            avg_time_between_actions,
            emergency_stops:          self.emergency_stops,
            severity,
            per_kind:                 self.per_kind.clone(),
        }
    }
}

// ── BatchReport ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeverityReport {
    pub severity:       Severity,
    pub active_runs:    u64,
    pub avg_events:     f64,
    pub avg_event_time: f64,
    pub shortest:       Option<f64>,
    pub longest:        f64,
    /// Share of the total driving time.
    pub time_ratio:     f64,
}

/// What a batch looked like, averaged over its runs.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchReport {
    pub total_runs:               u64,
    pub runtime_secs:             f64,
    pub avg_driving_time:         f64,
    /// Indexed by [`Level::index`][md_core::Level::index], rounded to one
    /// decimal.
    pub percentage_in_level:      [f64; 4],
    pub avg_action_count:         f64,
    /// Actions per 100 km.
    pub action_frequency:         f64,
    pub avg_time_between_actions: f64,
    pub emergency_stops:          u64,
    pub severity:                 Vec<SeverityReport>,
    pub per_kind:                 BTreeMap<String, KindTotals>,
}
