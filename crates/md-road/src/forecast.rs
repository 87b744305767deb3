//! Automation-level forecasting.
//!
//! # Partition
//!
//! The road is cut at every breakpoint: `0`, the total distance, every
//! segment bound and every event bound (clamped to the road length).  For
//! each breakpoint-bounded interval the maximum level is the minimum of the
//! covering segment's level and the level of every overlapping event; the
//! speed limit is derived the same way.  Adjacent intervals with equal values
//! are merged, so a partition is a list of `(value, end)` pairs with strictly
//! increasing ends.  One level partition is kept per [`Variant`]; speeds do
//! not depend on the variant.
//!
//! # Queries
//!
//! TTAF for level X is the time until the first interval (from the current
//! one onwards) whose level is at least X; TTAU is the time until the first
//! interval whose level is below X.  Both are 0 when the current interval
//! already satisfies the condition and [`NEVER`] when no interval ahead does.
//! Distances are converted to time by integrating over the speed partition.
//!
//! The partition is rebuilt only when a dynamic event is inserted; building
//! is quadratic in the number of breakpoints, which stays small.

use md_core::{round_to, Level, Variant, NEVER};

use crate::{RoadEvent, RoadSegment};

// ── Partition entries ─────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelInterval {
    pub level: Level,
    pub end:   f64,
}

#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeedInterval {
    /// km/h.
    pub speed: f64,
    pub end:   f64,
}

/// TTAF and TTAU in seconds for `[L2, L3, L4]`.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Forecast {
    pub ttaf: [f64; 3],
    pub ttau: [f64; 3],
}

impl Forecast {
    #[inline]
    pub fn ttaf_of(&self, level: Level) -> Option<f64> {
        level.forecast_index().map(|i| self.ttaf[i])
    }

    #[inline]
    pub fn ttau_of(&self, level: Level) -> Option<f64> {
        level.forecast_index().map(|i| self.ttau[i])
    }
}

// ── LevelForecaster ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct LevelForecaster {
    levels:         [Vec<LevelInterval>; 3],
    speeds:         Vec<SpeedInterval>,
    total_distance: f64,
}

impl LevelForecaster {
    /// Build all partitions.  `events` must be sorted by start.
    pub fn build(segments: &[RoadSegment], events: &[RoadEvent], total_distance: f64, max_level: Level) -> Self {
        let mut breakpoints: Vec<f64> = Vec::with_capacity(2 + 2 * (segments.len() + events.len()));
        breakpoints.push(0.0);
        breakpoints.push(total_distance);
        for e in events {
            breakpoints.push(e.start.min(total_distance));
            breakpoints.push(e.end.min(total_distance));
        }
        for s in segments {
            breakpoints.push(s.start);
            breakpoints.push(s.end);
        }
        breakpoints.sort_by(f64::total_cmp);
        breakpoints.dedup();

        let mut levels: [Vec<LevelInterval>; 3] = Default::default();
        let mut speeds: Vec<SpeedInterval> = Vec::new();

        for pair in breakpoints.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let segment = segment_at(segments, (start + end) / 2.0);

            for variant in Variant::ALL {
                let mut lowest = max_level;
                for e in events {
                    if e.start >= end {
                        break;
                    }
                    if e.end > start {
                        lowest = lowest.min(e.level(variant));
                    }
                }
                if let Some(s) = segment {
                    lowest = lowest.min(s.max_level);
                }
                push_level(&mut levels[variant.index()], lowest, end);
            }

            let mut slowest = f64::INFINITY;
            for e in events {
                if e.start >= end {
                    break;
                }
                if e.end > start {
                    slowest = slowest.min(e.max_speed);
                }
            }
            if let Some(s) = segment {
                slowest = slowest.min(s.speed_limit);
            }
            push_speed(&mut speeds, slowest, end);
        }

        // A degenerate road (zero length) still gets one interval so every
        // query has something to index.
        for list in &mut levels {
            if list.is_empty() {
                list.push(LevelInterval { level: max_level, end: total_distance });
            }
        }
        if speeds.is_empty() {
            let speed = segments.first().map_or(f64::INFINITY, |s| s.speed_limit);
            speeds.push(SpeedInterval { speed, end: total_distance });
        }

        LevelForecaster { levels, speeds, total_distance }
    }

    #[inline]
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn levels(&self, variant: Variant) -> &[LevelInterval] {
        &self.levels[variant.index()]
    }

    pub fn speeds(&self) -> &[SpeedInterval] {
        &self.speeds
    }

    /// Index of the level interval containing `position`: the first whose
    /// end lies beyond it, or the last one past the end of the road.
    pub fn interval_index(&self, position: f64, variant: Variant) -> usize {
        let list = self.levels(variant);
        list.iter()
            .position(|iv| position < iv.end)
            .unwrap_or(list.len().saturating_sub(1))
    }

    pub fn level_at(&self, position: f64, variant: Variant) -> Level {
        let list = self.levels(variant);
        list[self.interval_index(position, variant)].level
    }

    /// End of the level interval containing `position`, i.e. the next
    /// position at which the maximum level changes.
    pub fn level_change_after(&self, position: f64, variant: Variant) -> f64 {
        let list = self.levels(variant);
        list[self.interval_index(position, variant)].end
    }

    pub fn speed_at(&self, position: f64) -> f64 {
        let i = self
            .speeds
            .iter()
            .position(|s| position < s.end)
            .unwrap_or(self.speeds.len().saturating_sub(1));
        self.speeds[i].speed
    }

    /// TTAF and TTAU from `position`, or `None` past the end of the road.
    pub fn forecast(&self, position: f64, variant: Variant) -> Option<Forecast> {
        Some(Forecast {
            ttaf: self.ttaf(position, variant)?,
            ttau: self.ttau(position, variant)?,
        })
    }

    pub fn ttaf(&self, position: f64, variant: Variant) -> Option<[f64; 3]> {
        self.time_to_first(position, variant, |interval, level| interval >= level)
    }

    pub fn ttau(&self, position: f64, variant: Variant) -> Option<[f64; 3]> {
        self.time_to_first(position, variant, |interval, level| interval < level)
    }

    /// For each forecast level, the time until the first interval (from the
    /// current one) whose level satisfies `hit`.
    fn time_to_first(&self, position: f64, variant: Variant, hit: impl Fn(Level, Level) -> bool) -> Option<[f64; 3]> {
        if position > self.total_distance {
            return None;
        }
        let list = self.levels(variant);
        let index = self.interval_index(position, variant);

        let mut out = [NEVER; 3];
        for (slot, level) in out.iter_mut().zip(Level::FORECAST) {
            if let Some(offset) = list[index..].iter().position(|iv| hit(iv.level, level)) {
                *slot = match offset {
                    0 => 0.0,
                    n => self.time_to_position(position, list[index + n - 1].end),
                };
            }
        }
        Some(out)
    }

    /// Seconds needed to drive from `from` to `to` at the partition's speed
    /// limits, rounded to 2 decimals.  [`NEVER`] when `to` lies past the end
    /// of the road.
    pub fn time_to_position(&self, from: f64, to: f64) -> f64 {
        if to > self.total_distance {
            return NEVER;
        }
        if to <= from {
            return 0.0;
        }
        let first = self
            .speeds
            .iter()
            .position(|s| s.end >= from)
            .unwrap_or(self.speeds.len().saturating_sub(1));

        let mut total = 0.0;
        let mut previous_end = from;
        for s in &self.speeds[first..] {
            let start = previous_end.max(from);
            let end = s.end.min(to);
            if end > start {
                total += (end - start) / s.speed * 3_600.0;
            }
            previous_end = s.end;
            if s.end >= to {
                break;
            }
        }
        round_to(total, 2)
    }

    /// Position reached after driving `secs` seconds from `from`, capped at
    /// the end of the road.  Positions past the end are returned unchanged.
    pub fn position_in_time(&self, from: f64, secs: f64) -> f64 {
        if from > self.total_distance {
            return from;
        }
        let first = self
            .speeds
            .iter()
            .position(|s| s.end >= from)
            .unwrap_or(self.speeds.len().saturating_sub(1));

        let mut position = from;
        let mut remaining = secs;
        for s in &self.speeds[first..] {
            let to_end = (s.end - position) / s.speed * 3_600.0;
            if to_end > remaining {
                return position + s.speed * remaining / 3_600.0;
            }
            position = s.end;
            remaining -= to_end;
        }
        position
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// The segment whose closed interval contains `position`, falling back to
/// the last segment.
pub(crate) fn segment_at(segments: &[RoadSegment], position: f64) -> Option<&RoadSegment> {
    segments
        .iter()
        .find(|s| s.contains(position))
        .or_else(|| segments.last())
}

fn push_level(list: &mut Vec<LevelInterval>, level: Level, end: f64) {
    match list.last_mut() {
        Some(last) if last.level == level => last.end = end,
        _ => list.push(LevelInterval { level, end }),
    }
}

fn push_speed(list: &mut Vec<SpeedInterval>, speed: f64, end: f64) {
    match list.last_mut() {
        Some(last) if last.speed == speed => last.end = end,
        _ => list.push(SpeedInterval { speed, end }),
    }
}
