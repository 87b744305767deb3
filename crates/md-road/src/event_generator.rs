//! Static and dynamic road-event generation.
//!
//! Static events are placed once, when the road is built: at most one per
//! segment, never on highway segments nor on the closing segment.  Dynamic
//! events are drawn every tick with a per-timestep probability calibrated so
//! that the configured overall probability holds over the estimated drive
//! time; they are announced a random lookahead distance ahead of the car.
//!
//! When a preset list exists, it is replayed instead of sampling.

use std::collections::VecDeque;

use md_core::{probability_per_timestep, EventTypeConfig, RoadParams, SimRng};

use crate::preset::PresetEvent;
use crate::{EventKind, RoadEvent, RoadSegment};

// ── Static events ─────────────────────────────────────────────────────────────

/// Build the static events of a road, sorted by start.
pub fn generate_static_events(
    params: &RoadParams,
    segments: &[RoadSegment],
    preset: Option<&[PresetEvent]>,
    rng: &mut SimRng,
) -> Vec<RoadEvent> {
    if let Some(preset) = preset {
        return events_from_preset(&params.static_events, preset, EventKind::Static);
    }

    let mut events = Vec::new();
    let eligible = segments.len().saturating_sub(1);
    for segment in segments[..eligible].iter().filter(|s| !s.is_highway()) {
        for cfg in &params.static_events {
            if rng.unit() < cfg.probability {
                let start = rng.uniform(segment.start, segment.end - cfg.max_length).max(segment.start);
                let end = rng
                    .uniform(start + cfg.min_length, start + cfg.max_length)
                    .min(segment.end);
                events.push(RoadEvent::from_config(cfg, EventKind::Static, start, end));
                break;
            }
        }
    }
    events.sort_by(|a, b| a.start.total_cmp(&b.start));
    events
}

fn events_from_preset(types: &[EventTypeConfig], preset: &[PresetEvent], kind: EventKind) -> Vec<RoadEvent> {
    let mut events: Vec<RoadEvent> = preset
        .iter()
        .filter_map(|p| {
            types
                .iter()
                .find(|t| t.name == p.name)
                .map(|cfg| RoadEvent::from_config(cfg, kind, p.start, p.end))
        })
        .collect();
    events.sort_by(|a, b| a.start.total_cmp(&b.start));
    events
}

// ── Dynamic events ────────────────────────────────────────────────────────────

/// Draws dynamic events during a run.
#[derive(Clone, Debug)]
pub struct RoadEventGenerator {
    types:         Vec<EventTypeConfig>,
    counts:        Vec<u32>,
    probabilities: Vec<f64>,
    min_lookahead: f64,
    max_lookahead: f64,
    /// Remaining preset events, sorted by start.  `None` means sample.
    preset:        Option<VecDeque<RoadEvent>>,
}

impl RoadEventGenerator {
    pub fn new(
        params: &RoadParams,
        timestep: f64,
        estimated_total_time: f64,
        preset: Option<&[PresetEvent]>,
    ) -> Self {
        let timesteps = estimated_total_time / timestep;
        RoadEventGenerator {
            types:         params.dynamic_events.clone(),
            counts:        vec![0; params.dynamic_events.len()],
            probabilities: params
                .dynamic_events
                .iter()
                .map(|e| probability_per_timestep(timesteps, e.probability))
                .collect(),
            min_lookahead: params.dynamic_event_min_lookahead,
            max_lookahead: params.dynamic_event_max_lookahead,
            preset:        preset.map(|p| events_from_preset(&params.dynamic_events, p, EventKind::Dynamic).into()),
        }
    }

    /// Possibly announce a new dynamic event for a car at `position`.
    ///
    /// An event type is skipped while an event of the same name is active.
    pub fn next_dynamic(&mut self, position: f64, active: &[RoadEvent], rng: &mut SimRng) -> Option<RoadEvent> {
        let lookahead = rng.uniform(self.min_lookahead, self.max_lookahead);

        if let Some(queue) = self.preset.as_mut() {
            return match queue.front() {
                Some(next) if next.start <= position + lookahead => queue.pop_front(),
                _ => None,
            };
        }

        for (i, cfg) in self.types.iter().enumerate() {
            if self.counts[i] >= cfg.max_occurrences || active.iter().any(|e| e.name == cfg.name) {
                continue;
            }
            if rng.unit() < self.probabilities[i] {
                self.counts[i] += 1;
                let start = position + lookahead;
                let end = start + rng.uniform(cfg.min_length, cfg.max_length);
                return Some(RoadEvent::from_config(cfg, EventKind::Dynamic, start, end));
            }
        }
        None
    }

    /// Number of dynamic events of each configured type emitted so far.
    pub fn counts(&self) -> impl Iterator<Item = (&str, u32)> {
        self.types.iter().map(|t| t.name.as_str()).zip(self.counts.iter().copied())
    }
}
