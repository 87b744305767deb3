//! Driver-event generation.

use std::collections::VecDeque;

use md_core::{probability_per_timestep, DriverEventConfig, DriverEventKind, Level, SimRng};
use md_road::PresetDriverEvent;

use crate::DriverEvent;

/// Draws new driver events, at most one per tick.
///
/// Event kinds are tried in configuration order.  A kind is skipped while an
/// event of that kind is pending or once its occurrence cap is reached.  A
/// drawn event that is impossible at the current level still counts towards
/// the cap but is discarded.
#[derive(Clone, Debug)]
pub struct DriverEventGenerator {
    allowed:       Vec<DriverEventConfig>,
    counts:        Vec<u32>,
    probabilities: Vec<f64>,
    max_level:     Level,
    /// Remaining preset events, sorted by position.  `None` means sample.
    preset:        Option<VecDeque<PresetDriverEvent>>,
}

impl DriverEventGenerator {
    pub fn new(
        allowed: &[DriverEventConfig],
        timestep: f64,
        estimated_total_time: f64,
        max_level: Level,
        preset: Option<&[PresetDriverEvent]>,
    ) -> Self {
        let timesteps = estimated_total_time / timestep;
        let preset = preset.map(|p| {
            let mut sorted = p.to_vec();
            sorted.sort_by(|a, b| a.position.total_cmp(&b.position));
            VecDeque::from(sorted)
        });
        DriverEventGenerator {
            allowed:       allowed.to_vec(),
            counts:        vec![0; allowed.len()],
            probabilities: allowed
                .iter()
                .map(|e| probability_per_timestep(timesteps, e.probability))
                .collect(),
            max_level,
            preset,
        }
    }

    pub fn next_event(
        &mut self,
        position: f64,
        level: Level,
        pending: &[DriverEvent],
        rng: &mut SimRng,
    ) -> Option<DriverEvent> {
        if let Some(queue) = self.preset.as_mut() {
            let due = queue.front().is_some_and(|e| position >= e.position);
            if !due {
                return None;
            }
            let preset = queue.pop_front()?;
            let event = match preset.kind {
                DriverEventKind::Fatigue       => DriverEvent::fatigue(position),
                DriverEventKind::Distraction   => DriverEvent::distraction(position),
                DriverEventKind::Ndrt          => DriverEvent::ndrt(position),
                DriverEventKind::DriverRequest => {
                    let requested = match preset.level {
                        Some(l) => l.min(self.max_level),
                        None => self.random_request_level(rng),
                    };
                    DriverEvent::request(position, requested)
                }
            };
            return event.is_possible(level).then_some(event);
        }

        for i in 0..self.allowed.len() {
            let kind = self.allowed[i].kind;
            if self.counts[i] >= self.allowed[i].max_occurrences || pending.iter().any(|e| e.kind() == kind) {
                continue;
            }
            if rng.unit() < self.probabilities[i] {
                self.counts[i] += 1;
                let event = match kind {
                    DriverEventKind::Fatigue       => DriverEvent::fatigue(position),
                    DriverEventKind::Distraction   => DriverEvent::distraction(position),
                    DriverEventKind::Ndrt          => DriverEvent::ndrt(position),
                    DriverEventKind::DriverRequest => {
                        DriverEvent::request(position, self.random_request_level(rng))
                    }
                };
                if event.is_possible(level) {
                    return Some(event);
                }
            }
        }
        None
    }

    fn random_request_level(&self, rng: &mut SimRng) -> Level {
        let candidates: Vec<Level> = Level::ALL.into_iter().filter(|l| *l <= self.max_level).collect();
        rng.choose(&candidates).copied().unwrap_or(Level::L0)
    }
}
