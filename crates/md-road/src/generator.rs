//! Road generation.
//!
//! A random road always starts and ends with `city`.  In between, road types
//! alternate (never the same type twice in a row), each limited by its
//! `max_occurrences` and only eligible while its minimum length still fits in
//! the distance left before the closing city stretch.  A `highway` is wrapped
//! by `highway_link` entry and exit segments carved out of its own length.

use md_core::{round_to, ConfigError, RoadParams, RoadTypeConfig, SimRng};

use crate::preset::PresetSegment;
use crate::{RoadError, RoadResult, RoadSegment};

/// Generate a random sequence of segments covering `params.road_length`.
pub fn generate_segments(params: &RoadParams, rng: &mut SimRng) -> RoadResult<Vec<RoadSegment>> {
    let city = params
        .road_type("city")
        .ok_or_else(|| ConfigError::MissingRoadType("city".to_owned()))?;
    let length = params.road_length;
    let min_city = city.min_length;
    let link = params.road_type("highway_link");

    let mut counts = vec![0u32; params.road_types.len()];
    if let Some(i) = params.road_types.iter().position(|t| t.name == "city") {
        counts[i] = 1;
    }

    let mut segments = vec![random_segment(city, 0.0, length, rng)];
    let mut remaining = length - last_end(&segments);

    while remaining > min_city {
        let budget = remaining - min_city;
        let Some(previous) = segments.last() else { break };
        let previous_type = previous.road_type.clone();
        let previous_end = previous.end;

        let available: Vec<usize> = params
            .road_types
            .iter()
            .enumerate()
            .filter(|(i, t)| {
                t.name != previous_type
                    && budget > t.min_length
                    && t.name != "highway_link"
                    && counts[*i] < t.max_occurrences
            })
            .map(|(i, _)| i)
            .collect();
        let Some(&next) = rng.choose(&available) else { break };
        counts[next] += 1;

        let kind = &params.road_types[next];
        let mut segment = random_segment(kind, previous_end, budget, rng);
        match link {
            Some(link) if kind.name == "highway" => {
                let enter = random_segment(link, previous_end, budget, rng);
                segment.start = enter.end;
                let mut exit = random_segment(link, segment.end, budget, rng);
                let exit_length = exit.length();
                exit.end = exit.start;
                exit.start = round_to(exit.end - exit_length, 3);
                segment.end = exit.start;
                segments.extend([enter, segment, exit]);
            }
            _ => segments.push(segment),
        }
        remaining = length - last_end(&segments);
    }

    // Close with a city stretch reaching exactly to the configured length.
    match segments.last_mut() {
        Some(last) if last.road_type == "city" => last.end = length,
        _ => {
            let start = last_end(&segments);
            segments.push(segment_of(city, start, length - start, city.speed_limit));
        }
    }
    Ok(segments)
}

/// Build segments from a preset list, laid end to end from position 0.
pub fn segments_from_preset(params: &RoadParams, preset: &[PresetSegment]) -> RoadResult<Vec<RoadSegment>> {
    if preset.is_empty() {
        return Err(RoadError::Empty);
    }
    let mut segments = Vec::with_capacity(preset.len());
    let mut start = 0.0;
    for p in preset {
        let kind = params
            .road_type(&p.road_type)
            .ok_or_else(|| ConfigError::UnknownRoadType(p.road_type.clone()))?;
        let speed = p.speed.unwrap_or(kind.speed_limit);
        segments.push(segment_of(kind, start, p.length, speed));
        start += p.length;
    }
    Ok(segments)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn random_segment(kind: &RoadTypeConfig, start: f64, remaining: f64, rng: &mut SimRng) -> RoadSegment {
    let length = round_to(rng.uniform(kind.min_length, kind.max_length.min(remaining)), 1);
    segment_of(kind, start, length, kind.speed_limit)
}

fn segment_of(kind: &RoadTypeConfig, start: f64, length: f64, speed_limit: f64) -> RoadSegment {
    RoadSegment {
        road_type:   kind.name.clone(),
        start:       round_to(start, 3),
        end:         round_to(start + length, 3),
        speed_limit,
        max_level:   kind.max_level,
    }
}

#[inline]
fn last_end(segments: &[RoadSegment]) -> f64 {
    segments.last().map_or(0.0, |s| s.end)
}
