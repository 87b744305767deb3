//! The road timeline of one run.

use tracing::debug;

use md_core::{round_to, Level, SimConfig, SimRng, Variant};

use crate::event_generator::{generate_static_events, RoadEventGenerator};
use crate::forecast::segment_at;
use crate::generator::{generate_segments, segments_from_preset};
use crate::{Forecast, LevelForecaster, PresetRoad, RoadError, RoadEvent, RoadResult, RoadSegment};

/// Segments, events and forecasts of one run, advanced once per tick.
#[derive(Clone, Debug)]
pub struct Road {
    segments:             Vec<RoadSegment>,
    segment_index:        usize,
    /// All known events, sorted by start.
    events:               Vec<RoadEvent>,
    /// Events covering the car's position.
    active:               Vec<RoadEvent>,
    /// Index of the first event in `events` whose start is still ahead.
    event_cursor:         usize,
    generator:            RoadEventGenerator,
    forecaster:           LevelForecaster,
    total_distance:       f64,
    estimated_total_time: f64,
    max_level:            Level,
    current_max_level:    Level,
    /// Last forecast computed on the road, per variant.  Returned unchanged
    /// once the car is past the end.
    frozen:               [Forecast; 3],
    rng:                  SimRng,
}

impl Road {
    /// Build the road for one run.  Preset parts replace generated ones.
    pub fn new(cfg: &SimConfig, preset: Option<&PresetRoad>, mut rng: SimRng) -> RoadResult<Self> {
        let params = &cfg.road;
        let segments = match preset.and_then(|p| p.segments.as_deref()) {
            Some(preset_segments) => segments_from_preset(params, preset_segments)?,
            None => generate_segments(params, &mut rng)?,
        };
        if segments.is_empty() {
            return Err(RoadError::Empty);
        }

        let total_distance = round_to(segments.iter().map(RoadSegment::length).sum(), 3);
        let estimated_total_time = round_to(
            segments.iter().map(|s| s.travel_time(s.length())).sum(),
            2,
        );

        let events = generate_static_events(
            params,
            &segments,
            preset.and_then(|p| p.static_events.as_deref()),
            &mut rng,
        );
        let generator = RoadEventGenerator::new(
            params,
            cfg.timestep,
            estimated_total_time,
            preset.and_then(|p| p.dynamic_events.as_deref()),
        );
        let max_level = cfg.maximum_automation_level;
        let forecaster = LevelForecaster::build(&segments, &events, total_distance, max_level);

        debug!(
            segments = segments.len(),
            static_events = events.len(),
            total_distance,
            estimated_total_time,
            "road built"
        );

        let mut road = Road {
            segments,
            segment_index: 0,
            events,
            active: Vec::new(),
            event_cursor: 0,
            generator,
            forecaster,
            total_distance,
            estimated_total_time,
            max_level,
            current_max_level: max_level,
            frozen: [Forecast::default(); 3],
            rng,
        };
        road.update_forecasts(0.0);
        Ok(road)
    }

    /// Advance to the car's new `position`.
    ///
    /// Returns the dynamic event inserted this tick, if any; the forecast
    /// partitions are rebuilt when that happens.
    pub fn step(&mut self, position: f64) -> Option<RoadEvent> {
        while position >= self.segments[self.segment_index].end && self.segment_index + 1 < self.segments.len() {
            self.segment_index += 1;
        }

        self.current_max_level = self
            .forecaster
            .levels(Variant::Nominal)
            .iter()
            .find(|iv| iv.end >= position)
            .map_or(self.max_level, |iv| iv.level);

        self.update_active_events(position);

        let inserted = self.generator.next_dynamic(position, &self.active, &mut self.rng);
        if let Some(event) = &inserted {
            self.insert_event(event.clone(), position);
            self.forecaster =
                LevelForecaster::build(&self.segments, &self.events, self.total_distance, self.max_level);
            debug!(name = %event.name, start = event.start, end = event.end, "dynamic road event inserted");
        }

        self.update_forecasts(position);
        inserted
    }

    fn update_active_events(&mut self, position: f64) {
        self.active.retain(|e| e.end >= position);
        while let Some(event) = self.events.get(self.event_cursor) {
            if event.start > position {
                break;
            }
            if event.end >= position {
                self.active.push(event.clone());
            }
            self.event_cursor += 1;
        }
    }

    fn insert_event(&mut self, event: RoadEvent, position: f64) {
        let index = self
            .events
            .iter()
            .position(|e| e.start > event.start)
            .unwrap_or(self.events.len());
        // Inserted behind the cursor: the event has already started, so it is
        // activated here instead of by the cursor.
        if index < self.event_cursor {
            self.event_cursor += 1;
            if event.is_active_at(position) {
                self.active.push(event.clone());
            }
        }
        self.events.insert(index, event);
    }

    /// Refresh the frozen forecasts while `position` is on the road.
    pub fn update_forecasts(&mut self, position: f64) {
        for variant in Variant::ALL {
            if let Some(f) = self.forecaster.forecast(position, variant) {
                self.frozen[variant.index()] = f;
            }
        }
    }

    /// TTAF/TTAU at `position`, falling back to the last on-road forecast
    /// past the end of the road.
    pub fn forecast(&self, position: f64, variant: Variant) -> Forecast {
        self.forecaster
            .forecast(position, variant)
            .unwrap_or(self.frozen[variant.index()])
    }

    /// Speed the car aims for: the lowest of the active events' speeds and
    /// the current segment's limit.
    pub fn target_speed(&self) -> f64 {
        self.active
            .iter()
            .map(|e| e.max_speed)
            .fold(self.current_segment().speed_limit, f64::min)
    }

    #[inline]
    pub fn time_to_position(&self, from: f64, to: f64) -> f64 {
        self.forecaster.time_to_position(from, to)
    }

    #[inline]
    pub fn position_in_time(&self, from: f64, secs: f64) -> f64 {
        self.forecaster.position_in_time(from, secs)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn segments(&self) -> &[RoadSegment] {
        &self.segments
    }

    pub fn current_segment(&self) -> &RoadSegment {
        &self.segments[self.segment_index]
    }

    /// The segment containing `position`, or the last one past the end.
    pub fn segment_at(&self, position: f64) -> &RoadSegment {
        segment_at(&self.segments, position).unwrap_or(&self.segments[self.segments.len() - 1])
    }

    pub fn events(&self) -> &[RoadEvent] {
        &self.events
    }

    pub fn active_events(&self) -> &[RoadEvent] {
        &self.active
    }

    pub fn forecaster(&self) -> &LevelForecaster {
        &self.forecaster
    }

    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn estimated_total_time(&self) -> f64 {
        self.estimated_total_time
    }

    pub fn current_max_level(&self) -> Level {
        self.current_max_level
    }

    pub fn max_level(&self) -> Level {
        self.max_level
    }
}
