//! Preset roads and their CSV loaders.
//!
//! A [`PresetRoad`] replaces any of the randomly generated parts of a run
//! with recorded data.  Each part is optional; a missing part is generated
//! as usual.
//!
//! # CSV formats
//!
//! Segments (`speed` may be empty to use the road type's speed limit):
//!
//! ```csv
//! road_type,length,speed
//! city,3.5,
//! highway,42.0,110
//! ```
//!
//! Static or dynamic events (names not configured are ignored when the road
//! is built):
//!
//! ```csv
//! name,start,end
//! road_works,2.0,5.0
//! ```
//!
//! Driver events (`level` only for `DRIVER_REQUEST`):
//!
//! ```csv
//! kind,position,level
//! DISTRACTION,1.5,
//! DRIVER_REQUEST,12.0,L3
//! ```
//!
//! Route samples (one per tick; position in metres, speed in km/h, recorded
//! L2 TTAF/TTAU in seconds):
//!
//! ```csv
//! timestamp,position_m,speed,ttaf,ttau
//! 0.0,0.0,0.0,35.0,0.0
//! ```

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use md_core::{DriverEventKind, Level};

use crate::{RoadError, RoadResult};

// ── Preset data ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PresetSegment {
    pub road_type: String,
    /// km.
    pub length:    f64,
    /// Overrides the road type's speed limit.
    pub speed:     Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PresetEvent {
    pub name:  String,
    pub start: f64,
    pub end:   f64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PresetDriverEvent {
    pub kind:     DriverEventKind,
    /// km; the event fires once the car reaches it.
    pub position: f64,
    /// Requested level for driver requests.
    pub level:    Option<Level>,
}

/// One recorded tick of a real drive.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RouteSample {
    /// Seconds since the start of the drive.
    pub timestamp:  f64,
    pub position_m: f64,
    /// km/h.
    pub speed:      f64,
    /// Recorded L2 TTAF in seconds.
    pub ttaf:       f64,
    /// Recorded L2 TTAU in seconds.
    pub ttau:       f64,
}

/// Recorded replacements for the generated parts of a run.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PresetRoad {
    pub segments:       Option<Vec<PresetSegment>>,
    pub static_events:  Option<Vec<PresetEvent>>,
    pub dynamic_events: Option<Vec<PresetEvent>>,
    pub driver_events:  Option<Vec<PresetDriverEvent>>,
    pub route:          Option<Vec<RouteSample>>,
}

impl PresetRoad {
    pub fn with_segments(mut self, segments: Vec<PresetSegment>) -> Self {
        self.segments = Some(segments);
        self
    }

    pub fn with_static_events(mut self, events: Vec<PresetEvent>) -> Self {
        self.static_events = Some(events);
        self
    }

    pub fn with_dynamic_events(mut self, events: Vec<PresetEvent>) -> Self {
        self.dynamic_events = Some(events);
        self
    }

    pub fn with_driver_events(mut self, events: Vec<PresetDriverEvent>) -> Self {
        self.driver_events = Some(events);
        self
    }

    pub fn with_route(mut self, route: Vec<RouteSample>) -> Self {
        self.route = Some(route);
        self
    }

    /// Sum of the preset segment lengths, if segments are preset.
    pub fn road_length(&self) -> Option<f64> {
        self.segments.as_ref().map(|s| s.iter().map(|p| p.length).sum())
    }
}

// ── Loaders ───────────────────────────────────────────────────────────────────

pub fn load_segments_csv(path: &Path) -> RoadResult<Vec<PresetSegment>> {
    load_segments_reader(std::fs::File::open(path)?)
}

/// Like [`load_segments_csv`] but accepts any `Read` source.
pub fn load_segments_reader<R: Read>(reader: R) -> RoadResult<Vec<PresetSegment>> {
    let rows = deserialize_all(reader)?;
    if rows.is_empty() {
        return Err(RoadError::Empty);
    }
    Ok(rows)
}

pub fn load_events_csv(path: &Path) -> RoadResult<Vec<PresetEvent>> {
    load_events_reader(std::fs::File::open(path)?)
}

pub fn load_events_reader<R: Read>(reader: R) -> RoadResult<Vec<PresetEvent>> {
    deserialize_all(reader)
}

#[derive(Deserialize)]
struct DriverEventRecord {
    kind:     String,
    position: f64,
    level:    Option<String>,
}

pub fn load_driver_events_csv(path: &Path) -> RoadResult<Vec<PresetDriverEvent>> {
    load_driver_events_reader(std::fs::File::open(path)?)
}

pub fn load_driver_events_reader<R: Read>(reader: R) -> RoadResult<Vec<PresetDriverEvent>> {
    deserialize_all::<_, DriverEventRecord>(reader)?
        .into_iter()
        .map(|r| -> RoadResult<PresetDriverEvent> {
            let level = match r.level.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(l) => Some(l.parse::<Level>()?),
            };
            Ok(PresetDriverEvent {
                kind: r.kind.parse()?,
                position: r.position,
                level,
            })
        })
        .collect()
}

pub fn load_route_csv(path: &Path) -> RoadResult<Vec<RouteSample>> {
    load_route_reader(std::fs::File::open(path)?)
}

pub fn load_route_reader<R: Read>(reader: R) -> RoadResult<Vec<RouteSample>> {
    deserialize_all(reader)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn deserialize_all<R: Read, T: for<'de> Deserialize<'de>>(reader: R) -> RoadResult<Vec<T>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    csv_reader
        .deserialize::<T>()
        .map(|row| row.map_err(|e| RoadError::Parse(e.to_string())))
        .collect()
}
