//! Road segments.

use md_core::Level;

/// A contiguous stretch of one road type.
///
/// Segments of a generated road are ordered, contiguous and together cover
/// `[0, total_distance]`.  Positions are kilometres; speeds km/h.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoadSegment {
    pub road_type:   String,
    pub start:       f64,
    pub end:         f64,
    pub speed_limit: f64,
    pub max_level:   Level,
}

impl RoadSegment {
    #[inline]
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Seconds needed to cover `distance` km at the speed limit.
    #[inline]
    pub fn travel_time(&self, distance: f64) -> f64 {
        distance / self.speed_limit * 3_600.0
    }

    /// Kilometres covered in `secs` seconds at the speed limit.
    #[inline]
    pub fn travel_distance(&self, secs: f64) -> f64 {
        secs * self.speed_limit / 3_600.0
    }

    /// `true` if `position` lies inside the closed interval `[start, end]`.
    #[inline]
    pub fn contains(&self, position: f64) -> bool {
        self.start <= position && position <= self.end
    }

    pub fn is_highway(&self) -> bool {
        self.road_type == "highway" || self.road_type == "highway_link"
    }
}
