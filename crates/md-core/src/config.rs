//! Simulation configuration.
//!
//! `SimConfig` is a plain data struct grouped into sections.  Applications
//! either start from [`SimConfig::baseline`] and tweak fields, or (with the
//! `serde` feature) deserialize it from any serde format.  Either way the
//! result should pass [`SimConfig::validate`] before a run is built from it.

use std::fmt;
use std::str::FromStr;

use crate::{ConfigError, ConfigResult, Level};

/// Sentinel for "never": a time that is never reached (an unreachable level,
/// a driver who never becomes unfit).  Finite so that arithmetic and
/// comparisons on it stay well-defined.
pub const NEVER: f64 = i64::MAX as f64;

// ── Driver event kinds ────────────────────────────────────────────────────────

/// The four kinds of driver event.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DriverEventKind {
    Fatigue,
    Distraction,
    Ndrt,
    DriverRequest,
}

impl DriverEventKind {
    pub fn name(self) -> &'static str {
        match self {
            DriverEventKind::Fatigue       => "FATIGUE",
            DriverEventKind::Distraction   => "DISTRACTION",
            DriverEventKind::Ndrt          => "NDRT",
            DriverEventKind::DriverRequest => "DRIVER_REQUEST",
        }
    }
}

impl fmt::Display for DriverEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DriverEventKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "FATIGUE"        => Ok(DriverEventKind::Fatigue),
            "DISTRACTION"    => Ok(DriverEventKind::Distraction),
            "NDRT"           => Ok(DriverEventKind::Ndrt),
            "DRIVER_REQUEST" => Ok(DriverEventKind::DriverRequest),
            other => Err(ConfigError::invalid("driver event kind", format!("unknown kind {other:?}"))),
        }
    }
}

// ── Road section ──────────────────────────────────────────────────────────────

/// One kind of road segment the generator may place.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoadTypeConfig {
    pub name:            String,
    /// km/h.
    pub speed_limit:     f64,
    pub max_level:       Level,
    /// km.
    pub min_length:      f64,
    /// km.
    pub max_length:      f64,
    pub max_occurrences: u32,
}

/// One kind of static or dynamic road event.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventTypeConfig {
    pub name:            String,
    /// Static events: probability per eligible segment.  Dynamic events:
    /// probability of at least one occurrence over the whole drive.
    pub probability:     f64,
    pub min_length:      f64,
    pub max_length:      f64,
    pub default_level:   Level,
    /// km/h.
    pub default_speed:   f64,
    /// Only used for dynamic events.
    pub max_occurrences: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoadParams {
    /// km.
    pub road_length:                 f64,
    pub road_types:                  Vec<RoadTypeConfig>,
    pub static_events:               Vec<EventTypeConfig>,
    pub dynamic_events:              Vec<EventTypeConfig>,
    /// km ahead of the car at which dynamic events become known.
    pub dynamic_event_min_lookahead: f64,
    pub dynamic_event_max_lookahead: f64,
}

impl RoadParams {
    pub fn road_type(&self, name: &str) -> Option<&RoadTypeConfig> {
        self.road_types.iter().find(|t| t.name == name)
    }

    pub fn static_event(&self, name: &str) -> Option<&EventTypeConfig> {
        self.static_events.iter().find(|e| e.name == name)
    }

    pub fn dynamic_event(&self, name: &str) -> Option<&EventTypeConfig> {
        self.dynamic_events.iter().find(|e| e.name == name)
    }
}

// ── Car section ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CarParams {
    /// Maximum acceleration in m/s².
    pub acc_coefficient: f64,
    /// Band around the target speed (km/h) inside which the speed drifts.
    pub speed_tolerance: f64,
}

// ── Driver section ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverEventConfig {
    pub kind:            DriverEventKind,
    /// Probability of at least one occurrence over the whole drive.
    pub probability:     f64,
    pub max_occurrences: u32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverParams {
    pub initial_fatigue:              u8,
    pub initial_distraction:          u8,
    /// Allowed driver events, tried in this order every tick.
    pub events:                       Vec<DriverEventConfig>,
    pub distraction_increase_prob:    f64,
    pub distraction_ends_midway_prob: f64,
    pub distractions_ends_prob:       f64,
    pub ndrt_ends_prob:               f64,
    pub driver_request_cancel_prob:   f64,
}

// ── Action section ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionParams {
    pub cf_success_probability:                f64,
    /// Seconds.
    pub max_correct_fatigue_time:              f64,
    pub cd_success_probability:                f64,
    /// Seconds.
    pub max_cd_time:                           f64,
    pub pd_success_probability:                f64,
    pub suggested_shift_response_probability:  f64,
    /// Indexed by target level including L0 (`L0, L2, L3, L4`).
    pub suggested_shift_acceptance_probability: [f64; 4],
    /// Response probability when the driver requested the suggested level.
    pub ss_resp_prob_dr:                       f64,
    /// Acceptance probability when the driver requested the suggested level.
    pub ss_acc_prob_dr:                        f64,
    /// Default enforce countdown in seconds.
    pub min_esl_time:                          f64,
}

// ── Driver preferences ────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Preferences {
    /// Seconds the driver needs to shift comfortably.
    pub comfortable_shift_time:     f64,
    /// Two switches closer than this (seconds) are uncomfortable.
    pub uncomfortable_switch:       f64,
    /// A declined level should not be suggested again within this (seconds).
    pub decline_threshold:          f64,
    pub window_of_opportunity_time: f64,
    pub preferred_level:            Level,
}

// ── Time-to-driver tables ─────────────────────────────────────────────────────

/// TTDU and TTDF lookup tables, in seconds.
///
/// TTDU tables are indexed `[level][state]` with the level index including
/// L0 ([`Level::index`]).  TTDF tables are indexed by state only.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TtdTables {
    pub ttdu_fatigue:     [[f64; 5]; 4],
    pub ttdu_distraction: [[f64; 4]; 4],
    pub ttdu_ndrt:        [[f64; 5]; 4],
    pub ttdf_fatigue:     [f64; 5],
    pub ttdf_distraction: [f64; 4],
    pub ttdf_ndrt:        [f64; 5],
}

impl TtdTables {
    #[inline]
    pub fn ttdu_fatigue(&self, level: Level, fatigue: u8) -> f64 {
        self.ttdu_fatigue[level.index()][usize::from(fatigue.min(4))]
    }

    #[inline]
    pub fn ttdu_distraction(&self, level: Level, distraction: u8) -> f64 {
        self.ttdu_distraction[level.index()][usize::from(distraction.min(3))]
    }

    #[inline]
    pub fn ttdu_ndrt(&self, level: Level, ndrt: u8) -> f64 {
        self.ttdu_ndrt[level.index()][usize::from(ndrt.min(4))]
    }

    #[inline]
    pub fn ttdf_fatigue(&self, fatigue: u8) -> f64 {
        self.ttdf_fatigue[usize::from(fatigue.min(4))]
    }

    #[inline]
    pub fn ttdf_distraction(&self, distraction: u8) -> f64 {
        self.ttdf_distraction[usize::from(distraction.min(3))]
    }

    #[inline]
    pub fn ttdf_ndrt(&self, ndrt: u8) -> f64 {
        self.ttdf_ndrt[usize::from(ndrt.min(4))]
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Top-level simulation configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Seconds per tick.
    pub timestep:                   f64,
    /// Default run seed.  `reset` takes an explicit seed; batch runners
    /// derive their seed lists from this one.
    pub seed:                       u64,
    pub maximum_automation_level:   Level,
    pub initial_level:              Level,
    /// Resolve every action on its first valid step.
    pub instant_actions:            bool,
    /// Draw an action's actual start uniformly inside its window of
    /// opportunity instead of starting immediately.
    pub random_start_in_woo:        bool,
    /// With replayed route data, use the recorded L2 TTAF/TTAU.
    pub use_parsed_tta_for_actions: bool,
    /// Action identifiers the mediator may choose from.
    pub available_actions:          Vec<String>,
    /// Safety predicates evaluated each tick, by registry name.
    pub safety_events:              Vec<String>,
    pub road:                       RoadParams,
    pub car:                        CarParams,
    pub driver:                     DriverParams,
    pub actions:                    ActionParams,
    pub preferences:                Preferences,
    pub ttd:                        TtdTables,
}

impl SimConfig {
    /// A complete scenario: 100 km of mixed city, rural and highway driving
    /// with all driver events, all actions and all safety predicates enabled.
    pub fn baseline() -> Self {
        let road_type = |name: &str, speed, level, min, max, occ| RoadTypeConfig {
            name:            name.to_owned(),
            speed_limit:     speed,
            max_level:       level,
            min_length:      min,
            max_length:      max,
            max_occurrences: occ,
        };
        let event_type = |name: &str, p, min, max, level, speed, occ| EventTypeConfig {
            name:            name.to_owned(),
            probability:     p,
            min_length:      min,
            max_length:      max,
            default_level:   level,
            default_speed:   speed,
            max_occurrences: occ,
        };
        let driver_event = |kind, probability, max_occurrences| DriverEventConfig {
            kind,
            probability,
            max_occurrences,
        };

        SimConfig {
            timestep:                   1.0,
            seed:                       42,
            maximum_automation_level:   Level::L4,
            initial_level:              Level::L0,
            instant_actions:            false,
            random_start_in_woo:        true,
            use_parsed_tta_for_actions: false,
            available_actions: [
                "DN", "CANCEL", "SSL0", "SSL2", "SSL3", "SSL4", "ESL0", "ESL2", "ESL3", "ESL4",
                "CF", "CD", "ES", "PD", "CR",
            ]
            .iter()
            .map(|s| (*s).to_owned())
            .collect(),
            safety_events: [
                "CarUnfit", "DriverUnfit", "DoubleSuggestion", "RecentSwitch", "QuickTakeover",
                "UnnecessaryES", "PendingRequest",
            ]
            .iter()
            .map(|s| (*s).to_owned())
            .collect(),
            road: RoadParams {
                road_length: 100.0,
                road_types: vec![
                    road_type("city",         50.0,  Level::L2, 2.0,  8.0,  10),
                    road_type("rural",        80.0,  Level::L3, 5.0,  20.0, 4),
                    road_type("highway",      120.0, Level::L4, 20.0, 60.0, 1),
                    road_type("highway_link", 80.0,  Level::L2, 0.5,  1.5,  2),
                ],
                static_events: vec![
                    event_type("road_works",    0.3, 0.5, 2.0, Level::L2, 50.0, 1),
                    event_type("school_zone",   0.2, 0.3, 1.0, Level::L0, 30.0, 1),
                ],
                dynamic_events: vec![
                    event_type("accident",      0.3, 0.5, 2.0,  Level::L0, 30.0, 1),
                    event_type("heavy_rain",    0.3, 3.0, 10.0, Level::L2, 80.0, 2),
                ],
                dynamic_event_min_lookahead: 1.0,
                dynamic_event_max_lookahead: 3.0,
            },
            car: CarParams {
                acc_coefficient: 2.0,
                speed_tolerance: 5.0,
            },
            driver: DriverParams {
                initial_fatigue:     0,
                initial_distraction: 0,
                events: vec![
                    driver_event(DriverEventKind::Fatigue,       0.5, 2),
                    driver_event(DriverEventKind::Distraction,   0.8, 5),
                    driver_event(DriverEventKind::Ndrt,          0.8, 5),
                    driver_event(DriverEventKind::DriverRequest, 0.3, 2),
                ],
                distraction_increase_prob:    0.5,
                distraction_ends_midway_prob: 0.1,
                distractions_ends_prob:       0.05,
                ndrt_ends_prob:               0.01,
                driver_request_cancel_prob:   0.005,
            },
            actions: ActionParams {
                cf_success_probability:                 0.9,
                max_correct_fatigue_time:               20.0,
                cd_success_probability:                 0.9,
                max_cd_time:                            10.0,
                pd_success_probability:                 0.95,
                suggested_shift_response_probability:   0.95,
                suggested_shift_acceptance_probability: [0.9, 0.9, 0.8, 0.8],
                ss_resp_prob_dr:                        0.99,
                ss_acc_prob_dr:                         0.99,
                min_esl_time:                           10.0,
            },
            preferences: Preferences {
                comfortable_shift_time:     10.0,
                uncomfortable_switch:       60.0,
                decline_threshold:          120.0,
                window_of_opportunity_time: 20.0,
                preferred_level:            Level::L3,
            },
            ttd: TtdTables {
                ttdu_fatigue: [
                    [7200.0, 3600.0, 1800.0, 600.0, 0.0],
                    [7200.0, 3600.0, 1800.0, 600.0, 0.0],
                    [NEVER,  7200.0, 3600.0, 1200.0, 300.0],
                    [NEVER,  NEVER,  7200.0, 3600.0, 600.0],
                ],
                ttdu_distraction: [
                    [NEVER, 10.0,  5.0,  2.0],
                    [NEVER, 15.0,  8.0,  3.0],
                    [NEVER, NEVER, NEVER, NEVER],
                    [NEVER, NEVER, NEVER, NEVER],
                ],
                ttdu_ndrt: [
                    [NEVER, 5.0,   3.0,   1.0,   0.0],
                    [NEVER, 6.0,   4.0,   2.0,   1.0],
                    [NEVER, NEVER, NEVER, NEVER, 60.0],
                    [NEVER, NEVER, NEVER, NEVER, NEVER],
                ],
                ttdf_fatigue:     [0.0, 0.0, 5.0, 10.0, 20.0],
                ttdf_distraction: [0.0, 2.0, 4.0, 6.0],
                ttdf_ndrt:        [0.0, 3.0, 6.0, 10.0, 15.0],
            },
        }
    }

    /// Check every range constraint the simulation relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(ConfigError::invalid("timestep", "must be a positive number of seconds"));
        }
        if self.initial_level > self.maximum_automation_level {
            return Err(ConfigError::invalid(
                "initial_level",
                format!("{} exceeds maximum level {}", self.initial_level, self.maximum_automation_level),
            ));
        }
        if self.preferences.preferred_level > self.maximum_automation_level {
            return Err(ConfigError::invalid(
                "preferences.preferred_level",
                format!("{} exceeds maximum level {}", self.preferences.preferred_level, self.maximum_automation_level),
            ));
        }

        // ── Road ──────────────────────────────────────────────────────────
        let road = &self.road;
        if !(road.road_length > 0.0) {
            return Err(ConfigError::invalid("road.road_length", "must be positive"));
        }
        if road.road_type("city").is_none() {
            return Err(ConfigError::MissingRoadType("city".to_owned()));
        }
        for t in &road.road_types {
            if !(t.speed_limit > 0.0) {
                return Err(ConfigError::invalid("road.road_types.speed_limit", format!("{}: must be positive", t.name)));
            }
            check_lengths("road.road_types", &t.name, t.min_length, t.max_length)?;
        }
        for e in road.static_events.iter().chain(&road.dynamic_events) {
            check_probability("road.events.probability", e.probability)?;
            check_lengths("road.events", &e.name, e.min_length, e.max_length)?;
            if !(e.default_speed > 0.0) {
                return Err(ConfigError::invalid("road.events.default_speed", format!("{}: must be positive", e.name)));
            }
        }
        if road.dynamic_event_min_lookahead < 0.0
            || road.dynamic_event_min_lookahead > road.dynamic_event_max_lookahead
        {
            return Err(ConfigError::invalid(
                "road.dynamic_event_min_lookahead",
                "lookahead bounds must satisfy 0 <= min <= max",
            ));
        }

        // ── Car ───────────────────────────────────────────────────────────
        if !(self.car.acc_coefficient > 0.0) {
            return Err(ConfigError::invalid("car.acc_coefficient", "must be positive"));
        }
        if self.car.speed_tolerance < 0.0 {
            return Err(ConfigError::invalid("car.speed_tolerance", "must not be negative"));
        }

        // ── Driver ────────────────────────────────────────────────────────
        let driver = &self.driver;
        if driver.initial_fatigue > 4 {
            return Err(ConfigError::invalid("driver.initial_fatigue", "must be in 0..=4"));
        }
        if driver.initial_distraction > 3 {
            return Err(ConfigError::invalid("driver.initial_distraction", "must be in 0..=3"));
        }
        for e in &driver.events {
            check_probability("driver.events.probability", e.probability)?;
        }
        for (field, p) in [
            ("driver.distraction_increase_prob",    driver.distraction_increase_prob),
            ("driver.distraction_ends_midway_prob", driver.distraction_ends_midway_prob),
            ("driver.distractions_ends_prob",       driver.distractions_ends_prob),
            ("driver.ndrt_ends_prob",               driver.ndrt_ends_prob),
            ("driver.driver_request_cancel_prob",   driver.driver_request_cancel_prob),
        ] {
            check_probability(field, p)?;
        }

        // ── Actions ───────────────────────────────────────────────────────
        let actions = &self.actions;
        for (field, p) in [
            ("actions.cf_success_probability",               actions.cf_success_probability),
            ("actions.cd_success_probability",               actions.cd_success_probability),
            ("actions.pd_success_probability",               actions.pd_success_probability),
            ("actions.suggested_shift_response_probability", actions.suggested_shift_response_probability),
            ("actions.ss_resp_prob_dr",                      actions.ss_resp_prob_dr),
            ("actions.ss_acc_prob_dr",                       actions.ss_acc_prob_dr),
        ] {
            check_probability(field, p)?;
        }
        for p in actions.suggested_shift_acceptance_probability {
            check_probability("actions.suggested_shift_acceptance_probability", p)?;
        }
        for (field, secs) in [
            ("actions.max_correct_fatigue_time", actions.max_correct_fatigue_time),
            ("actions.max_cd_time",              actions.max_cd_time),
            ("actions.min_esl_time",             actions.min_esl_time),
        ] {
            if !(secs >= 0.0) {
                return Err(ConfigError::invalid(field, "must not be negative"));
            }
        }

        // ── TTD tables ────────────────────────────────────────────────────
        let ttd = &self.ttd;
        let all_values = ttd
            .ttdu_fatigue
            .iter()
            .flatten()
            .chain(ttd.ttdu_distraction.iter().flatten())
            .chain(ttd.ttdu_ndrt.iter().flatten())
            .chain(&ttd.ttdf_fatigue)
            .chain(&ttd.ttdf_distraction)
            .chain(&ttd.ttdf_ndrt);
        for &v in all_values {
            if !(v >= 0.0) {
                return Err(ConfigError::invalid("ttd", format!("table entries must be >= 0, got {v}")));
            }
        }

        Ok(())
    }
}

fn check_probability(field: &'static str, p: f64) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{p} is not a probability")))
    }
}

fn check_lengths(field: &'static str, name: &str, min: f64, max: f64) -> ConfigResult<()> {
    if min >= 0.0 && min <= max {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{name}: lengths must satisfy 0 <= min ({min}) <= max ({max})")))
    }
}
